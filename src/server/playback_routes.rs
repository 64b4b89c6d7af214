use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use super::error::ApiError;
use super::metrics;
use super::session::Session;
use super::state::{GuardedPlaybackSessions, ServerState};
use crate::playback::{PlaybackError, PlaybackOp, PlaybackSessionManager, PlaybackUpdate};
use crate::user::policy::require;
use crate::user::Permission;

/// Applies `op` on behalf of `session`. Shared by the HTTP route and the realtime socket.
pub async fn apply_playback_op(
    sessions: &PlaybackSessionManager,
    session: &Session,
    op: PlaybackOp,
) -> Result<PlaybackUpdate, ApiError> {
    require(&session.actor(), Permission::AccessCatalog)?;
    let op_name = op.name();
    let result: Result<PlaybackUpdate, PlaybackError> = sessions.apply(session.user_id, op).await;
    metrics::record_playback_op(op_name, result.is_ok());
    Ok(result?)
}

async fn get_state(
    session: Session,
    State(sessions): State<GuardedPlaybackSessions>,
) -> Result<impl IntoResponse, ApiError> {
    require(&session.actor(), Permission::AccessCatalog)?;
    Ok(Json(sessions.snapshot(session.user_id).await))
}

async fn post_command(
    session: Session,
    State(sessions): State<GuardedPlaybackSessions>,
    Json(op): Json<PlaybackOp>,
) -> Result<impl IntoResponse, ApiError> {
    let update = apply_playback_op(&sessions, &session, op).await?;
    Ok(Json(update))
}

pub fn make_playback_routes(state: ServerState) -> Router {
    Router::new()
        .route("/state", get(get_state))
        .route("/command", post(post_command))
        .with_state(state)
}
