//! User administration: listing accounts, changing roles and approving registrations.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use super::error::ApiError;
use super::session::Session;
use super::state::{GuardedUserManager, ServerState};
use crate::user::{UserChange, UserRole};

#[derive(Deserialize, Debug)]
struct RoleBody {
    pub role: UserRole,
}

#[derive(Deserialize, Debug)]
struct ApprovalBody {
    pub approved: bool,
}

async fn get_users(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
) -> Result<impl IntoResponse, ApiError> {
    let users = user_manager
        .lock()
        .unwrap()
        .get_all_users(&session.actor())?;
    Ok(Json(users))
}

async fn put_user_role(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(user_id): Path<usize>,
    Json(body): Json<RoleBody>,
) -> Result<impl IntoResponse, ApiError> {
    info!(
        "{} requests role {} for user {}",
        session.handle,
        body.role.as_str(),
        user_id
    );
    let user = user_manager.lock().unwrap().change_user(
        &session.actor(),
        user_id,
        UserChange::SetRole(body.role),
    )?;
    Ok(Json(user))
}

async fn put_user_approval(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(user_id): Path<usize>,
    Json(body): Json<ApprovalBody>,
) -> Result<impl IntoResponse, ApiError> {
    let user = user_manager.lock().unwrap().change_user(
        &session.actor(),
        user_id,
        UserChange::SetApproval(body.approved),
    )?;
    Ok(Json(user))
}

pub fn make_admin_routes(state: ServerState) -> Router {
    Router::new()
        .route("/users", get(get_users))
        .route("/users/{id}/role", put(put_user_role))
        .route("/users/{id}/approval", put(put_user_approval))
        .with_state(state)
}
