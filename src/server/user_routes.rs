use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use tracing::debug;

use super::error::ApiError;
use super::session::Session;
use super::state::{GuardedUserManager, ServerState};
use crate::catalog::Track;
use crate::user::policy::require;
use crate::user::{Permission, ProfileUpdate, PublicProfile, UserError};

const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 500;

#[derive(Deserialize, Debug)]
struct CreatePlaylistBody {
    pub name: String,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

#[derive(Deserialize, Debug)]
struct UpdatePlaylistBody {
    pub name: Option<String>,
    pub tracks: Option<Vec<Track>>,
}

#[derive(Deserialize, Debug)]
struct AddTracksToPlaylistBody {
    pub tracks: Vec<Track>,
}

#[derive(Deserialize, Debug)]
struct RemoveTracksFromPlaylistBody {
    pub positions: Vec<usize>,
}

#[derive(Deserialize, Debug, Default)]
struct ListQuery {
    pub limit: Option<usize>,
}

impl ListQuery {
    fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }
}

async fn get_profile(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
) -> Result<impl IntoResponse, ApiError> {
    let user = user_manager
        .lock()
        .unwrap()
        .get_user(session.user_id)?
        .ok_or(UserError::UserNotFound)?;
    Ok(Json(user))
}

async fn put_profile(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<ProfileUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    require(&session.actor(), Permission::SocialInteract)?;
    let user = user_manager
        .lock()
        .unwrap()
        .update_profile(session.user_id, &body)?;
    Ok(Json(user))
}

async fn get_public_profile(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(user_id): Path<usize>,
) -> Result<impl IntoResponse, ApiError> {
    require(&session.actor(), Permission::AccessCatalog)?;
    let user = user_manager
        .lock()
        .unwrap()
        .get_user(user_id)?
        .ok_or(UserError::UserNotFound)?;
    Ok(Json(PublicProfile::from(&user)))
}

async fn post_playlist(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<CreatePlaylistBody>,
) -> Result<impl IntoResponse, ApiError> {
    require(&session.actor(), Permission::OwnPlaylists)?;
    let playlist = user_manager
        .lock()
        .unwrap()
        .create_playlist(session.user_id, &body.name, body.tracks)?;
    Ok((StatusCode::CREATED, Json(playlist)))
}

async fn get_playlist(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&session.actor(), Permission::OwnPlaylists)?;
    let playlist = user_manager
        .lock()
        .unwrap()
        .get_playlist(&id, session.user_id)?;
    Ok(Json(playlist))
}

async fn put_playlist(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(id): Path<String>,
    Json(body): Json<UpdatePlaylistBody>,
) -> Result<impl IntoResponse, ApiError> {
    require(&session.actor(), Permission::OwnPlaylists)?;
    debug!("Updating playlist with id {}", id);
    let playlist = user_manager.lock().unwrap().update_playlist(
        &id,
        session.user_id,
        body.name.as_deref(),
        body.tracks,
    )?;
    Ok(Json(playlist))
}

async fn delete_playlist(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&session.actor(), Permission::OwnPlaylists)?;
    user_manager
        .lock()
        .unwrap()
        .delete_playlist(&id, session.user_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_playlist_tracks(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(id): Path<String>,
    Json(body): Json<AddTracksToPlaylistBody>,
) -> Result<impl IntoResponse, ApiError> {
    require(&session.actor(), Permission::OwnPlaylists)?;
    let playlist = user_manager
        .lock()
        .unwrap()
        .add_playlist_tracks(&id, session.user_id, body.tracks)?;
    Ok(Json(playlist))
}

async fn remove_playlist_tracks(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(id): Path<String>,
    Json(body): Json<RemoveTracksFromPlaylistBody>,
) -> Result<impl IntoResponse, ApiError> {
    require(&session.actor(), Permission::OwnPlaylists)?;
    let playlist = user_manager.lock().unwrap().remove_playlist_tracks(
        &id,
        session.user_id,
        &body.positions,
    )?;
    Ok(Json(playlist))
}

async fn get_user_playlists(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
) -> Result<impl IntoResponse, ApiError> {
    require(&session.actor(), Permission::OwnPlaylists)?;
    let playlists = user_manager
        .lock()
        .unwrap()
        .get_user_playlists(session.user_id)?;
    Ok(Json(playlists))
}

async fn get_history(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require(&session.actor(), Permission::AccessCatalog)?;
    let history = user_manager
        .lock()
        .unwrap()
        .get_history(session.user_id, query.limit())?;
    Ok(Json(history))
}

async fn get_activities(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require(&session.actor(), Permission::AccessCatalog)?;
    let activities = user_manager
        .lock()
        .unwrap()
        .get_activities(session.user_id, query.limit())?;
    Ok(Json(activities))
}

pub fn make_user_routes(state: ServerState) -> Router {
    Router::new()
        .route("/profile", get(get_profile).put(put_profile))
        .route("/{id}", get(get_public_profile))
        .route("/playlist", post(post_playlist))
        .route(
            "/playlist/{id}",
            get(get_playlist).put(put_playlist).delete(delete_playlist),
        )
        .route("/playlist/{id}/add", put(add_playlist_tracks))
        .route("/playlist/{id}/remove", put(remove_playlist_tracks))
        .route("/playlists", get(get_user_playlists))
        .route("/history", get(get_history))
        .route("/activities", get(get_activities))
        .with_state(state)
}
