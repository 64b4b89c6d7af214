use axum::{
    extract::{Path, Query, State},
    http::header,
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::debug;

use super::error::ApiError;
use super::http_cache;
use super::session::Session;
use super::state::{GuardedOfflineLibrary, OptionalConverter, OptionalVideoSource, ServerState};
use crate::user::policy::require;
use crate::user::Permission;
use crate::video::{search_with_fallback, VideoDetails, MAX_SEARCH_RESULTS};

const DEFAULT_SEARCH_RESULTS: u32 = 20;

#[derive(Deserialize, Debug)]
struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub max: Option<u32>,
}

#[derive(Deserialize, Debug)]
struct DownloadParams {
    pub title: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct OfflineParams {
    #[serde(default)]
    pub q: String,
}

async fn search(
    session: Session,
    State(state): State<ServerState>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    require(&session.actor(), Permission::AccessCatalog)?;
    let query = params.q.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Search query is empty".to_string()));
    }
    let max = params
        .max
        .unwrap_or(DEFAULT_SEARCH_RESULTS)
        .clamp(1, MAX_SEARCH_RESULTS);
    let outcome =
        search_with_fallback(state.video_source.as_deref(), &state.offline, query, max).await;
    Ok(Json(outcome))
}

async fn get_video(
    session: Session,
    State(video_source): State<OptionalVideoSource>,
    State(offline): State<GuardedOfflineLibrary>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&session.actor(), Permission::AccessCatalog)?;
    match video_source {
        Some(source) => Ok(Json(source.video_details(&id).await?)),
        None => {
            debug!("No video API configured, looking up {} offline", id);
            let track = offline
                .tracks()
                .iter()
                .find(|t| t.id == id)
                .cloned()
                .ok_or_else(|| ApiError::NotFound(format!("Video {} not found", id)))?;
            Ok(Json(VideoDetails {
                track,
                description: String::new(),
                published_at: None,
                view_count: None,
                like_count: None,
            }))
        }
    }
}

async fn download_audio(
    session: Session,
    State(converter): State<OptionalConverter>,
    Path(id): Path<String>,
    Query(params): Query<DownloadParams>,
) -> Result<impl IntoResponse, ApiError> {
    require(&session.actor(), Permission::DownloadAudio)?;
    let converter = converter
        .ok_or_else(|| ApiError::Unavailable("Audio download is not configured".to_string()))?;
    let audio = converter.convert(&id, params.title.as_deref()).await?;
    let disposition = format!("attachment; filename=\"{}\"", audio.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, audio.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        audio.bytes,
    ))
}

async fn get_offline_tracks(
    session: Session,
    State(offline): State<GuardedOfflineLibrary>,
    Query(params): Query<OfflineParams>,
) -> Result<impl IntoResponse, ApiError> {
    require(&session.actor(), Permission::AccessCatalog)?;
    Ok(Json(offline.search(&params.q)))
}

pub fn make_content_routes(state: ServerState) -> Router {
    Router::new()
        .route("/search", get(search))
        .route("/download/{id}", get(download_audio))
        .route(
            "/video/{id}",
            get(get_video).layer(middleware::from_fn_with_state(
                state.config.content_cache_age_sec,
                http_cache,
            )),
        )
        .with_state(state)
}

pub fn make_offline_routes(state: ServerState) -> Router {
    Router::new()
        .route("/tracks", get(get_offline_tracks))
        .with_state(state)
}
