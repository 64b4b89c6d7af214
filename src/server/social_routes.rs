use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;

use super::error::ApiError;
use super::session::Session;
use super::state::{GuardedFeedService, ServerState};
use crate::social::{FeedQuery, NewComment, NewPost, PostEdit, ReactionKind};

#[derive(Deserialize, Debug, Default)]
struct FeedParams {
    pub before: Option<i64>,
    pub author_id: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Deserialize, Debug)]
struct ReactionBody {
    pub kind: ReactionKind,
}

async fn get_feed(
    session: Session,
    State(feed): State<GuardedFeedService>,
    Query(params): Query<FeedParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = FeedQuery {
        before: params.before,
        author_id: params.author_id,
        limit: params.limit,
    };
    Ok(Json(feed.feed(&session.actor(), query)?))
}

async fn post_post(
    session: Session,
    State(feed): State<GuardedFeedService>,
    Json(body): Json<NewPost>,
) -> Result<impl IntoResponse, ApiError> {
    let post = feed.create_post(&session.author(), body)?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post(
    session: Session,
    State(feed): State<GuardedFeedService>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(feed.get_post(&session.actor(), &id)?))
}

async fn put_post(
    session: Session,
    State(feed): State<GuardedFeedService>,
    Path(id): Path<String>,
    Json(body): Json<PostEdit>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(feed.edit_post(&session.actor(), &id, body)?))
}

async fn delete_post(
    session: Session,
    State(feed): State<GuardedFeedService>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    feed.delete_post(&session.actor(), &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn put_reaction(
    session: Session,
    State(feed): State<GuardedFeedService>,
    Path(id): Path<String>,
    Json(body): Json<ReactionBody>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(feed.react(&session.actor(), &id, body.kind)?))
}

async fn delete_reaction(
    session: Session,
    State(feed): State<GuardedFeedService>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(feed.remove_reaction(&session.actor(), &id)?))
}

async fn post_comment(
    session: Session,
    State(feed): State<GuardedFeedService>,
    Path(post_id): Path<String>,
    Json(body): Json<NewComment>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = feed.add_comment(&session.author(), &post_id, body)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn delete_comment(
    session: Session,
    State(feed): State<GuardedFeedService>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = feed.delete_comment(&session.actor(), &id)?;
    Ok(Json(deleted))
}

pub fn make_social_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", get(get_feed))
        .route("/post", post(post_post))
        .route("/post/{id}", get(get_post).put(put_post).delete(delete_post))
        .route(
            "/post/{id}/reaction",
            put(put_reaction).delete(delete_reaction),
        )
        .route("/post/{id}/comment", post(post_comment))
        .route("/comment/{id}", delete(delete_comment))
        .with_state(state)
}
