use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use super::metrics;
use crate::conversion::ConversionError;
use crate::playback::PlaybackError;
use crate::social::SocialError;
use crate::user::{PolicyDenial, UserError};
use crate::video::VideoSearchError;

/// Failure of an HTTP handler, rendered as `{"error": "<message>"}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(err) = &self {
            error!("Internal error: {:#}", err);
            metrics::record_error("internal");
        }
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl From<PolicyDenial> for ApiError {
    fn from(denial: PolicyDenial) -> Self {
        ApiError::Forbidden(denial.to_string())
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Validation(_)
            | UserError::InvalidTrack(_)
            | UserError::WeakPassword
            | UserError::PlaylistFull(_) => ApiError::BadRequest(err.to_string()),
            UserError::HandleTaken(_) => ApiError::Conflict(err.to_string()),
            UserError::InvalidCredentials => ApiError::Unauthorized,
            UserError::UserNotFound | UserError::PlaylistNotFound => {
                ApiError::NotFound(err.to_string())
            }
            UserError::Denied(denial) => denial.into(),
            UserError::Internal(err) => ApiError::Internal(err),
        }
    }
}

impl From<SocialError> for ApiError {
    fn from(err: SocialError) -> Self {
        match err {
            SocialError::Validation(_) | SocialError::InvalidParent => {
                ApiError::BadRequest(err.to_string())
            }
            SocialError::PostNotFound | SocialError::CommentNotFound => {
                ApiError::NotFound(err.to_string())
            }
            SocialError::Denied(denial) => denial.into(),
            SocialError::Internal(err) => ApiError::Internal(err),
        }
    }
}

impl From<PlaybackError> for ApiError {
    fn from(err: PlaybackError) -> Self {
        match err {
            PlaybackError::NothingLoaded
            | PlaybackError::NoResults
            | PlaybackError::QueueLimitExceeded => ApiError::Conflict(err.to_string()),
            PlaybackError::ResultOutOfRange { .. }
            | PlaybackError::QueuePositionOutOfRange { .. }
            | PlaybackError::InvalidTrack(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<VideoSearchError> for ApiError {
    fn from(err: VideoSearchError) -> Self {
        match err {
            VideoSearchError::NotFound(_) => ApiError::NotFound(err.to_string()),
            _ => ApiError::Unavailable(err.to_string()),
        }
    }
}

impl From<ConversionError> for ApiError {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::InvalidVideoId(_) => ApiError::BadRequest(err.to_string()),
            _ => ApiError::Unavailable(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::Permission;

    #[test]
    fn maps_domain_errors_to_statuses() {
        assert_eq!(
            ApiError::from(UserError::HandleTaken("x".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(UserError::Denied(PolicyDenial::OwnerImmutable)).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(SocialError::PostNotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(PlaybackError::NothingLoaded).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(VideoSearchError::NoApiKeys).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(PolicyDenial::MissingPermission(Permission::ManageUsers)).status(),
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let response = ApiError::from(anyhow::anyhow!("disk on fire")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
    }
}
