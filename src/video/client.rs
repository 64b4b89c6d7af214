//! HTTP client for the video platform's data API.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::key_rotation::ApiKeyRing;
use super::models::{ApiList, SearchItem, VideoDetails, VideoItem};
use crate::catalog::{is_valid_video_id, Track};
use crate::server::metrics;

pub const DEFAULT_VIDEO_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
pub const MAX_SEARCH_RESULTS: u32 = 50;
const MUSIC_CATEGORY_ID: &str = "10";

#[derive(Debug, thiserror::Error)]
pub enum VideoSearchError {
    #[error("No video API keys are configured")]
    NoApiKeys,
    #[error("Every video API key was refused ({attempts} attempts)")]
    QuotaExhausted { attempts: usize },
    #[error("Video {0} not found")]
    NotFound(String),
    #[error("Video API responded with status {0}")]
    Upstream(u16),
    #[error("Invalid response from video API: {0}")]
    InvalidResponse(String),
    #[error("Could not reach video API: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Source of search results and video metadata.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoSource: Send + Sync {
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<Track>, VideoSearchError>;

    async fn video_details(&self, video_id: &str) -> Result<VideoDetails, VideoSearchError>;
}

pub struct VideoSearchClient {
    client: reqwest::Client,
    base_url: String,
    keys: ApiKeyRing,
}

impl VideoSearchClient {
    pub fn new(keys: Vec<String>, base_url: &str, timeout_sec: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create video API HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            keys: ApiKeyRing::new(keys),
        })
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Issues the request with the active key. A 403 or 429 rotates to the next key
    /// and retries, until every key has been tried once.
    async fn get_rotating<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, VideoSearchError> {
        if self.keys.is_empty() {
            return Err(VideoSearchError::NoApiKeys);
        }
        let url = format!("{}/{}", self.base_url, endpoint);
        let attempts = self.keys.len();
        for attempt in 1..=attempts {
            let (index, key) = self.keys.current().ok_or(VideoSearchError::NoApiKeys)?;
            let response = self
                .client
                .get(&url)
                .query(params)
                .query(&[("key", key)])
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
                warn!(
                    "Video API key #{} refused with {} (attempt {}/{}), rotating",
                    index, status, attempt, attempts
                );
                metrics::record_video_key_rotation();
                self.keys.rotate_from(index);
                continue;
            }
            if !status.is_success() {
                return Err(VideoSearchError::Upstream(status.as_u16()));
            }
            return response
                .json::<T>()
                .await
                .map_err(|e| VideoSearchError::InvalidResponse(e.to_string()));
        }
        Err(VideoSearchError::QuotaExhausted { attempts })
    }
}

#[async_trait]
impl VideoSource for VideoSearchClient {
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<Track>, VideoSearchError> {
        let max_results = max_results.clamp(1, MAX_SEARCH_RESULTS);
        let params = [
            ("part", "snippet".to_string()),
            ("type", "video".to_string()),
            ("videoCategoryId", MUSIC_CATEGORY_ID.to_string()),
            ("maxResults", max_results.to_string()),
            ("q", query.to_string()),
        ];
        let list: ApiList<SearchItem> = self.get_rotating("search", &params).await?;
        let tracks: Vec<Track> = list
            .items
            .into_iter()
            .filter_map(SearchItem::into_track)
            .collect();
        debug!("Video search {:?} returned {} tracks", query, tracks.len());
        Ok(tracks)
    }

    async fn video_details(&self, video_id: &str) -> Result<VideoDetails, VideoSearchError> {
        if !is_valid_video_id(video_id) {
            return Err(VideoSearchError::NotFound(video_id.to_string()));
        }
        let params = [
            ("part", "snippet,contentDetails,statistics".to_string()),
            ("id", video_id.to_string()),
        ];
        let list: ApiList<VideoItem> = self.get_rotating("videos", &params).await?;
        list.items
            .into_iter()
            .next()
            .map(VideoItem::into_details)
            .ok_or_else(|| VideoSearchError::NotFound(video_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Query, State};
    use axum::http::StatusCode as AxumStatus;
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone)]
    struct MockApi {
        hits: Arc<AtomicUsize>,
        refusal: AxumStatus,
    }

    async fn search(
        State(api): State<MockApi>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Response {
        api.hits.fetch_add(1, Ordering::SeqCst);
        if params.get("key").map(String::as_str) != Some("good") {
            return api.refusal.into_response();
        }
        Json(serde_json::json!({
            "items": [{
                "id": {"videoId": "dQw4w9WgXcQ"},
                "snippet": {"title": params.get("q").cloned().unwrap_or_default(), "channelTitle": "Artist"}
            }]
        }))
        .into_response()
    }

    async fn videos(Query(params): Query<HashMap<String, String>>) -> Response {
        if params.get("id").map(String::as_str) == Some("dQw4w9WgXcQ") {
            Json(serde_json::json!({"items": [{
                "id": "dQw4w9WgXcQ",
                "snippet": {"title": "Song", "channelTitle": "Artist"},
                "contentDetails": {"duration": "PT3M33S"}
            }]}))
            .into_response()
        } else {
            Json(serde_json::json!({"items": []})).into_response()
        }
    }

    async fn spawn_api(refusal: AxumStatus) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/search", get(search))
            .route("/videos", get(videos))
            .with_state(MockApi {
                hits: hits.clone(),
                refusal,
            });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), hits)
    }

    fn client(keys: &[&str], base_url: &str) -> VideoSearchClient {
        VideoSearchClient::new(keys.iter().map(|k| k.to_string()).collect(), base_url, 5).unwrap()
    }

    #[tokio::test]
    async fn no_keys_fails_without_requests() {
        let (url, hits) = spawn_api(AxumStatus::FORBIDDEN).await;
        let client = client(&[], &url);
        assert!(matches!(
            client.search("x", 5).await,
            Err(VideoSearchError::NoApiKeys)
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rotates_past_refused_keys() {
        let (url, hits) = spawn_api(AxumStatus::TOO_MANY_REQUESTS).await;
        let client = client(&["spent", "also-spent", "good"], &url);
        let tracks = client.search("lofi", 5).await.unwrap();
        assert_eq!(tracks[0].title, "lofi");
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        // The working key stays active.
        client.search("again", 5).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn gives_up_after_one_attempt_per_key() {
        let (url, hits) = spawn_api(AxumStatus::FORBIDDEN).await;
        let client = client(&["a", "b"], &url);
        assert!(matches!(
            client.search("x", 5).await,
            Err(VideoSearchError::QuotaExhausted { attempts: 2 })
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn other_errors_do_not_rotate() {
        let (url, hits) = spawn_api(AxumStatus::INTERNAL_SERVER_ERROR).await;
        let client = client(&["a", "good"], &url);
        assert!(matches!(
            client.search("x", 5).await,
            Err(VideoSearchError::Upstream(500))
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetches_video_details() {
        let (url, _) = spawn_api(AxumStatus::FORBIDDEN).await;
        let client = client(&["good"], &url);
        let details = client.video_details("dQw4w9WgXcQ").await.unwrap();
        assert_eq!(details.track.duration_secs, Some(213));
        assert!(matches!(
            client.video_details("AAAAAAAAAAA").await,
            Err(VideoSearchError::NotFound(_))
        ));
        assert!(matches!(
            client.video_details("../etc").await,
            Err(VideoSearchError::NotFound(_))
        ));
    }
}
