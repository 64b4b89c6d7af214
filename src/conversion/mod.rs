//! Client for the external audio conversion service used by the download feature.

use std::time::Duration;

use anyhow::Context;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};

use crate::catalog::{is_valid_video_id, watch_url};

pub const DEFAULT_AUDIO_CONTENT_TYPE: &str = "audio/mpeg";
const MAX_FILE_STEM_LEN: usize = 120;

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Invalid video id: {0:?}")]
    InvalidVideoId(String),
    #[error("Conversion service responded with status {0}")]
    Upstream(u16),
    #[error("Conversion service returned no audio")]
    EmptyPayload,
    #[error("Could not reach conversion service: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct ConvertedAudio {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: String,
}

pub struct AudioConversionClient {
    client: reqwest::Client,
    endpoint: String,
}

impl AudioConversionClient {
    pub fn new(endpoint: &str, timeout_sec: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create conversion HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    /// Converts the video's audio track. `title` only drives the suggested file name.
    pub async fn convert(
        &self,
        video_id: &str,
        title: Option<&str>,
    ) -> Result<ConvertedAudio, ConversionError> {
        if !is_valid_video_id(video_id) {
            return Err(ConversionError::InvalidVideoId(video_id.to_string()));
        }
        let source = watch_url(video_id);
        debug!("Requesting conversion of {}", source);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("url", source.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConversionError::Upstream(status.as_u16()));
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_AUDIO_CONTENT_TYPE)
            .to_string();
        let bytes = response.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(ConversionError::EmptyPayload);
        }
        info!("Converted {} ({} bytes)", video_id, bytes.len());
        Ok(ConvertedAudio {
            bytes,
            content_type,
            file_name: audio_file_name(title.unwrap_or(video_id)),
        })
    }
}

/// Builds a download file name from a free-form title, keeping only characters that
/// are safe in a `Content-Disposition` header and on common filesystems.
pub fn audio_file_name(title: &str) -> String {
    let mut stem = String::new();
    let mut pending_space = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '(' | ')') {
            if pending_space && !stem.is_empty() {
                stem.push(' ');
            }
            pending_space = false;
            stem.push(c);
        } else {
            pending_space = true;
        }
        if stem.chars().count() >= MAX_FILE_STEM_LEN {
            break;
        }
    }
    if stem.is_empty() {
        "audio.mp3".to_string()
    } else {
        format!("{}.mp3", stem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::{header, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::Router;
    use std::collections::HashMap;

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(audio_file_name("Queen - Bohemian Rhapsody"), "Queen - Bohemian Rhapsody.mp3");
        assert_eq!(audio_file_name("a/b\\c\"d"), "a b c d.mp3");
        assert_eq!(audio_file_name("../../etc/passwd"), "etc passwd.mp3");
        assert_eq!(audio_file_name("???"), "audio.mp3");
        assert_eq!(audio_file_name("Café del Mar"), "Caf del Mar.mp3");
        assert_eq!(audio_file_name(&"x".repeat(500)).len(), MAX_FILE_STEM_LEN + 4);
    }

    async fn convert(Query(params): Query<HashMap<String, String>>) -> Response {
        match params.get("url").map(String::as_str) {
            Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ") => {
                ([(header::CONTENT_TYPE, "audio/ogg")], vec![1u8, 2, 3]).into_response()
            }
            Some("https://www.youtube.com/watch?v=AAAAAAAAAAA") => {
                (StatusCode::OK, Vec::<u8>::new()).into_response()
            }
            _ => StatusCode::BAD_GATEWAY.into_response(),
        }
    }

    async fn spawn_converter() -> String {
        let app = Router::new().route("/convert", get(convert));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/convert", addr)
    }

    #[tokio::test]
    async fn returns_payload_and_metadata() {
        let client = AudioConversionClient::new(&spawn_converter().await, 5).unwrap();
        let audio = client.convert("dQw4w9WgXcQ", Some("Rick: Astley")).await.unwrap();
        assert_eq!(audio.bytes, vec![1, 2, 3]);
        assert_eq!(audio.content_type, "audio/ogg");
        assert_eq!(audio.file_name, "Rick Astley.mp3");
    }

    #[tokio::test]
    async fn reports_upstream_failures() {
        let client = AudioConversionClient::new(&spawn_converter().await, 5).unwrap();
        assert!(matches!(
            client.convert("AAAAAAAAAAA", None).await,
            Err(ConversionError::EmptyPayload)
        ));
        assert!(matches!(
            client.convert("BBBBBBBBBBB", None).await,
            Err(ConversionError::Upstream(502))
        ));
        assert!(matches!(
            client.convert("not an id", None).await,
            Err(ConversionError::InvalidVideoId(_))
        ));
    }
}
