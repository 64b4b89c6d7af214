//! Track records: references to externally hosted videos.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref VIDEO_ID_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap();
}

const MAX_TITLE_LEN: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Video id on the external platform.
    pub id: String,
    pub title: String,
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackValidationError {
    #[error("Invalid video id: {0:?}")]
    InvalidId(String),
    #[error("Track title must be between 1 and {MAX_TITLE_LEN} characters")]
    InvalidTitle,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        channel: impl Into<String>,
        thumbnail: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            channel: channel.into(),
            thumbnail,
            duration_secs: None,
        }
    }

    /// Checks a track received from a client before it is stored or queued.
    pub fn validate(&self) -> Result<(), TrackValidationError> {
        if !is_valid_video_id(&self.id) {
            return Err(TrackValidationError::InvalidId(self.id.clone()));
        }
        let title_len = self.title.chars().count();
        if title_len == 0 || title_len > MAX_TITLE_LEN {
            return Err(TrackValidationError::InvalidTitle);
        }
        Ok(())
    }
}

pub fn is_valid_video_id(id: &str) -> bool {
    VIDEO_ID_REGEX.is_match(id)
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}
