mod client;
mod fallback;
mod key_rotation;
mod models;

pub use client::{
    VideoSearchClient, VideoSearchError, VideoSource, DEFAULT_VIDEO_API_BASE_URL,
    MAX_SEARCH_RESULTS,
};
pub use fallback::{search_with_fallback, SearchOutcome};
pub use key_rotation::ApiKeyRing;
pub use models::{parse_iso8601_duration, VideoDetails};
