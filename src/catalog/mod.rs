mod track;

pub use track::{is_valid_video_id, watch_url, Track, TrackValidationError};
