mod commands;
mod coordinator;
mod sessions;

pub use commands::{PlaybackOp, PlaybackSnapshot, PlaybackStatus, PlaybackUpdate, PlayerCommand};
pub use coordinator::{PlaybackCoordinator, PlaybackError, DEFAULT_VOLUME, MAX_QUEUE_SIZE};
pub use sessions::PlaybackSessionManager;
