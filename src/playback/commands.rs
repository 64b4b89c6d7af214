//! Typed messages exchanged with the embedded player.

use serde::{Deserialize, Serialize};

use crate::catalog::Track;

/// Instruction for the embedded player, emitted by every coordinator operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum PlayerCommand {
    Load { track: Track },
    Play,
    Pause,
    Seek { secs: f64 },
    SetVolume { level: u8 },
    Stop,
    /// End of queue reached, play the short notification sound.
    PlayChime,
}

/// Operation requested by a client on its playback session.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PlaybackOp {
    Load { track: Track },
    Pause,
    Resume,
    Toggle,
    TrackEnded,
    SkipForward,
    SkipBackward,
    PlayResult { index: usize },
    Enqueue { track: Track },
    EnqueueMany { tracks: Vec<Track> },
    RemoveFromQueue { position: usize },
    ClearQueue,
    SetRecommended { tracks: Vec<Track> },
    SetResults { tracks: Vec<Track> },
    SetLoop { enabled: bool },
    Seek { secs: f64 },
    SetVolume { level: i64 },
    /// Elapsed time reported by the player, no command is emitted back.
    ReportPosition { secs: f64 },
}

impl PlaybackOp {
    pub fn name(&self) -> &'static str {
        match self {
            PlaybackOp::Load { .. } => "load",
            PlaybackOp::Pause => "pause",
            PlaybackOp::Resume => "resume",
            PlaybackOp::Toggle => "toggle",
            PlaybackOp::TrackEnded => "track_ended",
            PlaybackOp::SkipForward => "skip_forward",
            PlaybackOp::SkipBackward => "skip_backward",
            PlaybackOp::PlayResult { .. } => "play_result",
            PlaybackOp::Enqueue { .. } => "enqueue",
            PlaybackOp::EnqueueMany { .. } => "enqueue_many",
            PlaybackOp::RemoveFromQueue { .. } => "remove_from_queue",
            PlaybackOp::ClearQueue => "clear_queue",
            PlaybackOp::SetRecommended { .. } => "set_recommended",
            PlaybackOp::SetResults { .. } => "set_results",
            PlaybackOp::SetLoop { .. } => "set_loop",
            PlaybackOp::Seek { .. } => "seek",
            PlaybackOp::SetVolume { .. } => "set_volume",
            PlaybackOp::ReportPosition { .. } => "report_position",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Idle,
    Playing,
    Paused,
}

/// Full observable state of a playback session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub status: PlaybackStatus,
    pub current: Option<Track>,
    pub elapsed_secs: f64,
    pub queue: Vec<Track>,
    pub recommended: Vec<Track>,
    pub results: Vec<Track>,
    pub results_cursor: Option<usize>,
    pub loop_enabled: bool,
    pub volume: u8,
}

/// What a client gets back after applying an op, and what other connections of the
/// same user receive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackUpdate {
    pub commands: Vec<PlayerCommand>,
    pub snapshot: PlaybackSnapshot,
}
