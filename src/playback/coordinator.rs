//! Queue and playback state machine for one listener.
//!
//! The coordinator owns no I/O: every operation mutates the state and returns the
//! [`PlayerCommand`]s the embedded player has to execute to reflect it.

use std::collections::VecDeque;

use rand::Rng;

use super::commands::{PlaybackOp, PlaybackSnapshot, PlaybackStatus, PlayerCommand};
use crate::catalog::{Track, TrackValidationError};

/// Maximum queue size to prevent memory exhaustion.
pub const MAX_QUEUE_SIZE: usize = 500;
pub const DEFAULT_VOLUME: u8 = 80;
const MAX_VOLUME: i64 = 100;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlaybackError {
    #[error("Nothing is loaded")]
    NothingLoaded,
    #[error("There are no search results")]
    NoResults,
    #[error("Result {index} is out of range ({len} results)")]
    ResultOutOfRange { index: usize, len: usize },
    #[error("Queue position {position} is out of range ({len} queued)")]
    QueuePositionOutOfRange { position: usize, len: usize },
    #[error("Queue size limit exceeded (max {MAX_QUEUE_SIZE})")]
    QueueLimitExceeded,
    #[error(transparent)]
    InvalidTrack(#[from] TrackValidationError),
}

pub type Commands = Result<Vec<PlayerCommand>, PlaybackError>;

#[derive(Debug, Clone)]
pub struct PlaybackCoordinator {
    status: PlaybackStatus,
    current: Option<Track>,
    elapsed_secs: f64,
    queue: VecDeque<Track>,
    recommended: Vec<Track>,
    results: Vec<Track>,
    results_cursor: Option<usize>,
    loop_enabled: bool,
    volume: u8,
}

impl Default for PlaybackCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackCoordinator {
    pub fn new() -> Self {
        Self {
            status: PlaybackStatus::Idle,
            current: None,
            elapsed_secs: 0.0,
            queue: VecDeque::new(),
            recommended: vec![],
            results: vec![],
            results_cursor: None,
            loop_enabled: false,
            volume: DEFAULT_VOLUME,
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    pub fn queue(&self) -> impl Iterator<Item = &Track> {
        self.queue.iter()
    }

    pub fn recommended(&self) -> &[Track] {
        &self.recommended
    }

    pub fn results_cursor(&self) -> Option<usize> {
        self.results_cursor
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            status: self.status,
            current: self.current.clone(),
            elapsed_secs: self.elapsed_secs,
            queue: self.queue.iter().cloned().collect(),
            recommended: self.recommended.clone(),
            results: self.results.clone(),
            results_cursor: self.results_cursor,
            loop_enabled: self.loop_enabled,
            volume: self.volume,
        }
    }

    pub fn apply(&mut self, op: PlaybackOp) -> Commands {
        self.apply_with(op, &mut rand::rng())
    }

    /// Same as [`apply`](Self::apply), drawing recommendations from `rng`.
    pub fn apply_with<R: Rng>(&mut self, op: PlaybackOp, rng: &mut R) -> Commands {
        match op {
            PlaybackOp::Load { track } => self.load(track),
            PlaybackOp::Pause => self.pause(),
            PlaybackOp::Resume => self.resume(),
            PlaybackOp::Toggle => self.toggle(),
            PlaybackOp::TrackEnded => self.track_ended_with(rng),
            PlaybackOp::SkipForward => Ok(self.advance_with(rng)),
            PlaybackOp::SkipBackward => self.skip_backward(),
            PlaybackOp::PlayResult { index } => self.play_result(index),
            PlaybackOp::Enqueue { track } => self.enqueue(track),
            PlaybackOp::EnqueueMany { tracks } => self.enqueue_many(tracks),
            PlaybackOp::RemoveFromQueue { position } => self.remove_from_queue(position),
            PlaybackOp::ClearQueue => Ok(self.clear_queue()),
            PlaybackOp::SetRecommended { tracks } => self.set_recommended(tracks),
            PlaybackOp::SetResults { tracks } => self.set_results(tracks),
            PlaybackOp::SetLoop { enabled } => Ok(self.set_loop(enabled)),
            PlaybackOp::Seek { secs } => self.seek(secs),
            PlaybackOp::SetVolume { level } => Ok(self.set_volume(level)),
            PlaybackOp::ReportPosition { secs } => self.report_position(secs),
        }
    }

    pub fn load(&mut self, track: Track) -> Commands {
        track.validate()?;
        if let Some(index) = self.results.iter().position(|r| r.id == track.id) {
            self.results_cursor = Some(index);
        }
        Ok(self.start(track))
    }

    fn start(&mut self, track: Track) -> Vec<PlayerCommand> {
        self.status = PlaybackStatus::Playing;
        self.elapsed_secs = 0.0;
        self.current = Some(track.clone());
        vec![PlayerCommand::Load { track }, PlayerCommand::Play]
    }

    pub fn pause(&mut self) -> Commands {
        match self.status {
            PlaybackStatus::Idle => Err(PlaybackError::NothingLoaded),
            PlaybackStatus::Paused => Ok(vec![]),
            PlaybackStatus::Playing => {
                self.status = PlaybackStatus::Paused;
                Ok(vec![PlayerCommand::Pause])
            }
        }
    }

    pub fn resume(&mut self) -> Commands {
        match self.status {
            PlaybackStatus::Idle => Err(PlaybackError::NothingLoaded),
            PlaybackStatus::Playing => Ok(vec![]),
            PlaybackStatus::Paused => {
                self.status = PlaybackStatus::Playing;
                Ok(vec![PlayerCommand::Play])
            }
        }
    }

    pub fn toggle(&mut self) -> Commands {
        match self.status {
            PlaybackStatus::Playing => self.pause(),
            _ => self.resume(),
        }
    }

    pub fn track_ended(&mut self) -> Commands {
        self.track_ended_with(&mut rand::rng())
    }

    pub fn track_ended_with<R: Rng>(&mut self, rng: &mut R) -> Commands {
        if self.current.is_none() {
            return Err(PlaybackError::NothingLoaded);
        }
        if self.loop_enabled {
            self.status = PlaybackStatus::Playing;
            self.elapsed_secs = 0.0;
            return Ok(vec![PlayerCommand::Seek { secs: 0.0 }, PlayerCommand::Play]);
        }
        Ok(self.advance_with(rng))
    }

    pub fn skip_forward(&mut self) -> Vec<PlayerCommand> {
        self.advance_with(&mut rand::rng())
    }

    /// Next queued track, else a random recommendation, else back to idle with a chime.
    pub fn advance_with<R: Rng>(&mut self, rng: &mut R) -> Vec<PlayerCommand> {
        if let Some(next) = self.queue.pop_front() {
            return self.start(next);
        }
        if !self.recommended.is_empty() {
            let index = rng.random_range(0..self.recommended.len());
            let next = self.recommended.remove(index);
            return self.start(next);
        }
        self.status = PlaybackStatus::Idle;
        self.current = None;
        self.elapsed_secs = 0.0;
        vec![PlayerCommand::Stop, PlayerCommand::PlayChime]
    }

    /// Steps back through the results with wraparound. Without a cursor it starts
    /// from the last result.
    pub fn skip_backward(&mut self) -> Commands {
        let len = self.results.len();
        if len == 0 {
            return Err(PlaybackError::NoResults);
        }
        let index = match self.results_cursor {
            Some(i) => (i + len - 1) % len,
            None => len - 1,
        };
        self.play_result(index)
    }

    pub fn play_result(&mut self, index: usize) -> Commands {
        let track = self
            .results
            .get(index)
            .cloned()
            .ok_or(PlaybackError::ResultOutOfRange {
                index,
                len: self.results.len(),
            })?;
        self.results_cursor = Some(index);
        Ok(self.start(track))
    }

    pub fn enqueue(&mut self, track: Track) -> Commands {
        self.enqueue_many(vec![track])
    }

    /// All or nothing: either every track fits in the queue or none is added.
    pub fn enqueue_many(&mut self, tracks: Vec<Track>) -> Commands {
        if self.queue.len() + tracks.len() > MAX_QUEUE_SIZE {
            return Err(PlaybackError::QueueLimitExceeded);
        }
        for track in &tracks {
            track.validate()?;
        }
        self.queue.extend(tracks);
        Ok(vec![])
    }

    pub fn remove_from_queue(&mut self, position: usize) -> Commands {
        let len = self.queue.len();
        self.queue
            .remove(position)
            .ok_or(PlaybackError::QueuePositionOutOfRange { position, len })?;
        Ok(vec![])
    }

    pub fn clear_queue(&mut self) -> Vec<PlayerCommand> {
        self.queue.clear();
        vec![]
    }

    pub fn set_recommended(&mut self, tracks: Vec<Track>) -> Commands {
        for track in &tracks {
            track.validate()?;
        }
        self.recommended = tracks;
        Ok(vec![])
    }

    pub fn set_results(&mut self, tracks: Vec<Track>) -> Commands {
        for track in &tracks {
            track.validate()?;
        }
        self.results = tracks;
        self.results_cursor = None;
        Ok(vec![])
    }

    pub fn set_loop(&mut self, enabled: bool) -> Vec<PlayerCommand> {
        self.loop_enabled = enabled;
        vec![]
    }

    pub fn seek(&mut self, secs: f64) -> Commands {
        if self.current.is_none() {
            return Err(PlaybackError::NothingLoaded);
        }
        let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
        self.elapsed_secs = secs;
        Ok(vec![PlayerCommand::Seek { secs }])
    }

    pub fn set_volume(&mut self, level: i64) -> Vec<PlayerCommand> {
        self.volume = level.clamp(0, MAX_VOLUME) as u8;
        vec![PlayerCommand::SetVolume { level: self.volume }]
    }

    fn report_position(&mut self, secs: f64) -> Commands {
        if self.current.is_none() {
            return Err(PlaybackError::NothingLoaded);
        }
        if secs.is_finite() {
            self.elapsed_secs = secs.max(0.0);
        }
        Ok(vec![])
    }
}
