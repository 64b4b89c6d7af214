//! Per-user playback sessions shared by every connection of the same user.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

use super::commands::{PlaybackOp, PlaybackSnapshot, PlaybackUpdate, PlayerCommand};
use super::coordinator::{PlaybackCoordinator, PlaybackError};
use crate::user::UserManager;

const UPDATES_CAPACITY: usize = 64;

struct UserPlayback {
    coordinator: PlaybackCoordinator,
    updates: broadcast::Sender<PlaybackUpdate>,
}

impl UserPlayback {
    fn new() -> Self {
        let (updates, _) = broadcast::channel(UPDATES_CAPACITY);
        Self {
            coordinator: PlaybackCoordinator::new(),
            updates,
        }
    }
}

pub struct PlaybackSessionManager {
    sessions: RwLock<HashMap<usize, UserPlayback>>,
    user_manager: Arc<Mutex<UserManager>>,
}

impl PlaybackSessionManager {
    pub fn new(user_manager: Arc<Mutex<UserManager>>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            user_manager,
        }
    }

    /// Applies `op` to the user's session, records every loaded track in the
    /// listening history and relays the resulting update to the user's subscribers.
    pub async fn apply(
        &self,
        user_id: usize,
        op: PlaybackOp,
    ) -> Result<PlaybackUpdate, PlaybackError> {
        let op_name = op.name();
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(user_id).or_insert_with(UserPlayback::new);

        let commands = session.coordinator.apply(op)?;
        debug!(
            "User {} applied {} -> {} commands",
            user_id,
            op_name,
            commands.len()
        );
        self.record_loaded_tracks(user_id, &commands);

        let update = PlaybackUpdate {
            commands,
            snapshot: session.coordinator.snapshot(),
        };
        if session.updates.send(update.clone()).is_err() {
            debug!("No playback subscribers for user {}", user_id);
        }
        Ok(update)
    }

    fn record_loaded_tracks(&self, user_id: usize, commands: &[PlayerCommand]) {
        for command in commands {
            if let PlayerCommand::Load { track } = command {
                let result = self.user_manager.lock().unwrap().record_play(user_id, track);
                if let Err(err) = result {
                    warn!("{:#}", err);
                }
            }
        }
    }

    pub async fn snapshot(&self, user_id: usize) -> PlaybackSnapshot {
        let sessions = self.sessions.read().await;
        match sessions.get(&user_id) {
            Some(session) => session.coordinator.snapshot(),
            None => PlaybackCoordinator::new().snapshot(),
        }
    }

    pub async fn subscribe(&self, user_id: usize) -> broadcast::Receiver<PlaybackUpdate> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(user_id)
            .or_insert_with(UserPlayback::new)
            .updates
            .subscribe()
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }
}
