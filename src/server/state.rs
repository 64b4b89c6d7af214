use axum::extract::FromRef;

use crate::conversion::AudioConversionClient;
use crate::offline::OfflineLibrary;
use crate::playback::PlaybackSessionManager;
use crate::social::FeedService;
use crate::user::UserManager;
use crate::video::VideoSource;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use super::ServerConfig;

pub type GuardedUserManager = Arc<Mutex<UserManager>>;
pub type GuardedFeedService = Arc<FeedService>;
pub type GuardedPlaybackSessions = Arc<PlaybackSessionManager>;
pub type OptionalVideoSource = Option<Arc<dyn VideoSource>>;
pub type OptionalConverter = Option<Arc<AudioConversionClient>>;
pub type GuardedOfflineLibrary = Arc<OfflineLibrary>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub user_manager: GuardedUserManager,
    pub feed: GuardedFeedService,
    pub playback: GuardedPlaybackSessions,
    pub video_source: OptionalVideoSource,
    pub converter: OptionalConverter,
    pub offline: GuardedOfflineLibrary,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedFeedService {
    fn from_ref(input: &ServerState) -> Self {
        input.feed.clone()
    }
}

impl FromRef<ServerState> for GuardedPlaybackSessions {
    fn from_ref(input: &ServerState) -> Self {
        input.playback.clone()
    }
}

impl FromRef<ServerState> for OptionalVideoSource {
    fn from_ref(input: &ServerState) -> Self {
        input.video_source.clone()
    }
}

impl FromRef<ServerState> for OptionalConverter {
    fn from_ref(input: &ServerState) -> Self {
        input.converter.clone()
    }
}

impl FromRef<ServerState> for GuardedOfflineLibrary {
    fn from_ref(input: &ServerState) -> Self {
        input.offline.clone()
    }
}
