pub mod auth;
pub mod permissions;
pub mod policy;
mod sqlite_user_store;
mod user_manager;
pub mod user_models;
mod user_store;

pub use auth::{AuthToken, AuthTokenValue, PasswordCredentials};
pub use permissions::{Permission, UserRole};
pub use policy::{Actor, PolicyDenial, UserChange};
pub use sqlite_user_store::SqliteUserStore;
pub use user_manager::{UserError, UserManager, UserResult, MAX_PLAYLIST_SIZE};
pub use user_models::{
    ActivityEntry, ActivityKind, HistoryEntry, Playlist, ProfileUpdate, PublicProfile,
    UserRecord, UserValidationError,
};
pub use user_store::{
    FullUserStore, UserActivityStore, UserAuthCredentialsStore, UserAuthTokenStore,
    UserHistoryStore, UserPlaylistStore, UserStore,
};
