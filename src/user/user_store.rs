use super::auth::{AuthToken, AuthTokenValue, PasswordCredentials};
use super::permissions::UserRole;
use super::user_models::{
    ActivityEntry, ActivityKind, HistoryEntry, Playlist, ProfileUpdate, UserRecord,
};
use crate::catalog::Track;
use anyhow::Result;

pub trait UserAuthCredentialsStore: Send + Sync {
    /// Returns the password credentials of the user with the given handle.
    /// Returns Ok(None) if the user does not exist or has no password.
    fn get_password_credentials(&self, user_handle: &str) -> Result<Option<PasswordCredentials>>;

    /// Creates or replaces the password credentials of a user.
    fn set_password_credentials(&self, credentials: PasswordCredentials) -> Result<()>;

    /// Records a login attempt against the user's password, successful or not.
    fn record_password_attempt(&self, user_id: usize, succeeded: bool) -> Result<()>;
}

pub trait UserAuthTokenStore: Send + Sync {
    /// Returns Ok(None) if the token does not exist.
    fn get_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Deletes an auth token, returning it if it existed.
    fn delete_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>>;

    fn update_auth_token_last_used(&self, token: &AuthTokenValue) -> Result<()>;

    fn add_auth_token(&self, token: AuthToken) -> Result<()>;

    /// Removes tokens not used for the given number of days, returns how many.
    fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize>;
}

pub trait UserStore: UserAuthTokenStore + UserAuthCredentialsStore + Send + Sync {
    /// Creates a new user and returns its id. Fails if the handle is taken.
    fn create_user(&self, handle: &str, role: UserRole, approved: bool) -> Result<usize>;

    fn get_user(&self, user_id: usize) -> Result<Option<UserRecord>>;

    fn get_user_by_handle(&self, handle: &str) -> Result<Option<UserRecord>>;

    /// All users, oldest first.
    fn get_all_users(&self) -> Result<Vec<UserRecord>>;

    /// Returns Ok(false) if the user does not exist.
    fn update_profile(&self, user_id: usize, update: &ProfileUpdate) -> Result<bool>;

    fn set_user_role(&self, user_id: usize, role: UserRole) -> Result<bool>;

    fn set_user_approved(&self, user_id: usize, approved: bool) -> Result<bool>;
}

pub trait UserPlaylistStore: Send + Sync {
    /// Creates a playlist and returns its generated id.
    fn create_playlist(&self, user_id: usize, name: &str, tracks: &[Track]) -> Result<String>;

    /// Returns Ok(None) unless the playlist exists and belongs to `user_id`.
    fn get_playlist(&self, playlist_id: &str, user_id: usize) -> Result<Option<Playlist>>;

    fn get_user_playlists(&self, user_id: usize) -> Result<Vec<Playlist>>;

    /// Returns Ok(false) unless the playlist exists and belongs to `user_id`.
    fn update_playlist(
        &self,
        playlist_id: &str,
        user_id: usize,
        name: Option<&str>,
        tracks: Option<&[Track]>,
    ) -> Result<bool>;

    fn delete_playlist(&self, playlist_id: &str, user_id: usize) -> Result<bool>;
}

pub trait UserHistoryStore: Send + Sync {
    fn append_history(&self, user_id: usize, track: &Track, played_at: i64) -> Result<()>;

    /// Most recent first.
    fn get_history(&self, user_id: usize, limit: usize) -> Result<Vec<HistoryEntry>>;

    /// Deletes entries played before `older_than`, returns how many.
    fn prune_history(&self, older_than: i64) -> Result<usize>;
}

pub trait UserActivityStore: Send + Sync {
    fn record_activity(
        &self,
        user_id: usize,
        kind: ActivityKind,
        subject_id: &str,
        detail: Option<&str>,
    ) -> Result<()>;

    /// Most recent first.
    fn get_activities(&self, user_id: usize, limit: usize) -> Result<Vec<ActivityEntry>>;
}

/// Everything the user manager needs from persistence.
pub trait FullUserStore: UserStore + UserPlaylistStore + UserHistoryStore + UserActivityStore {}

impl<T: UserStore + UserPlaylistStore + UserHistoryStore + UserActivityStore> FullUserStore for T {}
