use super::{
    auth::PasswordCredentials,
    permissions::UserRole,
    policy::{authorize_user_change, require, Actor, PolicyDenial, Target, UserChange},
    user_models::{
        validate_handle, validate_playlist_name, ActivityEntry, ActivityKind, HistoryEntry,
        Playlist, ProfileUpdate, UserRecord, UserValidationError,
    },
    AuthToken, AuthTokenValue, FullUserStore, Permission,
};
use crate::catalog::{Track, TrackValidationError};
use crate::clock::{now_millis, MILLIS_PER_DAY};
use anyhow::Context;
use std::time::SystemTime;
use tracing::{debug, info};

pub const MAX_PLAYLIST_SIZE: usize = 300;
pub const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 256;
/// Recorded as the subject of role and approval changes made through `cli-auth`.
pub const CLI_CHANGE_SUBJECT: &str = "cli";

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error(transparent)]
    Validation(#[from] UserValidationError),
    #[error(transparent)]
    InvalidTrack(#[from] TrackValidationError),
    #[error("Password must be between {MIN_PASSWORD_LEN} and {MAX_PASSWORD_LEN} characters")]
    WeakPassword,
    #[error("Handle {0} is already taken")]
    HandleTaken(String),
    #[error("Invalid handle or password")]
    InvalidCredentials,
    #[error("User not found")]
    UserNotFound,
    #[error("Playlist not found")]
    PlaylistNotFound,
    #[error("Playlists cannot hold more than {MAX_PLAYLIST_SIZE} tracks (attempted: {0})")]
    PlaylistFull(usize),
    #[error(transparent)]
    Denied(#[from] PolicyDenial),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type UserResult<T> = Result<T, UserError>;

fn validate_password(password: &str) -> UserResult<()> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        return Err(UserError::WeakPassword);
    }
    Ok(())
}

fn validate_tracks(tracks: &[Track]) -> UserResult<()> {
    if tracks.len() > MAX_PLAYLIST_SIZE {
        return Err(UserError::PlaylistFull(tracks.len()));
    }
    for track in tracks {
        track.validate()?;
    }
    Ok(())
}

pub struct UserManager {
    user_store: Box<dyn FullUserStore>,
    require_approval: bool,
}

impl UserManager {
    pub fn new(user_store: Box<dyn FullUserStore>, require_approval: bool) -> Self {
        Self {
            user_store,
            require_approval,
        }
    }

    /// Creates a user without credentials. Used by the admin CLI.
    pub fn add_user(&self, handle: &str, role: UserRole, approved: bool) -> UserResult<usize> {
        validate_handle(handle)?;
        if self.user_store.get_user_by_handle(handle)?.is_some() {
            return Err(UserError::HandleTaken(handle.to_string()));
        }
        Ok(self.user_store.create_user(handle, role, approved)?)
    }

    /// Self-service sign up. New accounts are regular users, pending approval when
    /// the server requires it.
    pub fn register(&self, handle: &str, password: &str) -> UserResult<UserRecord> {
        validate_password(password)?;
        let user_id = self.add_user(handle, UserRole::User, !self.require_approval)?;
        self.user_store
            .set_password_credentials(PasswordCredentials::create(user_id, password)?)?;
        info!("Registered user {} ({})", handle, user_id);
        self.get_user(user_id)?.ok_or(UserError::UserNotFound)
    }

    pub fn set_password(&self, handle: &str, password: &str) -> UserResult<()> {
        validate_password(password)?;
        let user = self
            .user_store
            .get_user_by_handle(handle)?
            .ok_or(UserError::UserNotFound)?;
        self.user_store
            .set_password_credentials(PasswordCredentials::create(user.id, password)?)?;
        Ok(())
    }

    /// Verifies the password and issues a fresh session token.
    pub fn login(&self, handle: &str, password: &str) -> UserResult<(UserRecord, AuthToken)> {
        let credentials = self
            .user_store
            .get_password_credentials(handle)?
            .ok_or(UserError::InvalidCredentials)?;
        let matches = credentials.matches(password)?;
        self.user_store
            .record_password_attempt(credentials.user_id, matches)?;
        if !matches {
            debug!("Wrong password for {}", handle);
            return Err(UserError::InvalidCredentials);
        }

        let user = self
            .get_user(credentials.user_id)?
            .ok_or(UserError::UserNotFound)?;
        let token = AuthToken {
            user_id: user.id,
            value: AuthTokenValue::generate(),
            created: SystemTime::now(),
            last_used: None,
        };
        self.user_store.add_auth_token(token.clone())?;
        Ok((user, token))
    }

    pub fn get_auth_token(&self, value: &AuthTokenValue) -> anyhow::Result<Option<AuthToken>> {
        self.user_store.get_auth_token(value)
    }

    pub fn update_auth_token_last_used(&self, value: &AuthTokenValue) -> anyhow::Result<()> {
        self.user_store.update_auth_token_last_used(value)
    }

    /// Deletes the token, but only if it belongs to `user_id`.
    pub fn logout(&self, user_id: usize, value: &AuthTokenValue) -> UserResult<()> {
        match self.user_store.get_auth_token(value)? {
            Some(token) if token.user_id == user_id => {
                self.user_store.delete_auth_token(value)?;
                Ok(())
            }
            _ => Err(UserError::InvalidCredentials),
        }
    }

    pub fn get_user(&self, user_id: usize) -> anyhow::Result<Option<UserRecord>> {
        self.user_store.get_user(user_id)
    }

    pub fn get_user_by_handle(&self, handle: &str) -> anyhow::Result<Option<UserRecord>> {
        self.user_store.get_user_by_handle(handle)
    }

    pub fn get_all_users(&self, actor: &Actor) -> UserResult<Vec<UserRecord>> {
        require(actor, Permission::ManageUsers)?;
        Ok(self.user_store.get_all_users()?)
    }

    pub fn update_profile(&self, user_id: usize, update: &ProfileUpdate) -> UserResult<UserRecord> {
        update.validate()?;
        if !self.user_store.update_profile(user_id, update)? {
            return Err(UserError::UserNotFound);
        }
        self.get_user(user_id)?.ok_or(UserError::UserNotFound)
    }

    /// Applies an administrative change after checking it against the policy.
    pub fn change_user(
        &self,
        actor: &Actor,
        target_id: usize,
        change: UserChange,
    ) -> UserResult<UserRecord> {
        let target = self
            .user_store
            .get_user(target_id)?
            .ok_or(UserError::UserNotFound)?;
        authorize_user_change(
            actor,
            &Target {
                user_id: target.id,
                role: target.role,
            },
            change,
        )?;
        self.apply_change(target_id, change, &actor.user_id.to_string())
    }

    /// Applies a change with no policy check. Only the admin CLI calls this.
    pub fn force_change_user(&self, handle: &str, change: UserChange) -> UserResult<UserRecord> {
        let target = self
            .user_store
            .get_user_by_handle(handle)?
            .ok_or(UserError::UserNotFound)?;
        self.apply_change(target.id, change, CLI_CHANGE_SUBJECT)
    }

    fn apply_change(
        &self,
        target_id: usize,
        change: UserChange,
        changed_by: &str,
    ) -> UserResult<UserRecord> {
        match change {
            UserChange::SetRole(role) => {
                self.user_store.set_user_role(target_id, role)?;
                self.user_store.record_activity(
                    target_id,
                    ActivityKind::RoleChanged,
                    changed_by,
                    Some(role.as_str()),
                )?;
                info!("User {} role set to {} by {}", target_id, role.as_str(), changed_by);
            }
            UserChange::SetApproval(approved) => {
                self.user_store.set_user_approved(target_id, approved)?;
                self.user_store.record_activity(
                    target_id,
                    ActivityKind::ApprovalChanged,
                    changed_by,
                    Some(if approved { "approved" } else { "revoked" }),
                )?;
                info!("User {} approval set to {} by {}", target_id, approved, changed_by);
            }
        }
        self.get_user(target_id)?.ok_or(UserError::UserNotFound)
    }

    pub fn create_playlist(
        &self,
        user_id: usize,
        name: &str,
        tracks: Vec<Track>,
    ) -> UserResult<Playlist> {
        validate_playlist_name(name)?;
        validate_tracks(&tracks)?;
        let playlist_id = self
            .user_store
            .create_playlist(user_id, name.trim(), &tracks)?;
        self.user_store.record_activity(
            user_id,
            ActivityKind::PlaylistCreated,
            &playlist_id,
            Some(name.trim()),
        )?;
        self.get_playlist(&playlist_id, user_id)
    }

    pub fn get_playlist(&self, playlist_id: &str, user_id: usize) -> UserResult<Playlist> {
        self.user_store
            .get_playlist(playlist_id, user_id)?
            .ok_or(UserError::PlaylistNotFound)
    }

    pub fn get_user_playlists(&self, user_id: usize) -> UserResult<Vec<Playlist>> {
        Ok(self.user_store.get_user_playlists(user_id)?)
    }

    pub fn update_playlist(
        &self,
        playlist_id: &str,
        user_id: usize,
        name: Option<&str>,
        tracks: Option<Vec<Track>>,
    ) -> UserResult<Playlist> {
        if let Some(name) = name {
            validate_playlist_name(name)?;
        }
        if let Some(tracks) = &tracks {
            validate_tracks(tracks)?;
        }
        let updated = self.user_store.update_playlist(
            playlist_id,
            user_id,
            name.map(str::trim),
            tracks.as_deref(),
        )?;
        if !updated {
            return Err(UserError::PlaylistNotFound);
        }
        self.get_playlist(playlist_id, user_id)
    }

    pub fn add_playlist_tracks(
        &self,
        playlist_id: &str,
        user_id: usize,
        tracks: Vec<Track>,
    ) -> UserResult<Playlist> {
        let playlist = self.get_playlist(playlist_id, user_id)?;
        let mut new_tracks = playlist.tracks;
        new_tracks.extend(tracks);
        self.update_playlist(playlist_id, user_id, None, Some(new_tracks))
    }

    pub fn remove_playlist_tracks(
        &self,
        playlist_id: &str,
        user_id: usize,
        positions: &[usize],
    ) -> UserResult<Playlist> {
        let playlist = self.get_playlist(playlist_id, user_id)?;
        let new_tracks: Vec<Track> = playlist
            .tracks
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !positions.contains(i))
            .map(|(_, track)| track)
            .collect();
        self.update_playlist(playlist_id, user_id, None, Some(new_tracks))
    }

    pub fn delete_playlist(&self, playlist_id: &str, user_id: usize) -> UserResult<()> {
        if !self.user_store.delete_playlist(playlist_id, user_id)? {
            return Err(UserError::PlaylistNotFound);
        }
        Ok(())
    }

    pub fn record_play(&self, user_id: usize, track: &Track) -> anyhow::Result<()> {
        self.user_store
            .append_history(user_id, track, now_millis())
            .with_context(|| format!("Could not record play of {} for {}", track.id, user_id))
    }

    pub fn get_history(&self, user_id: usize, limit: usize) -> anyhow::Result<Vec<HistoryEntry>> {
        self.user_store.get_history(user_id, limit)
    }

    pub fn record_activity(
        &self,
        user_id: usize,
        kind: ActivityKind,
        subject_id: &str,
        detail: Option<&str>,
    ) -> anyhow::Result<()> {
        self.user_store
            .record_activity(user_id, kind, subject_id, detail)
    }

    pub fn get_activities(
        &self,
        user_id: usize,
        limit: usize,
    ) -> anyhow::Result<Vec<ActivityEntry>> {
        self.user_store.get_activities(user_id, limit)
    }

    /// Drops history older than `retention_days` and tokens idle for as long.
    /// Returns the number of history entries removed.
    pub fn prune(&self, retention_days: u64) -> anyhow::Result<usize> {
        let cutoff = now_millis() - retention_days as i64 * MILLIS_PER_DAY;
        let history = self.user_store.prune_history(cutoff)?;
        let tokens = self.user_store.prune_unused_auth_tokens(retention_days)?;
        info!(
            "Pruned {} history entries and {} idle auth tokens",
            history, tokens
        );
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::SqliteUserStore;
    use tempfile::TempDir;

    fn manager(require_approval: bool) -> (UserManager, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteUserStore::new(dir.path().join("user.db")).unwrap();
        (UserManager::new(Box::new(store), require_approval), dir)
    }

    fn track(id: &str) -> Track {
        Track::new(id, "A song", "A channel", None)
    }

    fn actor_for(user: &UserRecord) -> Actor {
        Actor::new(user.id, user.role, user.approved)
    }

    #[test]
    fn registration_respects_approval_setting() {
        let (manager, _dir) = manager(true);
        let user = manager.register("newcomer", "longenough").unwrap();
        assert!(!user.approved);
        assert_eq!(user.role, UserRole::User);

        let (manager, _dir) = self::manager(false);
        let user = manager.register("newcomer", "longenough").unwrap();
        assert!(user.approved);
    }

    #[test]
    fn registration_validates_input() {
        let (manager, _dir) = manager(false);
        assert!(matches!(
            manager.register("no", "longenough"),
            Err(UserError::Validation(UserValidationError::InvalidHandle))
        ));
        assert!(matches!(
            manager.register("someone", "short"),
            Err(UserError::WeakPassword)
        ));
        manager.register("someone", "longenough").unwrap();
        assert!(matches!(
            manager.register("someone", "longenough"),
            Err(UserError::HandleTaken(_))
        ));
    }

    #[test]
    fn login_issues_tokens_and_logout_revokes_them() {
        let (manager, _dir) = manager(false);
        let user = manager.register("listener", "password1").unwrap();

        assert!(matches!(
            manager.login("listener", "wrong-password"),
            Err(UserError::InvalidCredentials)
        ));
        assert!(matches!(
            manager.login("nobody", "password1"),
            Err(UserError::InvalidCredentials)
        ));

        let (logged_in, token) = manager.login("listener", "password1").unwrap();
        assert_eq!(logged_in.id, user.id);
        assert!(manager.get_auth_token(&token.value).unwrap().is_some());

        assert!(manager.logout(user.id + 1, &token.value).is_err());
        manager.logout(user.id, &token.value).unwrap();
        assert!(manager.get_auth_token(&token.value).unwrap().is_none());
    }

    #[test]
    fn change_user_goes_through_policy_and_logs_activity() {
        let (manager, _dir) = manager(true);
        let owner_id = manager.add_user("boss", UserRole::Owner, true).unwrap();
        let admin_id = manager.add_user("admin", UserRole::Admin, true).unwrap();
        let user = manager.register("member", "password1").unwrap();

        let owner = actor_for(&manager.get_user(owner_id).unwrap().unwrap());
        let admin = actor_for(&manager.get_user(admin_id).unwrap().unwrap());

        let approved = manager
            .change_user(&admin, user.id, UserChange::SetApproval(true))
            .unwrap();
        assert!(approved.approved);

        assert!(matches!(
            manager.change_user(&admin, user.id, UserChange::SetRole(UserRole::Owner)),
            Err(UserError::Denied(PolicyDenial::OwnerGrantRequiresOwner))
        ));
        assert!(matches!(
            manager.change_user(&admin, owner_id, UserChange::SetApproval(false)),
            Err(UserError::Denied(PolicyDenial::OwnerImmutable))
        ));

        let promoted = manager
            .change_user(&owner, user.id, UserChange::SetRole(UserRole::Admin))
            .unwrap();
        assert_eq!(promoted.role, UserRole::Admin);

        let activities = manager.get_activities(user.id, 10).unwrap();
        assert_eq!(activities.len(), 2);
        assert_eq!(activities[0].kind, ActivityKind::RoleChanged);
        assert_eq!(activities[0].detail.as_deref(), Some("admin"));
        assert_eq!(activities[1].kind, ActivityKind::ApprovalChanged);

        assert!(matches!(
            manager.change_user(&owner, 999, UserChange::SetApproval(true)),
            Err(UserError::UserNotFound)
        ));
    }

    #[test]
    fn force_change_can_create_owners() {
        let (manager, _dir) = manager(true);
        manager.add_user("founder", UserRole::User, false).unwrap();
        let founder = manager
            .force_change_user("founder", UserChange::SetRole(UserRole::Owner))
            .unwrap();
        assert_eq!(founder.role, UserRole::Owner);

        let activities = manager.get_activities(founder.id, 10).unwrap();
        let role_change = activities
            .iter()
            .find(|a| a.kind == ActivityKind::RoleChanged)
            .unwrap();
        assert_eq!(role_change.subject_id, CLI_CHANGE_SUBJECT);
    }

    #[test]
    fn playlist_size_is_capped() {
        let (manager, _dir) = manager(false);
        let user = manager.register("collector", "password1").unwrap();

        let tracks: Vec<Track> = (0..MAX_PLAYLIST_SIZE)
            .map(|i| track(&format!("{:011}", i)))
            .collect();
        let playlist = manager
            .create_playlist(user.id, "Everything", tracks)
            .unwrap();
        assert_eq!(playlist.tracks.len(), MAX_PLAYLIST_SIZE);

        assert!(matches!(
            manager.add_playlist_tracks(&playlist.id, user.id, vec![track("zzzzzzzzzzz")]),
            Err(UserError::PlaylistFull(301))
        ));
    }

    #[test]
    fn playlist_add_remove_and_ownership() {
        let (manager, _dir) = manager(false);
        let user = manager.register("collector", "password1").unwrap();
        let other = manager.register("intruder", "password1").unwrap();

        let playlist = manager
            .create_playlist(user.id, " Chill ", vec![track("aaaaaaaaaaa")])
            .unwrap();
        assert_eq!(playlist.name, "Chill");

        let playlist = manager
            .add_playlist_tracks(
                &playlist.id,
                user.id,
                vec![track("bbbbbbbbbbb"), track("ccccccccccc")],
            )
            .unwrap();
        assert_eq!(playlist.tracks.len(), 3);

        let playlist = manager
            .remove_playlist_tracks(&playlist.id, user.id, &[0, 2])
            .unwrap();
        assert_eq!(playlist.tracks, vec![track("bbbbbbbbbbb")]);

        assert!(matches!(
            manager.add_playlist_tracks(&playlist.id, other.id, vec![track("ddddddddddd")]),
            Err(UserError::PlaylistNotFound)
        ));
        assert!(matches!(
            manager.add_playlist_tracks(&playlist.id, user.id, vec![track("bad id")]),
            Err(UserError::InvalidTrack(_))
        ));

        let activities = manager.get_activities(user.id, 10).unwrap();
        assert_eq!(activities[0].kind, ActivityKind::PlaylistCreated);
        assert_eq!(activities[0].subject_id, playlist.id);

        manager.delete_playlist(&playlist.id, user.id).unwrap();
        assert!(matches!(
            manager.delete_playlist(&playlist.id, user.id),
            Err(UserError::PlaylistNotFound)
        ));
    }

    #[test]
    fn history_and_pruning() {
        let (manager, _dir) = manager(false);
        let user = manager.register("listener", "password1").unwrap();
        manager.record_play(user.id, &track("aaaaaaaaaaa")).unwrap();
        manager.record_play(user.id, &track("bbbbbbbbbbb")).unwrap();

        let history = manager.get_history(user.id, 10).unwrap();
        assert_eq!(history.len(), 2);

        assert_eq!(manager.prune(1).unwrap(), 0);
        assert_eq!(manager.get_history(user.id, 10).unwrap().len(), 2);
    }

    #[test]
    fn listing_users_requires_manage_users() {
        let (manager, _dir) = manager(false);
        let member = manager.register("member", "password1").unwrap();
        let admin_id = manager.add_user("admin", UserRole::Admin, true).unwrap();
        let admin = actor_for(&manager.get_user(admin_id).unwrap().unwrap());

        assert!(matches!(
            manager.get_all_users(&actor_for(&member)),
            Err(UserError::Denied(_))
        ));
        assert_eq!(manager.get_all_users(&admin).unwrap().len(), 2);
    }
}
