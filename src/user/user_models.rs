//! User data models

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::permissions::UserRole;
use crate::catalog::Track;

lazy_static! {
    static ref HANDLE_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").unwrap();
}

pub const MAX_DISPLAY_NAME_LEN: usize = 64;
pub const MAX_BIO_LEN: usize = 500;
pub const MAX_PLAYLIST_NAME_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    #[error("Handle must be 3 to 32 characters of letters, digits, '_', '.' or '-'")]
    InvalidHandle,
    #[error("Display name must be at most {MAX_DISPLAY_NAME_LEN} characters")]
    DisplayNameTooLong,
    #[error("Bio must be at most {MAX_BIO_LEN} characters")]
    BioTooLong,
    #[error("Avatar URL must be an http(s) URL")]
    InvalidAvatarUrl,
    #[error("Playlist name must be between 1 and {MAX_PLAYLIST_NAME_LEN} characters")]
    InvalidPlaylistName,
}

pub fn validate_handle(handle: &str) -> Result<(), UserValidationError> {
    if HANDLE_REGEX.is_match(handle) {
        Ok(())
    } else {
        Err(UserValidationError::InvalidHandle)
    }
}

pub fn validate_playlist_name(name: &str) -> Result<(), UserValidationError> {
    let len = name.trim().chars().count();
    if len == 0 || len > MAX_PLAYLIST_NAME_LEN {
        return Err(UserValidationError::InvalidPlaylistName);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: usize,
    pub handle: String,
    pub display_name: String,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub role: UserRole,
    pub approved: bool,
    pub created: i64,
}

/// What other users get to see.
#[derive(Debug, Clone, Serialize)]
pub struct PublicProfile {
    pub id: usize,
    pub handle: String,
    pub display_name: String,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub role: UserRole,
}

impl From<&UserRecord> for PublicProfile {
    fn from(user: &UserRecord) -> Self {
        PublicProfile {
            id: user.id,
            handle: user.handle.clone(),
            display_name: user.display_name.clone(),
            bio: user.bio.clone(),
            avatar_url: user.avatar_url.clone(),
            role: user.role,
        }
    }
}

/// Partial profile edit. An empty `avatar_url` clears the avatar.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<(), UserValidationError> {
        if let Some(name) = &self.display_name {
            if name.chars().count() > MAX_DISPLAY_NAME_LEN {
                return Err(UserValidationError::DisplayNameTooLong);
            }
        }
        if let Some(bio) = &self.bio {
            if bio.chars().count() > MAX_BIO_LEN {
                return Err(UserValidationError::BioTooLong);
            }
        }
        if let Some(url) = &self.avatar_url {
            if !url.is_empty() && !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(UserValidationError::InvalidAvatarUrl);
            }
        }
        Ok(())
    }

    pub fn apply_to(&self, user: &mut UserRecord) {
        if let Some(name) = &self.display_name {
            user.display_name = name.trim().to_string();
        }
        if let Some(bio) = &self.bio {
            user.bio = bio.clone();
        }
        if let Some(url) = &self.avatar_url {
            user.avatar_url = if url.is_empty() {
                None
            } else {
                Some(url.clone())
            };
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Playlist {
    pub id: String,
    pub user_id: usize,
    pub name: String,
    pub created: i64,
    pub tracks: Vec<Track>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub track: Track,
    pub played_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    PostCreated,
    CommentAdded,
    ReactionAdded,
    PlaylistCreated,
    RoleChanged,
    ApprovalChanged,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::PostCreated => "post_created",
            ActivityKind::CommentAdded => "comment_added",
            ActivityKind::ReactionAdded => "reaction_added",
            ActivityKind::PlaylistCreated => "playlist_created",
            ActivityKind::RoleChanged => "role_changed",
            ActivityKind::ApprovalChanged => "approval_changed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "post_created" => Some(ActivityKind::PostCreated),
            "comment_added" => Some(ActivityKind::CommentAdded),
            "reaction_added" => Some(ActivityKind::ReactionAdded),
            "playlist_created" => Some(ActivityKind::PlaylistCreated),
            "role_changed" => Some(ActivityKind::RoleChanged),
            "approval_changed" => Some(ActivityKind::ApprovalChanged),
            _ => None,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ActivityEntry {
    pub id: i64,
    pub user_id: usize,
    pub kind: ActivityKind,
    pub subject_id: String,
    pub detail: Option<String>,
    pub created: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserRecord {
        UserRecord {
            id: 1,
            handle: "someone".to_string(),
            display_name: "Someone".to_string(),
            bio: String::new(),
            avatar_url: Some("https://img.example/a.png".to_string()),
            role: UserRole::User,
            approved: true,
            created: 0,
        }
    }

    #[test]
    fn handle_validation() {
        assert!(validate_handle("abc").is_ok());
        assert!(validate_handle("dj.mister-x_99").is_ok());
        assert!(validate_handle("ab").is_err());
        assert!(validate_handle(&"a".repeat(33)).is_err());
        assert!(validate_handle("white space").is_err());
        assert!(validate_handle("emoji🎵").is_err());
    }

    #[test]
    fn profile_update_rejects_non_http_avatar() {
        let update = ProfileUpdate {
            avatar_url: Some("javascript:alert(1)".to_string()),
            ..Default::default()
        };
        assert_eq!(
            update.validate(),
            Err(UserValidationError::InvalidAvatarUrl)
        );
    }

    #[test]
    fn profile_update_rejects_long_bio() {
        let update = ProfileUpdate {
            bio: Some("x".repeat(MAX_BIO_LEN + 1)),
            ..Default::default()
        };
        assert_eq!(update.validate(), Err(UserValidationError::BioTooLong));
    }

    #[test]
    fn empty_avatar_clears_it() {
        let mut user = user();
        ProfileUpdate {
            display_name: Some("  New Name ".to_string()),
            avatar_url: Some(String::new()),
            ..Default::default()
        }
        .apply_to(&mut user);
        assert_eq!(user.display_name, "New Name");
        assert_eq!(user.avatar_url, None);
        assert_eq!(user.bio, "");
    }

    #[test]
    fn activity_kind_names_roundtrip() {
        for kind in [
            ActivityKind::PostCreated,
            ActivityKind::CommentAdded,
            ActivityKind::ReactionAdded,
            ActivityKind::PlaylistCreated,
            ActivityKind::RoleChanged,
            ActivityKind::ApprovalChanged,
        ] {
            assert_eq!(ActivityKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(ActivityKind::from_str("liked"), None);
    }

    #[test]
    fn playlist_name_validation() {
        assert!(validate_playlist_name("Road trip").is_ok());
        assert!(validate_playlist_name("   ").is_err());
        assert!(validate_playlist_name(&"n".repeat(MAX_PLAYLIST_NAME_LEN + 1)).is_err());
    }
}
