use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    AccessCatalog,
    OwnPlaylists,
    SocialInteract,
    DownloadAudio,
    ModerateContent,
    ManageUsers,
}

const USER_PERMISSIONS: &[Permission] = &[
    Permission::AccessCatalog,
    Permission::OwnPlaylists,
    Permission::SocialInteract,
    Permission::DownloadAudio,
];
const MODERATOR_PERMISSIONS: &[Permission] = &[
    Permission::AccessCatalog,
    Permission::OwnPlaylists,
    Permission::SocialInteract,
    Permission::DownloadAudio,
    Permission::ModerateContent,
];
const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::AccessCatalog,
    Permission::OwnPlaylists,
    Permission::SocialInteract,
    Permission::DownloadAudio,
    Permission::ModerateContent,
    Permission::ManageUsers,
];

/// Role tiers, ordered by rank: `User < Moderator < Admin < Owner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Moderator,
    Admin,
    Owner,
}

impl UserRole {
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            UserRole::User => USER_PERMISSIONS,
            UserRole::Moderator => MODERATOR_PERMISSIONS,
            // Owners hold every permission admins do; what sets them apart lives in the policy.
            UserRole::Admin | UserRole::Owner => ADMIN_PERMISSIONS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Moderator => "moderator",
            UserRole::Admin => "admin",
            UserRole::Owner => "owner",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(UserRole::User),
            "moderator" => Some(UserRole::Moderator),
            "admin" => Some(UserRole::Admin),
            "owner" => Some(UserRole::Owner),
            _ => None,
        }
    }
}
