//! Test fixture creation
//!
//! Creates temporary databases seeded with users of every role.

use super::constants::*;
use anyhow::Result;
use minstrelmuse_server::user::{SqliteUserStore, UserManager, UserRole};
use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;

/// Creates a temporary db directory with a seeded `user.db`.
///
/// Seeded accounts: one per role plus a second regular user and a pending one.
pub fn create_test_db_with_users() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("user.db");
    let user_manager = UserManager::new(Box::new(SqliteUserStore::new(&db_path)?), true);

    let users = [
        (TEST_USER, TEST_PASS, UserRole::User, true),
        (OTHER_USER, OTHER_PASS, UserRole::User, true),
        (MODERATOR_USER, MODERATOR_PASS, UserRole::Moderator, true),
        (ADMIN_USER, ADMIN_PASS, UserRole::Admin, true),
        (OWNER_USER, OWNER_PASS, UserRole::Owner, true),
        (PENDING_USER, PENDING_PASS, UserRole::User, false),
    ];
    for (handle, password, role, approved) in users {
        user_manager.add_user(handle, role, approved)?;
        user_manager.set_password(handle, password)?;
    }

    Ok((dir, db_path))
}

/// JSON body for a track reference.
pub fn track_json(id: &str, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "channel": "Test Channel",
    })
}
