//! Shared constants for end-to-end tests
//!
//! When seeded users or sample data change, update only this file.

#![allow(dead_code)]

// ============================================================================
// Test User Credentials
// ============================================================================

/// Regular approved user
pub const TEST_USER: &str = "testuser";
pub const TEST_PASS: &str = "testpass123";

/// Second regular user, used for ownership checks
pub const OTHER_USER: &str = "otheruser";
pub const OTHER_PASS: &str = "otherpass123";

/// Moderator
pub const MODERATOR_USER: &str = "moderator";
pub const MODERATOR_PASS: &str = "moderatorpass123";

/// Admin
pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASS: &str = "adminpass123";

/// Owner
pub const OWNER_USER: &str = "owner";
pub const OWNER_PASS: &str = "ownerpass123";

/// Registered account still waiting for approval
pub const PENDING_USER: &str = "pendinguser";
pub const PENDING_PASS: &str = "pendingpass123";

// ============================================================================
// Sample Tracks
// ============================================================================

/// Valid video ids, all present in the offline library
pub const TRACK_1_ID: &str = "dQw4w9WgXcQ";
pub const TRACK_1_TITLE: &str = "Never Gonna Give You Up";
pub const TRACK_2_ID: &str = "kJQP7kiw5Fk";
pub const TRACK_2_TITLE: &str = "Despacito";
pub const TRACK_3_ID: &str = "9bZkp7q19f0";
pub const TRACK_3_TITLE: &str = "Gangnam Style";

/// Number of tracks in the built-in offline library
pub const OFFLINE_LIBRARY_SIZE: usize = 8;

// ============================================================================
// Timeouts
// ============================================================================

pub const REQUEST_TIMEOUT_SECS: u64 = 10;
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;
pub const WS_MESSAGE_TIMEOUT_MS: u64 = 2000;
