//! MinstrelMuse server library
//!
//! This library exposes the internal modules for testing and reuse by the binaries.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod conversion;
pub mod offline;
pub mod playback;
pub mod server;
pub mod social;
pub mod sqlite_persistence;
pub mod user;
pub mod video;

// Re-export commonly used types for convenience
pub use server::{run_server, RequestsLoggingLevel};
pub use social::SqliteSocialStore;
pub use user::{SqliteUserStore, UserManager, UserRole};
