//! Core registry of group lock metadata.
//! Stores who holds which group, under which request type, until when; it
//! never blocks or expires anything itself.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::group_lock::{GroupId, GroupLock, RequestType};
pub use repo::group_lock_repo::{
    GroupLockRepository, RepoError, RepoResult, SqliteGroupLockRegistry,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
