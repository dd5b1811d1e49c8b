//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the group lock registry.
//! - Apply and revert schema migrations in deterministic order.
//! - Resolve the default on-disk database location.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Registry code must not read/write lock records before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
mod path;

pub use open::{open_db, open_db_in_memory};
pub use path::{default_db_path, DB_FILE_NAME, DB_PATH_ENV};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Revert target is newer than the schema currently applied.
    InvalidMigrationTarget {
        target_version: u32,
        current_version: u32,
    },
    /// No per-user local data directory could be resolved from the environment.
    DataDirUnavailable,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::InvalidMigrationTarget {
                target_version,
                current_version,
            } => write!(
                f,
                "cannot revert to schema version {target_version}; current version is {current_version}"
            ),
            Self::DataDirUnavailable => {
                write!(f, "unable to resolve a local data directory for the database")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. }
            | Self::InvalidMigrationTarget { .. }
            | Self::DataDirUnavailable => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
