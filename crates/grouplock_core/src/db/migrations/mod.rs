//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply pending migrations atomically.
//! - Revert applied migrations down to a target version atomically.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - The `group_name` index is created before the `group_id` index.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    up: &'static str,
    down: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "init",
        up: include_str!("0001_init.sql"),
        down: include_str!("0001_init.down.sql"),
    },
    Migration {
        version: 2,
        name: "unique_group_name",
        up: include_str!("0002_unique_group_name.sql"),
        down: include_str!("0002_unique_group_name.down.sql"),
    },
    Migration {
        version: 3,
        name: "unique_group_id",
        up: include_str!("0003_unique_group_id.sql"),
        down: include_str!("0003_unique_group_id.down.sql"),
    },
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Returns the schema version currently recorded on the connection.
pub fn current_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Applies all pending migrations on the provided connection.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let current = current_version(conn)?;
    let latest = latest_version();

    if current > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }

    if current == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS {
        if migration.version <= current {
            continue;
        }

        tx.execute_batch(migration.up)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
        info!(
            "event=db_migrate module=db status=ok direction=up version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;

    Ok(())
}

/// Reverts applied migrations until the schema sits at `target_version`.
///
/// `target_version = 0` removes the registry table entirely.
///
/// # Errors
/// - `DbError::InvalidMigrationTarget` when `target_version` is above the
///   current schema version.
/// - `DbError::UnsupportedSchemaVersion` when the database is newer than
///   this binary, since the down scripts are unknown.
pub fn revert_migrations(conn: &mut Connection, target_version: u32) -> DbResult<()> {
    let current = current_version(conn)?;
    let latest = latest_version();

    if current > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }

    if target_version > current {
        return Err(DbError::InvalidMigrationTarget {
            target_version,
            current_version: current,
        });
    }

    if target_version == current {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS.iter().rev() {
        if migration.version > current || migration.version <= target_version {
            continue;
        }

        tx.execute_batch(migration.down)?;
        tx.execute_batch(&format!(
            "PRAGMA user_version = {};",
            migration.version - 1
        ))?;
        info!(
            "event=db_migrate module=db status=ok direction=down version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;

    Ok(())
}
