//! Group lock registry contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide upsert/get/list/remove over the `group_locks` table.
//! - Stage mutations in a connection-scoped `Session` and commit them
//!   synchronously in one transaction.
//! - Surface store-level uniqueness rejections as `RepoError::UniqueViolation`.
//!
//! # Invariants
//! - Records are looked up by `group_id` only.
//! - `group_name` is written on insert and never updated afterwards.
//! - `internal_id` never appears in a returned value.
//! - A failed commit leaves its staged changes in the session; only
//!   `reset_session()` discards them.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::group_lock::{GroupId, GroupLock, RequestType};
use crate::repo::session::{InternalId, Session};
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const GROUP_LOCK_SELECT_SQL: &str = "SELECT
    internal_id,
    group_id,
    group_name,
    request_type,
    release_time
FROM group_locks";

const GROUP_LOCK_COLUMNS: [&str; 5] = [
    "internal_id",
    "group_id",
    "group_name",
    "request_type",
    "release_time",
];

const UNIQUE_FAILED_PREFIX: &str = "UNIQUE constraint failed: ";

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from group lock registry operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Store rejected a duplicate `group_id` or non-null `group_name`.
    UniqueViolation {
        /// Offending column as reported by SQLite, when it could be parsed.
        column: Option<String>,
        message: String,
    },
    /// A staged update or delete no longer matches a stored row.
    StaleTrackedState { group_id: GroupId },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
}

impl RepoError {
    /// Returns whether this error is a uniqueness rejection from the store.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Db(_) => "db_error",
            Self::UniqueViolation { .. } => "unique_violation",
            Self::StaleTrackedState { .. } => "stale_tracked_state",
            Self::UninitializedConnection { .. } => "uninitialized_connection",
            Self::MissingRequiredTable(_) => "missing_table",
            Self::MissingRequiredColumn { .. } => "missing_column",
            Self::InvalidData(_) => "invalid_data",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UniqueViolation { message, .. } => {
                write!(f, "group lock uniqueness violated: {message}")
            }
            Self::StaleTrackedState { group_id } => write!(
                f,
                "tracked group lock {group_id} no longer matches stored state; reset the session"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "group lock registry requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "group lock registry requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "group lock registry requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted group lock data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::from(err),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match unique_violation_message(&value) {
            Some(message) => Self::UniqueViolation {
                column: parse_unique_column(&message),
                message,
            },
            None => Self::Db(DbError::Sqlite(value)),
        }
    }
}

/// Registry interface for group lock metadata.
pub trait GroupLockRepository {
    /// Inserts a record for `group_id`, or updates its request type and
    /// release time when one exists. The stored group name of an existing
    /// record is never changed.
    fn upsert(
        &mut self,
        group_id: GroupId,
        group_name: Option<&str>,
        request_type: RequestType,
        release_time: DateTime<Utc>,
    ) -> RepoResult<GroupLock>;
    /// Deletes the record for `group_id`; absent ids are a no-op.
    fn remove(&mut self, group_id: GroupId) -> RepoResult<()>;
    /// Returns a detached copy of the record for `group_id`.
    fn get(&self, group_id: GroupId) -> RepoResult<Option<GroupLock>>;
    /// Returns detached copies of all records in unspecified order.
    fn list(&self) -> RepoResult<Vec<GroupLock>>;
    /// Discards tracked and staged state without touching the store.
    fn reset_session(&mut self);
}

/// SQLite-backed group lock registry owning one connection.
pub struct SqliteGroupLockRegistry {
    conn: Connection,
    session: Session,
}

impl SqliteGroupLockRegistry {
    /// Constructs a registry from a migrated/ready connection.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_registry_connection_ready(&conn)?;
        Ok(Self {
            conn,
            session: Session::new(),
        })
    }

    /// Number of staged changes left behind by failed commits.
    pub fn pending_changes(&self) -> usize {
        self.session.pending_changes()
    }

    /// Releases the owned connection back to the caller.
    pub fn into_connection(self) -> Connection {
        self.conn
    }

    fn find_row(&self, group_id: GroupId) -> RepoResult<Option<(InternalId, GroupLock)>> {
        self.conn
            .query_row(
                &format!("{GROUP_LOCK_SELECT_SQL} WHERE group_id = ?1;"),
                [group_id],
                |row| Ok(parse_group_lock_row(row)),
            )
            .optional()?
            .transpose()
    }

    /// Writes every staged change in one immediate transaction.
    fn save_changes(&mut self) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        for (internal_id, record) in self.session.staged_deletes() {
            let changed = tx.execute(
                "DELETE FROM group_locks WHERE internal_id = ?1;",
                [internal_id],
            )?;
            if changed == 0 {
                return Err(RepoError::StaleTrackedState {
                    group_id: record.group_id,
                });
            }
        }

        for (internal_id, record) in self.session.staged_updates() {
            let changed = tx.execute(
                "UPDATE group_locks
                 SET
                    request_type = ?2,
                    release_time = ?3
                 WHERE internal_id = ?1;",
                params![internal_id, record.request_type, record.release_time],
            )?;
            if changed == 0 {
                return Err(RepoError::StaleTrackedState {
                    group_id: record.group_id,
                });
            }
        }

        for record in self.session.staged_inserts() {
            tx.execute(
                "INSERT INTO group_locks (
                    group_id,
                    group_name,
                    request_type,
                    release_time
                ) VALUES (?1, ?2, ?3, ?4);",
                params![
                    record.group_id,
                    record.group_name.as_deref(),
                    record.request_type,
                    record.release_time,
                ],
            )?;
        }

        tx.commit()?;
        self.session.accept_changes();
        Ok(())
    }

    fn upsert_inner(
        &mut self,
        group_id: GroupId,
        group_name: Option<&str>,
        request_type: RequestType,
        release_time: DateTime<Utc>,
    ) -> RepoResult<(GroupLock, &'static str)> {
        let (record, action) = match self.find_row(group_id)? {
            Some((internal_id, fresh)) => {
                let record = self
                    .session
                    .stage_update(internal_id, fresh, request_type, release_time);
                (record, "update")
            }
            None => {
                let record = GroupLock::new(group_id, group_name, request_type, release_time);
                self.session.stage_insert(record.clone());
                (record, "insert")
            }
        };

        self.save_changes()?;
        Ok((record, action))
    }

    fn remove_inner(&mut self, group_id: GroupId) -> RepoResult<bool> {
        let Some((internal_id, fresh)) = self.find_row(group_id)? else {
            return Ok(false);
        };

        self.session.stage_delete(internal_id, fresh);
        self.save_changes()?;
        Ok(true)
    }
}

impl GroupLockRepository for SqliteGroupLockRegistry {
    fn upsert(
        &mut self,
        group_id: GroupId,
        group_name: Option<&str>,
        request_type: RequestType,
        release_time: DateTime<Utc>,
    ) -> RepoResult<GroupLock> {
        debug!("event=group_lock_upsert module=repo status=start group_id={group_id}");

        match self.upsert_inner(group_id, group_name, request_type, release_time) {
            Ok((record, action)) => {
                info!(
                    "event=group_lock_upsert module=repo status=ok group_id={group_id} action={action}"
                );
                Ok(record)
            }
            Err(err) => {
                error!(
                    "event=group_lock_upsert module=repo status=error group_id={} error_code={} pending_changes={} error={}",
                    group_id,
                    err.code(),
                    self.session.pending_changes(),
                    err
                );
                Err(err)
            }
        }
    }

    fn remove(&mut self, group_id: GroupId) -> RepoResult<()> {
        debug!("event=group_lock_remove module=repo status=start group_id={group_id}");

        match self.remove_inner(group_id) {
            Ok(existed) => {
                info!(
                    "event=group_lock_remove module=repo status=ok group_id={group_id} existed={existed}"
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=group_lock_remove module=repo status=error group_id={} error_code={} pending_changes={} error={}",
                    group_id,
                    err.code(),
                    self.session.pending_changes(),
                    err
                );
                Err(err)
            }
        }
    }

    fn get(&self, group_id: GroupId) -> RepoResult<Option<GroupLock>> {
        Ok(self
            .find_row(group_id)?
            .map(|(internal_id, fresh)| self.session.resolve(internal_id, fresh)))
    }

    fn list(&self) -> RepoResult<Vec<GroupLock>> {
        let mut stmt = self.conn.prepare(&format!("{GROUP_LOCK_SELECT_SQL};"))?;
        let mut rows = stmt.query([])?;
        let mut locks = Vec::new();

        while let Some(row) = rows.next()? {
            let (internal_id, fresh) = parse_group_lock_row(row)?;
            locks.push(self.session.resolve(internal_id, fresh));
        }

        Ok(locks)
    }

    fn reset_session(&mut self) {
        let discarded = self.session.pending_changes();
        self.session.clear();
        info!("event=group_lock_reset module=repo status=ok discarded_changes={discarded}");
    }
}

fn parse_group_lock_row(row: &Row<'_>) -> RepoResult<(InternalId, GroupLock)> {
    let internal_id: InternalId = row.get("internal_id")?;
    let release_time = row
        .get::<_, DateTime<Utc>>("release_time")
        .map_err(|err| match err {
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..) => RepoError::InvalidData(format!(
                "invalid release_time in group_locks row {internal_id}: {err}"
            )),
            other => RepoError::from(other),
        })?;

    let record = GroupLock {
        group_id: row.get("group_id")?,
        group_name: row.get("group_name")?,
        request_type: row.get("request_type")?,
        release_time,
    };
    Ok((internal_id, record))
}

fn unique_violation_message(err: &rusqlite::Error) -> Option<String> {
    match err {
        rusqlite::Error::SqliteFailure(failure, message)
            if failure.code == ErrorCode::ConstraintViolation
                && (failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY) =>
        {
            Some(
                message
                    .clone()
                    .unwrap_or_else(|| "UNIQUE constraint failed".to_string()),
            )
        }
        _ => None,
    }
}

/// Extracts `group_name` from `UNIQUE constraint failed: group_locks.group_name`.
fn parse_unique_column(message: &str) -> Option<String> {
    let columns = message.strip_prefix(UNIQUE_FAILED_PREFIX)?;
    let first = columns.split(',').next()?.trim();
    let column = first.rsplit('.').next()?;
    if column.is_empty() {
        None
    } else {
        Some(column.to_string())
    }
}

fn ensure_registry_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "group_locks")? {
        return Err(RepoError::MissingRequiredTable("group_locks"));
    }

    for column in GROUP_LOCK_COLUMNS {
        if !table_has_column(conn, "group_locks", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "group_locks",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
