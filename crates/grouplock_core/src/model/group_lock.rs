//! Group lock record.
//!
//! # Responsibility
//! - Carry the four business fields of one registry record.
//!
//! # Invariants
//! - `group_id` is unique across the registry.
//! - `group_name`, when set, is unique across the registry and frozen after
//!   the record is first inserted.
//! - `release_time` is informational; nothing compares it against "now".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Business key identifying a lock group.
pub type GroupId = i64;

/// Caller-defined request type code. Stored verbatim.
pub type RequestType = i64;

/// Snapshot of one group lock record.
///
/// Owned copy returned by the registry; mutating it has no effect on the
/// stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupLock {
    pub group_id: GroupId,
    /// Optional human-readable name. Multiple records may leave it unset.
    pub group_name: Option<String>,
    pub request_type: RequestType,
    /// Scheduled release instant, interpreted by whoever reads the record.
    pub release_time: DateTime<Utc>,
}

impl GroupLock {
    pub fn new(
        group_id: GroupId,
        group_name: Option<impl Into<String>>,
        request_type: RequestType,
        release_time: DateTime<Utc>,
    ) -> Self {
        Self {
            group_id,
            group_name: group_name.map(Into::into),
            request_type,
            release_time,
        }
    }

    /// Returns whether `release_time` is at or before `now`.
    ///
    /// Purely a reading helper; the registry never acts on it.
    pub fn is_released_at(&self, now: DateTime<Utc>) -> bool {
        self.release_time <= now
    }
}
