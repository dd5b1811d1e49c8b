//! Connection-scoped change tracker for the group lock registry.
//!
//! # Responsibility
//! - Hold entities staged by registry calls on one connection.
//! - Resolve freshly read rows against staged entities.
//! - Expose staged changes for commit and settle them once committed.
//!
//! # Invariants
//! - At most one tracked entry exists per internal id.
//! - Only staged entries are tracked; committed rows are never retained.
//! - Entries staged by a failed commit stay staged until `clear()`.
//! - Nothing here performs store I/O.

use crate::model::group_lock::{GroupLock, RequestType};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Store-assigned surrogate key. Never leaves the repository layer.
pub(crate) type InternalId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    Modified,
    Deleted,
}

#[derive(Debug, Clone)]
struct TrackedEntry {
    record: GroupLock,
    state: EntryState,
}

/// In-memory bookkeeping of changes staged through one registry.
///
/// Only staged entries are held; a successful commit empties the session.
#[derive(Debug, Default)]
pub(crate) struct Session {
    tracked: HashMap<InternalId, TrackedEntry>,
    added: Vec<GroupLock>,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Number of staged inserts, updates and deletes awaiting commit.
    pub(crate) fn pending_changes(&self) -> usize {
        self.tracked.len() + self.added.len()
    }

    /// Drops every staged entity.
    pub(crate) fn clear(&mut self) {
        self.tracked.clear();
        self.added.clear();
    }

    /// Returns the tracked view of a row read from the store.
    ///
    /// A staged entity keeps its in-memory values; otherwise `fresh` is
    /// returned as is.
    pub(crate) fn resolve(&self, internal_id: InternalId, fresh: GroupLock) -> GroupLock {
        match self.tracked.get(&internal_id) {
            Some(entry) => entry.record.clone(),
            None => fresh,
        }
    }

    /// Stages an in-place update of request type and release time.
    ///
    /// `fresh` seeds the entry when `internal_id` has nothing staged yet.
    /// The group name is never touched.
    pub(crate) fn stage_update(
        &mut self,
        internal_id: InternalId,
        fresh: GroupLock,
        request_type: RequestType,
        release_time: DateTime<Utc>,
    ) -> GroupLock {
        let entry = self.track(internal_id, fresh);
        entry.record.request_type = request_type;
        entry.record.release_time = release_time;
        entry.state = EntryState::Modified;
        entry.record.clone()
    }

    pub(crate) fn stage_insert(&mut self, record: GroupLock) {
        self.added.push(record);
    }

    pub(crate) fn stage_delete(&mut self, internal_id: InternalId, fresh: GroupLock) {
        self.track(internal_id, fresh).state = EntryState::Deleted;
    }

    pub(crate) fn staged_deletes(&self) -> impl Iterator<Item = (InternalId, &GroupLock)> + '_ {
        self.staged_with(EntryState::Deleted)
    }

    pub(crate) fn staged_updates(&self) -> impl Iterator<Item = (InternalId, &GroupLock)> + '_ {
        self.staged_with(EntryState::Modified)
    }

    pub(crate) fn staged_inserts(&self) -> &[GroupLock] {
        &self.added
    }

    /// Settles staged changes after a successful commit.
    ///
    /// Committed entities match the store, so nothing is kept for them.
    pub(crate) fn accept_changes(&mut self) {
        self.clear();
    }

    fn track(&mut self, internal_id: InternalId, fresh: GroupLock) -> &mut TrackedEntry {
        self.tracked
            .entry(internal_id)
            .or_insert_with(|| TrackedEntry {
                record: fresh,
                state: EntryState::Modified,
            })
    }

    fn staged_with(
        &self,
        state: EntryState,
    ) -> impl Iterator<Item = (InternalId, &GroupLock)> + '_ {
        self.tracked
            .iter()
            .filter(move |(_, entry)| entry.state == state)
            .map(|(internal_id, entry)| (*internal_id, &entry.record))
    }
}
