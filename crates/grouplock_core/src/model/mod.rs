//! Domain model for group lock metadata.
//!
//! # Responsibility
//! - Define the caller-facing record returned by registry queries.
//!
//! # Invariants
//! - Values are detached snapshots; they never alias registry-held state.
//! - The storage surrogate key is not part of any public model type.

pub mod group_lock;
