//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the group lock registry contract.
//! - Isolate SQLite query details and change tracking from callers.
//!
//! # Invariants
//! - Registry APIs return detached `GroupLock` values, never tracked state.
//! - Uniqueness rejections surface as `RepoError::UniqueViolation`, distinct
//!   from transport errors.

pub mod group_lock_repo;
pub(crate) mod session;
