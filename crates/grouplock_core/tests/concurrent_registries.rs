use chrono::{DateTime, TimeZone, Utc};
use grouplock_core::db::open_db;
use grouplock_core::{GroupLockRepository, RepoError, SqliteGroupLockRegistry};
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 10, 12, 32, 11).unwrap()
}

fn open_registry(path: &Path) -> SqliteGroupLockRegistry {
    SqliteGroupLockRegistry::try_new(open_db(path).unwrap()).unwrap()
}

#[test]
fn registries_on_one_file_see_each_others_commits() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grouplock.db");
    let mut first = open_registry(&path);
    let mut second = open_registry(&path);

    first.upsert(1, Some("build"), 1, t0()).unwrap();
    second.upsert(1, Some("other"), 4, t0()).unwrap();

    let seen_by_first = first.get(1).unwrap().unwrap();
    assert_eq!(seen_by_first.group_name.as_deref(), Some("build"));
    assert_eq!(seen_by_first.request_type, 4);
}

#[test]
fn name_collision_across_registries_is_unique_violation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grouplock.db");
    let mut first = open_registry(&path);
    let mut second = open_registry(&path);

    first.upsert(1, Some("release"), 1, t0()).unwrap();
    let err = second.upsert(2, Some("release"), 1, t0()).unwrap_err();

    assert!(matches!(
        err,
        RepoError::UniqueViolation { ref column, .. } if column.as_deref() == Some("group_name")
    ));
    assert_eq!(first.list().unwrap().len(), 1);
}

#[test]
fn racing_registries_claiming_one_name_yield_exactly_one_winner() {
    const WORKERS: usize = 6;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grouplock.db");
    drop(open_db(&path).unwrap());

    let barrier = Arc::new(Barrier::new(WORKERS));
    let handles: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut registry = open_registry(&path);
                barrier.wait();
                registry.upsert(worker as i64 + 1, Some("contested"), 1, t0())
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    let winners = results.iter().filter(|result| result.is_ok()).count();
    let unique_losers = results
        .iter()
        .filter(|result| matches!(result, Err(err) if err.is_unique_violation()))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(unique_losers, WORKERS - 1);

    let registry = open_registry(&path);
    let stored = registry.list().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].group_name.as_deref(), Some("contested"));
}

#[test]
fn stale_insert_colliding_on_group_id_is_unique_violation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grouplock.db");
    let mut first = open_registry(&path);
    let mut second = open_registry(&path);

    first.upsert(1, Some("shared"), 1, t0()).unwrap();
    first.upsert(2, Some("shared"), 1, t0()).unwrap_err();
    assert_eq!(first.pending_changes(), 1);

    // Frees the name, then claims group 2 before the staged insert retries.
    second.remove(1).unwrap();
    second.upsert(2, None, 4, t0()).unwrap();

    let err = first.upsert(3, None, 1, t0()).unwrap_err();
    match err {
        RepoError::UniqueViolation { column, .. } => {
            assert_eq!(column.as_deref(), Some("group_id"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let stored = second.get(2).unwrap().unwrap();
    assert_eq!(stored.group_name, None);
    assert_eq!(stored.request_type, 4);
    assert!(second.get(3).unwrap().is_none());
}
