//! Default database location resolution.
//!
//! The registry file lives in the per-user local data directory unless the
//! `GROUPLOCK_DB_PATH` environment variable points elsewhere.

use super::{DbError, DbResult};
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

/// File name used inside the local data directory.
pub const DB_FILE_NAME: &str = "grouplock.db";

/// Environment variable overriding the full database path.
pub const DB_PATH_ENV: &str = "GROUPLOCK_DB_PATH";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Platform {
    Windows,
    MacOs,
    Unix,
}

impl Platform {
    fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Unix
        }
    }
}

/// Resolves the database path used when the caller does not supply one.
///
/// - Windows: `%LOCALAPPDATA%\grouplock.db`
/// - macOS: `$HOME/Library/Application Support/grouplock.db`
/// - other: `$XDG_DATA_HOME/grouplock.db`, else `$HOME/.local/share/grouplock.db`
///
/// # Errors
/// - Returns `DbError::DataDirUnavailable` when neither the override nor a
///   platform data directory is available.
pub fn default_db_path() -> DbResult<PathBuf> {
    resolve_db_path(Platform::current(), |key| env::var_os(key))
}

fn resolve_db_path(
    platform: Platform,
    lookup: impl Fn(&str) -> Option<OsString>,
) -> DbResult<PathBuf> {
    let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());

    if let Some(path) = non_empty(DB_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }

    let home_join = |suffix: &str| non_empty("HOME").map(|home| PathBuf::from(home).join(suffix));
    let data_dir = match platform {
        Platform::Windows => non_empty("LOCALAPPDATA").map(PathBuf::from),
        Platform::MacOs => home_join("Library/Application Support"),
        Platform::Unix => non_empty("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| home_join(".local/share")),
    };

    data_dir
        .map(|dir| dir.join(DB_FILE_NAME))
        .ok_or(DbError::DataDirUnavailable)
}

#[cfg(test)]
mod tests {
    use super::{resolve_db_path, Platform, DB_FILE_NAME, DB_PATH_ENV};
    use crate::db::DbError;
    use std::collections::HashMap;
    use std::ffi::OsString;
    use std::path::PathBuf;

    fn lookup_from(
        pairs: &[(&'static str, &'static str)],
    ) -> impl Fn(&str) -> Option<OsString> {
        let vars: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |key| vars.get(key).map(OsString::from)
    }

    #[test]
    fn override_wins_over_platform_dirs() {
        for platform in [Platform::Windows, Platform::MacOs, Platform::Unix] {
            let lookup = lookup_from(&[
                (DB_PATH_ENV, "/srv/locks/custom.db"),
                ("XDG_DATA_HOME", "/xdg"),
                ("HOME", "/home/dev"),
                ("LOCALAPPDATA", "C:\\data"),
            ]);
            let path = resolve_db_path(platform, lookup).unwrap();
            assert_eq!(path, PathBuf::from("/srv/locks/custom.db"));
        }
    }

    #[test]
    fn empty_override_is_ignored() {
        let lookup = lookup_from(&[(DB_PATH_ENV, ""), ("XDG_DATA_HOME", "/xdg")]);
        let path = resolve_db_path(Platform::Unix, lookup).unwrap();
        assert_eq!(path, PathBuf::from("/xdg").join(DB_FILE_NAME));
    }

    #[test]
    fn windows_uses_local_app_data() {
        let lookup = lookup_from(&[("LOCALAPPDATA", "C:\\data"), ("HOME", "/home/dev")]);
        let path = resolve_db_path(Platform::Windows, lookup).unwrap();
        assert_eq!(path, PathBuf::from("C:\\data").join(DB_FILE_NAME));
    }

    #[test]
    fn macos_uses_application_support() {
        let lookup = lookup_from(&[("HOME", "/Users/dev"), ("XDG_DATA_HOME", "/xdg")]);
        let path = resolve_db_path(Platform::MacOs, lookup).unwrap();
        assert_eq!(
            path,
            PathBuf::from("/Users/dev/Library/Application Support").join(DB_FILE_NAME)
        );
    }

    #[test]
    fn unix_falls_back_to_home_local_share() {
        let lookup = lookup_from(&[("HOME", "/home/dev")]);
        let path = resolve_db_path(Platform::Unix, lookup).unwrap();
        assert_eq!(path, PathBuf::from("/home/dev/.local/share").join(DB_FILE_NAME));
    }

    #[test]
    fn missing_directories_are_reported() {
        for platform in [Platform::Windows, Platform::MacOs, Platform::Unix] {
            let err = resolve_db_path(platform, lookup_from(&[])).unwrap_err();
            assert!(matches!(err, DbError::DataDirUnavailable));
        }
    }
}
