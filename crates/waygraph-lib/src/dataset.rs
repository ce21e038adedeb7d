use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::debug;

use crate::error::{Error, Result};

/// Default filename for the map database.
pub const DATABASE_FILENAME: &str = "map.db";

/// Environment variable overriding the default database location.
pub const DATABASE_ENV_VAR: &str = "WAYGRAPH_DATABASE";

/// Resolve the default database location using platform-specific project directories.
pub fn default_database_path() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("org", "waygraph", "waygraph").ok_or(Error::ProjectDirsUnavailable)?;
    Ok(dirs.data_dir().join(DATABASE_FILENAME))
}

/// Work out which database file to use.
///
/// The resolution order is:
/// 1. Explicit `target` argument when provided.
/// 2. `WAYGRAPH_DATABASE` environment variable.
/// 3. Platform-specific project data directory.
///
/// A path without an extension is treated as a directory holding `map.db`.
pub fn resolve_database_path(target: Option<&Path>) -> Result<PathBuf> {
    resolve_with_env(target, env::var_os(DATABASE_ENV_VAR))
}

fn resolve_with_env(target: Option<&Path>, env_value: Option<OsString>) -> Result<PathBuf> {
    let resolved = if let Some(explicit) = target {
        canonical_database_path(explicit)
    } else if let Some(value) = env_value.filter(|v| !v.is_empty()) {
        canonical_database_path(Path::new(&value))
    } else {
        default_database_path()?
    };
    debug!(path = %resolved.display(), "resolved map database path");
    Ok(resolved)
}

fn canonical_database_path(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.join(DATABASE_FILENAME)
    }
}
