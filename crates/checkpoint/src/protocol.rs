//! Crash-safe replacement of a checkpoint file.
//!
//! # Backup strategy
//!
//! ```text
//! target exists?  no  → write target (create-new)
//!                 yes → copy target → target.old.tmp → rename to target.old
//!                       overwrite target
//!                       remove target.old
//! ```
//!
//! At every instant either the old file, the backup plus a new file, or only
//! the new file exists. A crash while the target is being overwritten leaves
//! `target.old` behind; [`recover`] restores it before the next read or the
//! next backup write of the same target.
//!
//! # Rename strategy
//!
//! Writes `target.tmp` and renames it over the target. The target is never
//! partially written.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigError, Result};
use crate::naming::{backup_path, temp_path};
use crate::storage::{FileSystem, WriteMode};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteStrategy {
    /// Copy the old file aside, overwrite in place, drop the copy.
    #[default]
    Backup,
    /// Stage the new content in a temp file and rename it over the target.
    Rename,
}

impl FromStr for WriteStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "backup" => Ok(WriteStrategy::Backup),
            "rename" => Ok(WriteStrategy::Rename),
            other => Err(ConfigError::Validation(format!(
                "unknown write strategy '{}' (expected 'backup' or 'rename')",
                other
            ))),
        }
    }
}

impl fmt::Display for WriteStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WriteStrategy::Backup => "backup",
            WriteStrategy::Rename => "rename",
        };
        write!(f, "{}", label)
    }
}

/// Replace `path` with `bytes` using `strategy`. Parent directories must exist.
pub fn write_atomic(
    fs: &dyn FileSystem,
    path: &Path,
    bytes: &[u8],
    strategy: WriteStrategy,
) -> Result<()> {
    match strategy {
        WriteStrategy::Backup => write_with_backup(fs, path, bytes),
        WriteStrategy::Rename => write_with_rename(fs, path, bytes),
    }
}

fn write_with_backup(fs: &dyn FileSystem, path: &Path, bytes: &[u8]) -> Result<()> {
    // A leftover backup is the only complete copy; the target may be torn.
    let old = backup_path(path);
    if fs.exists(&old) {
        recover(fs, path)?;
    }

    if !fs.exists(path) {
        return fs.write(path, bytes, WriteMode::CreateNew);
    }

    // The backup only appears under its final name once it is complete.
    let staging = temp_path(&old);
    fs.copy(path, &staging)?;
    fs.rename(&staging, &old)?;
    debug!("Backed up {} to {}", path.display(), old.display());
    fs.write(path, bytes, WriteMode::Truncate)?;
    fs.remove(&old)
}

fn write_with_rename(fs: &dyn FileSystem, path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = temp_path(path);
    fs.write(&tmp, bytes, WriteMode::Truncate)?;
    fs.rename(&tmp, path)
}

/// Undo an interrupted write of `path`.
///
/// A leftover backup means the process died between backing up and cleaning
/// up, so the target may be torn: the backup is restored over it. Stale temp
/// files of the rename strategy are removed. Returns whether a backup was
/// restored.
pub fn recover(fs: &dyn FileSystem, path: &Path) -> Result<bool> {
    let old = backup_path(path);
    for tmp in [temp_path(path), temp_path(&old)] {
        if fs.exists(&tmp) {
            debug!("Removing stale temp file {}", tmp.display());
            fs.remove(&tmp)?;
        }
    }

    if !fs.exists(&old) {
        return Ok(false);
    }

    warn!(
        "Found backup {} from an interrupted write, restoring {}",
        old.display(),
        path.display()
    );
    fs.copy(&old, path)?;
    fs.remove(&old)?;
    Ok(true)
}
