//! Filesystem access used by the checkpoint write and load paths.
//!
//! The coordinator only talks to [`FileSystem`], which keeps the atomic write
//! protocol testable against injected failures. [`LocalFs`] is the production
//! implementation backed by `std::fs`.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{CheckpointError, Result};

/// How [`FileSystem::write`] treats an existing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Create the file or replace its content.
    Truncate,
    /// Fail if the file already exists.
    CreateNew,
}

/// Whole-file operations needed by the checkpoint coordinator.
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Paths matching a glob pattern, in unspecified order.
    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>>;

    fn create_dir_all(&self, path: &Path) -> Result<()>;

    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    fn write(&self, path: &Path, bytes: &[u8], mode: WriteMode) -> Result<()>;

    fn copy(&self, from: &Path, to: &Path) -> Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    fn remove(&self, path: &Path) -> Result<()>;
}

/// `std::fs` backed [`FileSystem`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        // Unreadable entries are skipped, like a directory listing race.
        Ok(glob::glob(pattern)?.filter_map(|entry| entry.ok()).collect())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(|e| CheckpointError::io("creating directory", path, e))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| CheckpointError::io("reading", path, e))
    }

    fn write(&self, path: &Path, bytes: &[u8], mode: WriteMode) -> Result<()> {
        let mut options = OpenOptions::new();
        options.write(true);
        match mode {
            WriteMode::Truncate => options.create(true).truncate(true),
            WriteMode::CreateNew => options.create_new(true),
        };

        let mut file = options
            .open(path)
            .map_err(|e| CheckpointError::io("opening", path, e))?;
        file.write_all(bytes)
            .map_err(|e| CheckpointError::io("writing", path, e))?;
        file.sync_all()
            .map_err(|e| CheckpointError::io("syncing", path, e))
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        fs::copy(from, to)
            .map(|_| ())
            .map_err(|e| CheckpointError::io("copying", from, e))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).map_err(|e| CheckpointError::io("renaming", from, e))
    }

    fn remove(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).map_err(|e| CheckpointError::io("removing", path, e))
    }
}
