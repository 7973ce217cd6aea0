//! Platform-specific directory utilities
//!
//! Provides the default checkpoint location when neither a path argument nor
//! `CHECKPOINT_FILE` is given.

use std::path::PathBuf;

/// Get the platform-specific data directory for checkpoints
///
/// Follows platform conventions:
/// - macOS: `~/Library/Application Support/checkpoint`
/// - Linux: `~/.local/share/checkpoint` (or `$XDG_DATA_HOME/checkpoint`)
/// - Windows: `%APPDATA%\checkpoint`
/// - Fallback: `./checkpoints`
pub fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "checkpoint")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./checkpoints"))
}

/// Default configured filename: `{data_dir}/checkpoint.ckpt`
pub fn default_checkpoint() -> PathBuf {
    data_dir().join(format!("checkpoint.{}", checkpoint::naming::EXTENSION))
}
