//! Checkpoint file naming and rotation discovery.
//!
//! # File Layout
//!
//! ```text
//! {dir}/
//!   ├── model.ckpt          ← configured filename (fallback target)
//!   ├── model_100.ckpt      ← rotated saves, one per step
//!   ├── model_200.ckpt
//!   └── model_200.ckpt.old  ← only while a rewrite of the same file is in flight
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::storage::FileSystem;

pub const EXTENSION: &str = "ckpt";
pub const BACKUP_SUFFIX: &str = ".old";
pub const TEMP_SUFFIX: &str = ".tmp";

fn stem(base: &Path) -> String {
    base.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn parent(base: &Path) -> &Path {
    base.parent().unwrap_or_else(|| Path::new(""))
}

/// `{dir}/{stem}_{step}.ckpt` for the configured filename `{dir}/{stem}.*`.
pub fn rotated_path(base: &Path, step: u64) -> PathBuf {
    parent(base).join(format!("{}_{}.{}", stem(base), step, EXTENSION))
}

/// Step suffix of a rotated checkpoint belonging to `base`, if `path` is one.
pub fn parse_step(base: &Path, path: &Path) -> Option<u64> {
    if path.extension()? != EXTENSION {
        return None;
    }
    let file_stem = path.file_stem()?.to_str()?;
    let (prefix, step) = file_stem.rsplit_once('_')?;
    if prefix != stem(base) || !step.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    step.parse().ok()
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// `{path}.old`, holding the previous content during a rewrite.
pub fn backup_path(path: &Path) -> PathBuf {
    with_suffix(path, BACKUP_SUFFIX)
}

/// `{path}.tmp`, the staging file of the rename strategy.
pub fn temp_path(path: &Path) -> PathBuf {
    with_suffix(path, TEMP_SUFFIX)
}

fn rotation_pattern(base: &Path) -> String {
    let dir = parent(base).to_string_lossy();
    let dir = if dir.is_empty() { ".".into() } else { dir };
    format!(
        "{}/{}_[0-9]*.{}",
        glob::Pattern::escape(&dir),
        glob::Pattern::escape(&stem(base)),
        EXTENSION
    )
}

/// All rotated checkpoints of `base`, sorted by ascending step.
pub fn list_rotated(fs: &dyn FileSystem, base: &Path) -> Result<Vec<(u64, PathBuf)>> {
    let mut found: Vec<(u64, PathBuf)> = fs
        .glob(&rotation_pattern(base))?
        .into_iter()
        .filter_map(|path| parse_step(base, &path).map(|step| (step, path)))
        .collect();
    found.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    Ok(found)
}

/// Rotated checkpoint with the largest step, or `base` when none exist.
pub fn latest(fs: &dyn FileSystem, base: &Path) -> Result<PathBuf> {
    Ok(list_rotated(fs, base)?
        .pop()
        .map(|(_, path)| path)
        .unwrap_or_else(|| base.to_path_buf()))
}
