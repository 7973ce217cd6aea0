//! Error types raised by the checkpoint coordinator and its collaborators.

use std::path::PathBuf;

use thiserror::Error;

use crate::format::FormatError;

/// Error type owners return from `save`/`load`.
pub type OwnerError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Errors surfaced by checkpoint operations.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint entry '{name}' rejected: {reason}")]
    ContractViolation { name: String, reason: String },

    #[error("no checkpoint entry registered under '{0}'")]
    UnknownOwner(String),

    #[error("no 'step' entry registered, cannot name a rotated checkpoint")]
    MissingStep,

    #[error("no checkpoint filename configured and no explicit path given")]
    NoTarget,

    #[error("checkpoint not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error while {op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode checkpoint: {0}")]
    Serialization(#[source] FormatError),

    #[error("failed to decode checkpoint {}: {source}", path.display())]
    Deserialization { path: PathBuf, source: FormatError },

    #[error("checkpoint has no entry '{0}'")]
    MissingEntry(String),

    #[error("failed to save checkpoint entry '{key}': {source}")]
    OwnerSave { key: String, source: OwnerError },

    #[error("failed to load checkpoint entry '{key}': {source}")]
    OwnerLoad { key: String, source: OwnerError },

    #[error("invalid checkpoint file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("checkpoint writer channel closed")]
    WorkerClosed,

    #[error("checkpoint writer thread panicked")]
    WorkerPanicked,
}

impl CheckpointError {
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    pub fn contract(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ContractViolation {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// True when no checkpoint file resolved; callers usually fall back to a
    /// fresh start.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
