//! Encoding of [`CheckpointBlob`] into checkpoint file bytes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blob::CheckpointBlob;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("bincode: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("entry name '{0}' uses the reserved prefix")]
    ReservedEntry(String),

    #[error("unknown checkpoint format '{0}' (expected 'bincode' or 'json')")]
    Unknown(String),
}

/// Wire format of checkpoint files.
///
/// # Formats
///
/// - `Bincode`: compact binary, the default for training runs
/// - `Json`: human-readable, useful when inspecting checkpoints by hand
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Bincode,
    Json,
}

impl Format {
    pub fn pack(self, blob: &CheckpointBlob) -> Result<Vec<u8>, FormatError> {
        let bytes = match self {
            Format::Bincode => bincode::serialize(blob)?,
            Format::Json => serde_json::to_vec(blob)?,
        };
        Ok(bytes)
    }

    pub fn unpack(self, bytes: &[u8]) -> Result<CheckpointBlob, FormatError> {
        let blob: CheckpointBlob = match self {
            Format::Bincode => bincode::deserialize(bytes)?,
            Format::Json => serde_json::from_slice(bytes)?,
        };
        if let Some(key) = blob.reserved_key() {
            return Err(FormatError::ReservedEntry(key.to_string()));
        }
        Ok(blob)
    }
}

impl FromStr for Format {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bincode" | "bin" => Ok(Format::Bincode),
            "json" => Ok(Format::Json),
            other => Err(FormatError::Unknown(other.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Format::Bincode => "bincode",
            Format::Json => "json",
        };
        write!(f, "{}", label)
    }
}
