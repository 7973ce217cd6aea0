//! Crash-safe, rotating checkpoints for long-running stateful processes.
//!
//! Components implement [`Owner`] and are registered by name with a
//! [`Checkpoint`] coordinator. A save snapshots every selected owner into one
//! [`CheckpointBlob`], encodes it with the configured [`Format`], and replaces
//! the target file with the crash-safe protocol in [`protocol`]. With a `step`
//! entry registered, saves rotate to `{stem}_{step}.ckpt` and loads pick the
//! highest step.
//!
//! Modules are organized by responsibility:
//! - [`coordinator`] hosts the save/load orchestration
//! - [`registry`] and [`owner`] define what gets checkpointed
//! - [`blob`] and [`format`] define the on-disk payload
//! - [`naming`] resolves rotated and latest file names
//! - [`protocol`] and [`storage`] perform the atomic file replacement
//! - [`config`] loads coordinator settings from the environment or TOML
//!
//! ```no_run
//! use std::sync::Arc;
//! use checkpoint::{Checkpoint, CheckpointConfig, Counter, STEP_KEY, Value};
//!
//! # fn main() -> checkpoint::Result<()> {
//! let mut ckpt = Checkpoint::new(CheckpointConfig::new("runs/model.ckpt"));
//! let step = Arc::new(Counter::new(0));
//! let weights = Arc::new(Value::new(vec![0.0f32; 16]));
//! ckpt.register(STEP_KEY, step.clone())?;
//! ckpt.register("weights", weights.clone())?;
//!
//! ckpt.load_or_save()?;
//! for _ in 0..1000 {
//!     if step.increment(1) % 100 == 0 {
//!         ckpt.save(None, None)?;
//!     }
//! }
//! ckpt.shutdown()
//! # }
//! ```
pub mod blob;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod format;
pub mod naming;
pub mod owner;
pub mod protocol;
pub mod registry;
pub mod storage;

mod writer;

pub use blob::{Blob, CheckpointBlob, RESERVED_PREFIX};
pub use config::CheckpointConfig;
pub use coordinator::{Checkpoint, LoadReport, Resume, STEP_KEY};
pub use error::{CheckpointError, ConfigError, OwnerError, Result};
pub use format::{Format, FormatError};
pub use owner::{Counter, Owner, Value};
pub use protocol::WriteStrategy;
pub use registry::Registry;
pub use storage::{FileSystem, LocalFs, WriteMode};
