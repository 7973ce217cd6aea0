//! Checkpoint coordinator: save, load and latest-resolution over a registry.
//!
//! The coordinator owns the registry of named owners, the filesystem handle,
//! and the background writer. Serialization of owner state always happens on
//! the calling thread; only the file write is handed to the writer.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::blob::{CheckpointBlob, is_reserved};
use crate::config::CheckpointConfig;
use crate::error::{CheckpointError, Result};
use crate::naming;
use crate::owner::Owner;
use crate::protocol::{self, write_atomic};
use crate::registry::Registry;
use crate::storage::{FileSystem, LocalFs};
use crate::writer::{WriteTicket, WriteWorker};

/// Registry entry whose [`Owner::step`] names rotated checkpoint files.
pub const STEP_KEY: &str = "step";

/// Outcome of a successful [`Checkpoint::load`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    /// File the state was read from.
    pub path: PathBuf,
    /// Entries applied to their owners, in application order.
    pub keys: Vec<String>,
    /// Time since the checkpoint was produced (diagnostic only).
    pub age: Duration,
}

/// Outcome of [`Checkpoint::load_or_save`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resume {
    /// An existing checkpoint was restored.
    Loaded(LoadReport),
    /// No checkpoint existed; the current state was saved to this path.
    Initialized(PathBuf),
}

/// Coordinates saving and restoring a set of named owners.
///
/// # Asynchronous writes
///
/// With `parallel` enabled, `save` returns once the state is serialized and
/// handed to the writer thread. At most one write is in flight: the next
/// `save`, `load`, `exists`, `wait` or `shutdown` first waits for it and
/// returns its error if it failed.
pub struct Checkpoint {
    config: CheckpointConfig,
    registry: Registry,
    fs: Arc<dyn FileSystem>,
    worker: Option<WriteWorker>,
    pending: Option<WriteTicket>,
}

impl Checkpoint {
    pub fn new(config: CheckpointConfig) -> Self {
        Self::with_filesystem(config, Arc::new(LocalFs))
    }

    pub fn with_filesystem(config: CheckpointConfig, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            config,
            registry: Registry::new(),
            fs,
            worker: None,
            pending: None,
        }
    }

    pub fn config(&self) -> &CheckpointConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Bind an owner under `name`. See [`Registry::register`].
    pub fn register(&mut self, name: impl Into<String>, owner: Arc<dyn Owner>) -> Result<()> {
        self.registry.register(name, owner)
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Owner>> {
        self.registry.get(name)
    }

    /// Current value of the `step` entry.
    pub fn step(&self) -> Result<u64> {
        let owner = self
            .registry
            .get(STEP_KEY)
            .map_err(|_| CheckpointError::MissingStep)?;
        owner
            .step()
            .ok_or_else(|| CheckpointError::contract(STEP_KEY, "entry does not expose a step count"))
    }

    fn base(&self) -> Result<&Path> {
        self.config
            .filename
            .as_deref()
            .ok_or(CheckpointError::NoTarget)
    }

    /// Rotated checkpoint with the largest step, or the configured filename
    /// when there is none.
    pub fn latest_path(&self) -> Result<PathBuf> {
        naming::latest(&*self.fs, self.base()?)
    }

    /// All rotated checkpoints as `(step, path)`, oldest first.
    pub fn list(&self) -> Result<Vec<(u64, PathBuf)>> {
        naming::list_rotated(&*self.fs, self.base()?)
    }

    fn resolve(&self, path: Option<&Path>) -> Result<PathBuf> {
        match path {
            Some(path) => Ok(path.to_path_buf()),
            None => self.latest_path(),
        }
    }

    /// Where a save without an explicit path goes.
    fn save_path(&self) -> Result<PathBuf> {
        let base = self.base()?;
        if self.registry.contains(STEP_KEY) {
            Ok(naming::rotated_path(base, self.step()?))
        } else {
            Ok(base.to_path_buf())
        }
    }

    /// Whether a checkpoint exists at `path` or the latest resolved path.
    pub fn exists(&mut self, path: Option<&Path>) -> Result<bool> {
        self.wait()?;
        let path = self.resolve(path)?;
        protocol::recover(&*self.fs, &path)?;

        let exists = self.fs.exists(&path);
        if self.config.log {
            if exists {
                info!("Found existing checkpoint {}.", path.display());
            } else {
                info!("Did not find any checkpoint.");
            }
        }
        Ok(exists)
    }

    /// Save the selected entries (default: all) and return the target path.
    ///
    /// Owner state is captured before this returns. In parallel mode the file
    /// write completes later; its error surfaces on the next synchronizing call.
    pub fn save(&mut self, path: Option<&Path>, keys: Option<&[&str]>) -> Result<PathBuf> {
        let target = match path {
            Some(path) => path.to_path_buf(),
            None => self.save_path()?,
        };

        self.wait()?;

        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.fs.create_dir_all(parent)?;
        }
        if self.config.log {
            info!("Writing checkpoint: {}", target.display());
        }

        let blob = self.snapshot(keys)?;
        let bytes = self
            .config
            .format
            .pack(&blob)
            .map_err(CheckpointError::Serialization)?;
        debug!(
            "Serialized {} checkpoint entries into {} bytes",
            blob.len(),
            bytes.len()
        );

        if self.config.parallel {
            let (strategy, log) = (self.config.strategy, self.config.log);
            let ticket = self
                .worker()?
                .submit(target.clone(), bytes, strategy, log)?;
            self.pending = Some(ticket);
        } else {
            write_atomic(&*self.fs, &target, &bytes, self.config.strategy)?;
            if self.config.log {
                info!("Wrote checkpoint: {}", target.display());
            }
        }

        Ok(target)
    }

    fn snapshot(&self, keys: Option<&[&str]>) -> Result<CheckpointBlob> {
        let selected: Vec<(&str, Arc<dyn Owner>)> = match keys {
            None => self
                .registry
                .iter()
                .map(|(name, owner)| (name, Arc::clone(owner)))
                .collect(),
            Some(keys) => keys
                .iter()
                .map(|&key| {
                    if is_reserved(key) {
                        return Err(CheckpointError::contract(key, "reserved names cannot be saved"));
                    }
                    Ok((key, self.registry.get(key)?))
                })
                .collect::<Result<_>>()?,
        };

        let mut entries = BTreeMap::new();
        for (key, owner) in selected {
            let blob = owner.save().map_err(|source| CheckpointError::OwnerSave {
                key: key.to_string(),
                source,
            })?;
            entries.insert(key.to_string(), blob);
        }
        Ok(CheckpointBlob::new(entries))
    }

    /// Restore entries from `path` or the latest checkpoint.
    ///
    /// Entries are applied in key order. If an owner fails, the error names
    /// it and owners applied before it keep their new state.
    pub fn load(&mut self, path: Option<&Path>, keys: Option<&[&str]>) -> Result<LoadReport> {
        self.wait()?;
        let path = self.resolve(path)?;
        protocol::recover(&*self.fs, &path)?;

        if !self.fs.exists(&path) {
            return Err(CheckpointError::NotFound(path));
        }
        if self.config.log {
            info!("Loading checkpoint: {}", path.display());
        }

        let bytes = self.fs.read(&path)?;
        let blob = self
            .config
            .format
            .unpack(&bytes)
            .map_err(|source| CheckpointError::Deserialization {
                path: path.clone(),
                source,
            })?;

        let keys: Vec<String> = match keys {
            Some(keys) => keys.iter().map(|k| k.to_string()).collect(),
            None => blob.keys().map(String::from).collect(),
        };

        let mut applied = Vec::with_capacity(keys.len());
        for key in keys {
            if is_reserved(&key) {
                continue;
            }
            if let Err(e) = self.apply(&blob, &key) {
                error!("Error loading {} from checkpoint: {}", key, e);
                return Err(e);
            }
            applied.push(key);
        }

        let age = blob.age();
        if self.config.log {
            info!("Loaded checkpoint from {:.0} seconds ago.", age.as_secs_f64());
        }

        Ok(LoadReport {
            path,
            keys: applied,
            age,
        })
    }

    fn apply(&self, blob: &CheckpointBlob, key: &str) -> Result<()> {
        let entry = blob
            .get(key)
            .cloned()
            .ok_or_else(|| CheckpointError::MissingEntry(key.to_string()))?;
        let owner = self.registry.get(key)?;
        owner.load(entry).map_err(|source| CheckpointError::OwnerLoad {
            key: key.to_string(),
            source,
        })
    }

    /// Load the latest checkpoint if one exists, otherwise save the current
    /// state as the first one.
    pub fn load_or_save(&mut self) -> Result<Resume> {
        if self.exists(None)? {
            Ok(Resume::Loaded(self.load(None, None)?))
        } else {
            Ok(Resume::Initialized(self.save(None, None)?))
        }
    }

    /// Restore `path` (or the latest checkpoint) from a leftover backup.
    /// Returns whether a backup was restored.
    pub fn recover(&mut self, path: Option<&Path>) -> Result<bool> {
        self.wait()?;
        let path = self.resolve(path)?;
        protocol::recover(&*self.fs, &path)
    }

    /// True while an asynchronous write has not been waited on.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Block until the in-flight write, if any, completed and return its result.
    pub fn wait(&mut self) -> Result<()> {
        match self.pending.take() {
            Some(ticket) => ticket.wait(),
            None => Ok(()),
        }
    }

    /// Drain the pending write and stop the writer thread.
    pub fn shutdown(mut self) -> Result<()> {
        let pending = self.wait();
        let worker = self.worker.take().map_or(Ok(()), WriteWorker::shutdown);
        pending.and(worker)
    }

    fn worker(&mut self) -> Result<&WriteWorker> {
        if self.worker.is_none() {
            self.worker = Some(WriteWorker::spawn(Arc::clone(&self.fs))?);
        }
        self.worker.as_ref().ok_or(CheckpointError::WorkerClosed)
    }
}

impl Drop for Checkpoint {
    fn drop(&mut self) {
        if let Some(ticket) = self.pending.take() {
            let path = ticket.path().to_path_buf();
            if let Err(e) = ticket.wait() {
                error!("Checkpoint write to {} failed: {}", path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::Blob;
    use crate::error::OwnerError;
    use crate::format::Format;
    use crate::owner::{Counter, Value};
    use tempfile::TempDir;

    struct Rejecting;

    impl Owner for Rejecting {
        fn save(&self) -> std::result::Result<Blob, OwnerError> {
            Ok(Blob::new(vec![1]))
        }

        fn load(&self, _blob: Blob) -> std::result::Result<(), OwnerError> {
            Err("incompatible layout".into())
        }
    }

    fn sync_config(dir: &TempDir) -> CheckpointConfig {
        CheckpointConfig::new(dir.path().join("model.ckpt"))
            .with_parallel(false)
            .with_log(false)
    }

    #[test]
    fn test_save_uses_step_suffix() {
        let dir = TempDir::new().unwrap();
        let mut ckpt = Checkpoint::new(sync_config(&dir));
        ckpt.register(STEP_KEY, Arc::new(Counter::new(250))).unwrap();

        let path = ckpt.save(None, None).unwrap();
        assert_eq!(path, dir.path().join("model_250.ckpt"));
        assert!(path.exists());
    }

    #[test]
    fn test_save_without_step_uses_configured_filename() {
        let dir = TempDir::new().unwrap();
        let mut ckpt = Checkpoint::new(sync_config(&dir));
        ckpt.register("agent", Arc::new(Value::new(3i32))).unwrap();

        let path = ckpt.save(None, None).unwrap();
        assert_eq!(path, dir.path().join("model.ckpt"));
        assert_eq!(ckpt.latest_path().unwrap(), path);
    }

    #[test]
    fn test_no_target_without_filename() {
        let mut ckpt = Checkpoint::new(CheckpointConfig::default().with_log(false));
        assert!(matches!(ckpt.save(None, None), Err(CheckpointError::NoTarget)));
        assert!(matches!(ckpt.load(None, None), Err(CheckpointError::NoTarget)));
    }

    #[test]
    fn test_step_errors() {
        let dir = TempDir::new().unwrap();
        let mut ckpt = Checkpoint::new(sync_config(&dir));
        assert!(matches!(ckpt.step(), Err(CheckpointError::MissingStep)));

        ckpt.register(STEP_KEY, Arc::new(Value::new(1u64))).unwrap();
        assert!(matches!(
            ckpt.step(),
            Err(CheckpointError::ContractViolation { .. })
        ));
    }

    #[test]
    fn test_roundtrip_selected_keys() {
        let dir = TempDir::new().unwrap();
        let mut ckpt = Checkpoint::new(sync_config(&dir));
        let step = Arc::new(Counter::new(1));
        let weights = Arc::new(Value::new(vec![0.5f32, 0.25]));
        ckpt.register(STEP_KEY, step.clone()).unwrap();
        ckpt.register("weights", weights.clone()).unwrap();

        ckpt.save(None, None).unwrap();
        step.set(99);
        weights.set(vec![]);

        let report = ckpt.load(None, Some(&["weights"])).unwrap();
        assert_eq!(report.keys, vec!["weights".to_string()]);
        assert_eq!(weights.get(), vec![0.5, 0.25]);
        assert_eq!(step.get(), 99);
    }

    #[test]
    fn test_save_rejects_reserved_and_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let mut ckpt = Checkpoint::new(sync_config(&dir));
        ckpt.register("agent", Arc::new(Value::new(0u8))).unwrap();

        assert!(matches!(
            ckpt.save(None, Some(&["_timestamp"])),
            Err(CheckpointError::ContractViolation { .. })
        ));
        assert!(matches!(
            ckpt.save(None, Some(&["optimizer"])),
            Err(CheckpointError::UnknownOwner(_))
        ));
    }

    #[test]
    fn test_load_missing_entry() {
        let dir = TempDir::new().unwrap();
        let mut ckpt = Checkpoint::new(sync_config(&dir));
        ckpt.register("agent", Arc::new(Value::new(0u8))).unwrap();
        ckpt.register("replay", Arc::new(Value::new(0u8))).unwrap();
        ckpt.save(None, Some(&["agent"])).unwrap();

        let err = ckpt.load(None, Some(&["replay"])).unwrap_err();
        assert!(matches!(err, CheckpointError::MissingEntry(ref key) if key == "replay"));
    }

    #[test]
    fn test_owner_load_failure_names_key() {
        let dir = TempDir::new().unwrap();
        let mut ckpt = Checkpoint::new(sync_config(&dir));
        ckpt.register("policy", Arc::new(Rejecting)).unwrap();
        ckpt.save(None, None).unwrap();

        let err = ckpt.load(None, None).unwrap_err();
        assert!(matches!(err, CheckpointError::OwnerLoad { ref key, .. } if key == "policy"));
    }

    #[test]
    fn test_corrupt_file_is_deserialization_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.ckpt");
        std::fs::write(&path, b"\x01garbage").unwrap();

        let mut ckpt = Checkpoint::new(sync_config(&dir));
        let err = ckpt.load(None, None).unwrap_err();
        assert!(matches!(err, CheckpointError::Deserialization { .. }));
    }

    #[test]
    fn test_json_format_roundtrip() {
        let dir = TempDir::new().unwrap();
        let config = sync_config(&dir).with_format(Format::Json);
        let mut ckpt = Checkpoint::new(config);
        let notes = Arc::new(Value::new(String::from("warmup done")));
        ckpt.register("notes", notes.clone()).unwrap();

        let path = ckpt.save(None, None).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("_timestamp"));

        notes.set(String::new());
        ckpt.load(None, None).unwrap();
        assert_eq!(notes.get(), "warmup done");
    }

    #[test]
    fn test_exists_and_load_or_save() {
        let dir = TempDir::new().unwrap();
        let mut ckpt = Checkpoint::new(sync_config(&dir));
        let step = Arc::new(Counter::new(0));
        ckpt.register(STEP_KEY, step.clone()).unwrap();

        assert!(!ckpt.exists(None).unwrap());
        let first = ckpt.load_or_save().unwrap();
        assert_eq!(first, Resume::Initialized(dir.path().join("model_0.ckpt")));

        step.set(12);
        assert!(ckpt.exists(None).unwrap());
        match ckpt.load_or_save().unwrap() {
            Resume::Loaded(report) => assert_eq!(report.path, dir.path().join("model_0.ckpt")),
            other => panic!("expected a load, got {:?}", other),
        }
        assert_eq!(step.get(), 0);
    }
}
