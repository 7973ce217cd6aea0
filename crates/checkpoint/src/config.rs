//! Checkpoint coordinator configuration and loaders.
use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::format::Format;
use crate::protocol::WriteStrategy;

/// Configuration of a [`crate::Checkpoint`] coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Nominal checkpoint file. Rotated saves go next to it as
    /// `{stem}_{step}.ckpt`. Without it every call needs an explicit path.
    pub filename: Option<PathBuf>,
    /// Emit save/load progress and checkpoint age at info level.
    pub log: bool,
    /// Write on a background thread instead of blocking `save`.
    pub parallel: bool,
    pub format: Format,
    pub strategy: WriteStrategy,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            filename: None,
            log: true,
            parallel: true,
            format: Format::default(),
            strategy: WriteStrategy::default(),
        }
    }
}

impl CheckpointConfig {
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: Some(filename.into()),
            ..Self::default()
        }
    }

    pub fn with_log(mut self, log: bool) -> Self {
        self.log = log;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_strategy(mut self, strategy: WriteStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `CHECKPOINT_FILE` - Nominal checkpoint filename (default: none)
    /// - `CHECKPOINT_LOG` - Log save/load progress (default: true)
    /// - `CHECKPOINT_PARALLEL` - Write on a background thread (default: true)
    /// - `CHECKPOINT_FORMAT` - `bincode` or `json` (default: bincode)
    /// - `CHECKPOINT_STRATEGY` - `backup` or `rename` (default: backup)
    ///
    /// Unparsable values are ignored and keep the default.
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(file) = read("CHECKPOINT_FILE") {
            config.filename = Some(PathBuf::from(file));
        }
        if let Some(log) = read("CHECKPOINT_LOG").and_then(|v| parse_flag(&v)) {
            config.log = log;
        }
        if let Some(parallel) = read("CHECKPOINT_PARALLEL").and_then(|v| parse_flag(&v)) {
            config.parallel = parallel;
        }
        if let Some(format) = read("CHECKPOINT_FORMAT").and_then(|v| v.parse().ok()) {
            config.format = format;
        }
        if let Some(strategy) = read("CHECKPOINT_STRATEGY").and_then(|v| v.parse().ok()) {
            config.strategy = strategy;
        }

        config
    }

    /// Load configuration from a TOML file; missing keys keep their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: CheckpointConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(filename) = &self.filename
            && filename.file_stem().is_none()
        {
            return Err(ConfigError::Validation(format!(
                "filename '{}' has no file name component",
                filename.display()
            )));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CheckpointConfig::default();
        assert!(config.filename.is_none());
        assert!(config.log);
        assert!(config.parallel);
        assert_eq!(config.format, Format::Bincode);
        assert_eq!(config.strategy, WriteStrategy::Backup);
    }

    #[test]
    fn test_from_vars_overrides() {
        let config = CheckpointConfig::from_vars(vars(&[
            ("CHECKPOINT_FILE", "runs/model.ckpt"),
            ("CHECKPOINT_LOG", "off"),
            ("CHECKPOINT_PARALLEL", "0"),
            ("CHECKPOINT_FORMAT", "json"),
            ("CHECKPOINT_STRATEGY", "rename"),
        ]));
        assert_eq!(config.filename, Some(PathBuf::from("runs/model.ckpt")));
        assert!(!config.log);
        assert!(!config.parallel);
        assert_eq!(config.format, Format::Json);
        assert_eq!(config.strategy, WriteStrategy::Rename);
    }

    #[test]
    fn test_from_vars_ignores_garbage() {
        let config = CheckpointConfig::from_vars(vars(&[
            ("CHECKPOINT_PARALLEL", "maybe"),
            ("CHECKPOINT_FORMAT", "yaml"),
            ("CHECKPOINT_FILE", "  "),
        ]));
        assert_eq!(config, CheckpointConfig::default());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
filename = "runs/agent.ckpt"
format = "json"
"#
        )
        .unwrap();

        let config = CheckpointConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.filename, Some(PathBuf::from("runs/agent.ckpt")));
        assert_eq!(config.format, Format::Json);
        assert!(config.parallel);
        assert_eq!(config.strategy, WriteStrategy::Backup);
    }

    #[test]
    fn test_missing_toml_file() {
        let err = CheckpointConfig::from_toml_file(Path::new("no_such_checkpoint.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_validation_rejects_dot_dot_filename() {
        let config = CheckpointConfig::new("runs/..");
        assert!(config.validate().is_err());
    }
}
