//! Utility functions for xtask commands

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use checkpoint::CheckpointConfig;
use console::style;

/// Checkpoint path from the argument, `CHECKPOINT_FILE`, or the data directory
pub fn resolve_file(file: Option<PathBuf>) -> PathBuf {
    file.or_else(|| CheckpointConfig::from_env().filename)
        .unwrap_or_else(crate::dirs::default_checkpoint)
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Prompt user for confirmation
pub fn confirm(prompt: &str) -> Result<bool> {
    print!("{} ", style(format!("{} [y/N]", prompt)).yellow().bold());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}
