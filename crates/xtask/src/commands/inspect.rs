//! Decode a checkpoint file and display its entries
//!
//! Works on any file written by the checkpoint coordinator. Without
//! `--codec`, bincode is tried first and JSON second.

use anyhow::{Context, Result};
use checkpoint::{CheckpointBlob, Format, FormatError, LocalFs, STEP_KEY, naming};
use clap::Parser;
use console::style;
use std::path::PathBuf;

use crate::utils::{format_bytes, resolve_file};

/// Decode a checkpoint and show its entries
#[derive(Parser)]
pub struct Inspect {
    /// Checkpoint file (defaults to CHECKPOINT_FILE, then the data directory)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Treat FILE as the configured filename and open its highest step
    #[arg(short, long)]
    latest: bool,

    /// Encoding of the file (default: try bincode, then json)
    #[arg(short, long)]
    codec: Option<Format>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "summary")]
    format: OutputFormat,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    /// Entry names, sizes and the step
    Summary,
    /// JSON document with per-entry metadata
    Json,
}

impl Inspect {
    pub fn execute(self) -> Result<()> {
        let mut path = resolve_file(self.file);
        if self.latest {
            path = naming::latest(&LocalFs, &path)
                .with_context(|| format!("Failed to list checkpoints of {}", path.display()))?;
        }

        if !path.exists() {
            anyhow::bail!(
                "Checkpoint not found: {}\n\nHint: run `cargo xtask list {}` to see rotated files",
                path.display(),
                path.display()
            );
        }

        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read checkpoint: {}", path.display()))?;
        let blob = decode(&bytes, self.codec)
            .with_context(|| format!("Failed to decode checkpoint: {}", path.display()))?;

        match self.format {
            OutputFormat::Summary => {
                println!("{} {}", style("Checkpoint:").bold().cyan(), path.display());
                println!(
                    "{} {}",
                    style("File Size:").bold().cyan(),
                    format_bytes(bytes.len() as u64)
                );
                println!(
                    "{} {:.0} seconds ago",
                    style("Saved:").bold().cyan(),
                    blob.age().as_secs_f64()
                );
                println!();
                print_summary(&blob);
            }
            OutputFormat::Json => print_json(&path, bytes.len(), &blob)?,
        }

        Ok(())
    }
}

fn decode(bytes: &[u8], codec: Option<Format>) -> Result<CheckpointBlob, FormatError> {
    match codec {
        Some(format) => format.unpack(bytes),
        None => Format::Bincode
            .unpack(bytes)
            .or_else(|_| Format::Json.unpack(bytes)),
    }
}

fn step_of(blob: &CheckpointBlob) -> Option<u64> {
    blob.get(STEP_KEY).and_then(|entry| entry.decode().ok())
}

fn print_summary(blob: &CheckpointBlob) {
    println!("{}", style("=== Checkpoint Summary ===").bold().green());
    println!();

    if let Some(step) = step_of(blob) {
        println!("{} {}", style("Step:").bold().yellow(), step);
        println!();
    }

    println!("{} {}", style("Entries:").bold().yellow(), blob.len());
    for (name, entry) in blob.entries() {
        println!(
            "  {} {} ({})",
            style("→").cyan(),
            style(name).bold(),
            format_bytes(entry.len() as u64)
        );
    }
    println!();
}

fn print_json(path: &std::path::Path, size: usize, blob: &CheckpointBlob) -> Result<()> {
    let entries: serde_json::Map<String, serde_json::Value> = blob
        .entries()
        .iter()
        .map(|(name, entry)| (name.clone(), serde_json::json!({ "bytes": entry.len() })))
        .collect();

    let doc = serde_json::json!({
        "path": path.display().to_string(),
        "size": size,
        "timestamp": blob.timestamp(),
        "age_secs": blob.age().as_secs_f64(),
        "step": step_of(blob),
        "entries": entries,
    });

    let json = serde_json::to_string_pretty(&doc).context("Failed to serialize summary to JSON")?;
    println!("{}", json);
    Ok(())
}
