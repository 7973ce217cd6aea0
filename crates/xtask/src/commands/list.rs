//! List rotated checkpoints of a configured filename

use anyhow::{Context, Result};
use checkpoint::{LocalFs, naming};
use clap::Parser;
use console::style;
use std::path::{Path, PathBuf};

use crate::utils::{format_bytes, resolve_file};

/// List rotated checkpoints of a configured filename
#[derive(Parser)]
pub struct List {
    /// Configured checkpoint filename (defaults to CHECKPOINT_FILE, then the data directory)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,
}

impl List {
    pub fn execute(self) -> Result<()> {
        let base = resolve_file(self.file);
        let rotated = naming::list_rotated(&LocalFs, &base)
            .with_context(|| format!("Failed to list checkpoints of {}", base.display()))?;

        println!("{} {}", style("Checkpoints of:").bold().cyan(), base.display());
        println!();

        if rotated.is_empty() {
            if base.exists() {
                print_entry("-", &base, true);
            } else {
                println!("{}", style("No checkpoints found").dim());
            }
            return Ok(());
        }

        let last = rotated.len() - 1;
        for (i, (step, path)) in rotated.iter().enumerate() {
            print_entry(&step.to_string(), path, i == last);
        }
        println!();
        println!("{} {}", style("Total:").bold().cyan(), rotated.len());

        Ok(())
    }
}

fn print_entry(step: &str, path: &Path, latest: bool) {
    let size = std::fs::metadata(path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "?".to_string());
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let marker = if latest {
        style("← latest").green().bold().to_string()
    } else {
        String::new()
    };
    println!(
        "  {:>8}  {}  {}  {}",
        style(step).yellow(),
        style(name).bold(),
        style(size).dim(),
        marker
    );

    if naming::backup_path(path).exists() {
        println!(
            "            {} interrupted write, run `cargo xtask recover {}`",
            style("!").red().bold(),
            path.display()
        );
    }
}
