//! Delete old rotated checkpoints
//!
//! The checkpoint library never deletes on rotation; this is the explicit
//! operator action for reclaiming space.
//!
//! Safety: Always prompts for confirmation before deletion.

use anyhow::{Context, Result};
use checkpoint::{LocalFs, naming};
use clap::Parser;
use console::style;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::utils::{confirm, resolve_file};

/// Delete all but the newest rotated checkpoints
#[derive(Parser, Debug)]
pub struct Clean {
    /// Configured checkpoint filename (defaults to CHECKPOINT_FILE, then the data directory)
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Number of newest checkpoints to keep
    #[arg(short, long, default_value_t = 1)]
    pub keep: usize,

    /// Skip confirmation prompt (dangerous!)
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl Clean {
    pub fn execute(self) -> Result<()> {
        if self.keep == 0 {
            anyhow::bail!("--keep must be at least 1");
        }

        let base = resolve_file(self.file);
        let rotated = naming::list_rotated(&LocalFs, &base)
            .with_context(|| format!("Failed to list checkpoints of {}", base.display()))?;
        let targets = stale(rotated, self.keep);

        if targets.is_empty() {
            println!("{}", style("Nothing to clean").dim());
            return Ok(());
        }

        // Display what will be cleaned
        println!("{}", style("Clean old checkpoints").yellow().bold());
        println!();
        println!("The following will be deleted:");
        for (step, path) in &targets {
            println!("  {} step {}", style("→").cyan(), style(step).bold());
            println!("    {}", style(path.display()).dim());
        }
        println!();

        if !self.yes && !confirm("Proceed?")? {
            println!("{}", style("Cancelled").dim());
            return Ok(());
        }

        for (_, path) in targets {
            print!("Deleting {}... ", path.display());
            io::stdout().flush()?;

            for side in [naming::backup_path(&path), naming::temp_path(&path)] {
                if side.exists() {
                    std::fs::remove_file(&side)
                        .with_context(|| format!("Failed to delete: {}", side.display()))?;
                }
            }
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to delete: {}", path.display()))?;

            println!("{}", style("✓").green());
        }

        println!();
        println!("{}", style("✓ Cleanup complete!").green().bold());

        Ok(())
    }
}

/// Entries older than the newest `keep`, given ascending steps.
fn stale(mut rotated: Vec<(u64, PathBuf)>, keep: usize) -> Vec<(u64, PathBuf)> {
    let cut = rotated.len().saturating_sub(keep);
    rotated.truncate(cut);
    rotated
}
