//! Restore checkpoints from backups left by interrupted writes

use anyhow::{Context, Result};
use checkpoint::{LocalFs, naming, protocol};
use clap::Parser;
use console::style;
use std::path::PathBuf;

use crate::utils::resolve_file;

/// Restore a checkpoint from a leftover backup
#[derive(Parser)]
pub struct Recover {
    /// Checkpoint file (defaults to CHECKPOINT_FILE, then the data directory)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Treat FILE as the configured filename and recover it and every rotated step
    #[arg(short, long)]
    all: bool,
}

impl Recover {
    pub fn execute(self) -> Result<()> {
        let file = resolve_file(self.file);

        let mut targets = vec![file.clone()];
        if self.all {
            let rotated = naming::list_rotated(&LocalFs, &file)
                .with_context(|| format!("Failed to list checkpoints of {}", file.display()))?;
            targets.extend(rotated.into_iter().map(|(_, path)| path));
        }

        let mut restored = 0;
        for path in &targets {
            let recovered = protocol::recover(&LocalFs, path)
                .with_context(|| format!("Failed to recover {}", path.display()))?;
            if recovered {
                restored += 1;
                println!(
                    "  {} restored {}",
                    style("✓").green(),
                    style(path.display()).bold()
                );
            }
        }

        if restored == 0 {
            println!("{}", style("Nothing to recover").dim());
        } else {
            println!();
            println!(
                "{}",
                style(format!("✓ Restored {} checkpoint(s)", restored))
                    .green()
                    .bold()
            );
        }

        Ok(())
    }
}
