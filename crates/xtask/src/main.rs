//! Development tasks for checkpoint files
//!
//! This binary provides development utilities using the cargo-xtask pattern.
//! Run with: `cargo xtask <command>`

mod commands;
mod dirs;
mod utils;

use anyhow::Result;
use clap::Parser;
use commands::{Clean, Inspect, List, Recover};

/// Development tasks for checkpoint files
#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Development tools for checkpoint files", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Decode a checkpoint and show its entries
    Inspect(Inspect),

    /// List rotated checkpoints of a configured filename
    List(List),

    /// Restore a checkpoint from a leftover backup
    Recover(Recover),

    /// Delete old rotated checkpoints
    Clean(Clean),
}

fn main() -> Result<()> {
    // Load .env file if it exists (for CHECKPOINT_FILE and other env vars)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Inspect(cmd) => cmd.execute(),
        Command::List(cmd) => cmd.execute(),
        Command::Recover(cmd) => cmd.execute(),
        Command::Clean(cmd) => cmd.execute(),
    }
}
