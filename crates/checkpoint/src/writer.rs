//! Background writer for asynchronous checkpoint saves.
//!
//! One worker thread per coordinator executes the atomic write protocol for
//! bytes that were already serialized on the calling thread. The coordinator
//! keeps at most one [`WriteTicket`] outstanding, so writes run strictly in
//! submission order and never overlap.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::thread::{self, JoinHandle};

use tracing::{debug, info};

use crate::error::{CheckpointError, Result};
use crate::protocol::{WriteStrategy, write_atomic};
use crate::storage::FileSystem;

/// A serialized checkpoint waiting to be written.
struct WriteJob {
    path: PathBuf,
    bytes: Vec<u8>,
    strategy: WriteStrategy,
    log: bool,
    reply: Sender<Result<()>>,
}

enum Command {
    Write(WriteJob),
    Shutdown,
}

/// Handle to one in-flight write. Waiting on it yields the write's result.
#[derive(Debug)]
pub struct WriteTicket {
    path: PathBuf,
    reply: Receiver<Result<()>>,
}

impl WriteTicket {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until the write finished and return its outcome.
    pub fn wait(self) -> Result<()> {
        // A dropped reply sender means the worker died mid-job.
        self.reply.recv().map_err(|_| CheckpointError::WorkerPanicked)?
    }
}

/// Owned background thread executing checkpoint writes.
pub struct WriteWorker {
    commands: SyncSender<Command>,
    handle: Option<JoinHandle<()>>,
}

impl WriteWorker {
    pub fn spawn(fs: Arc<dyn FileSystem>) -> Result<Self> {
        // Capacity 1: the coordinator never queues more than one job.
        let (commands, rx) = mpsc::sync_channel(1);
        let handle = thread::Builder::new()
            .name("checkpoint-writer".to_string())
            .spawn(move || run(fs, rx))
            .map_err(|e| CheckpointError::io("spawning", "checkpoint-writer", e))?;

        debug!("Checkpoint writer started");
        Ok(Self {
            commands,
            handle: Some(handle),
        })
    }

    pub fn submit(
        &self,
        path: PathBuf,
        bytes: Vec<u8>,
        strategy: WriteStrategy,
        log: bool,
    ) -> Result<WriteTicket> {
        let (reply, rx) = mpsc::channel();
        let job = WriteJob {
            path: path.clone(),
            bytes,
            strategy,
            log,
            reply,
        };
        self.commands
            .send(Command::Write(job))
            .map_err(|_| CheckpointError::WorkerClosed)?;
        Ok(WriteTicket { path, reply: rx })
    }

    /// Stop the thread after it finished queued jobs.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        // Send fails only if the thread already exited; join reports why.
        let _ = self.commands.send(Command::Shutdown);
        handle.join().map_err(|_| CheckpointError::WorkerPanicked)?;
        debug!("Checkpoint writer stopped");
        Ok(())
    }
}

impl Drop for WriteWorker {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::error!("Checkpoint writer shutdown failed: {}", e);
        }
    }
}

fn run(fs: Arc<dyn FileSystem>, commands: Receiver<Command>) {
    for command in commands {
        match command {
            Command::Write(job) => {
                let result = write_atomic(&*fs, &job.path, &job.bytes, job.strategy);
                if job.log && result.is_ok() {
                    info!("Wrote checkpoint: {}", job.path.display());
                }
                // The ticket may have been dropped; nobody is left to tell.
                let _ = job.reply.send(result);
            }
            Command::Shutdown => break,
        }
    }
}
