//! Command sequencer
//!
//! A single named worker thread drains an unbounded FIFO and applies each
//! command to the coordinator, one at a time, in submission order.
//! Producers never block, so request handlers stay responsive while a remote
//! call takes hundreds of milliseconds.
//!
//! The queue has no bound and commands have no timeout: a hung backend call
//! delays every command behind it.

use crate::playback::{lock_coordinator, Command, SharedCoordinator};
use std::panic::AssertUnwindSafe;
use std::sync::{mpsc as std_mpsc, Mutex};
use std::thread::JoinHandle;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("command queue is closed")]
pub struct QueueClosed;

enum Job {
    Run(Command),
    /// Signals once every earlier job has been applied
    Flush(std_mpsc::Sender<()>),
    Shutdown,
}

pub struct SequencerHandle {
    tx: mpsc::UnboundedSender<Job>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SequencerHandle {
    /// Start the `playback-sequencer` worker thread.
    pub fn spawn(coordinator: SharedCoordinator) -> std::io::Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();

        let worker = std::thread::Builder::new()
            .name("playback-sequencer".to_string())
            .spawn(move || {
                info!("Playback sequencer started");
                while let Some(job) = rx.blocking_recv() {
                    match job {
                        Job::Run(command) => run_command(&coordinator, command),
                        Job::Flush(done) => {
                            let _ = done.send(());
                        }
                        Job::Shutdown => break,
                    }
                }
                info!("Playback sequencer stopped");
            })?;

        Ok(Self {
            tx,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Enqueue a command without waiting for it to run.
    pub fn submit(&self, command: Command) -> Result<(), QueueClosed> {
        debug!("Enqueue {} command", command.name());
        self.tx.send(Job::Run(command)).map_err(|_| QueueClosed)
    }

    /// Block until every command submitted so far has been applied.
    ///
    /// Not for use on an async runtime thread.
    pub fn flush(&self) -> Result<(), QueueClosed> {
        let (done_tx, done_rx) = std_mpsc::channel();
        self.tx.send(Job::Flush(done_tx)).map_err(|_| QueueClosed)?;
        done_rx.recv().map_err(|_| QueueClosed)
    }

    /// Queue a final stop, close the queue and join the worker.
    ///
    /// Commands submitted earlier still run. Later submissions fail with
    /// [`QueueClosed`]. Safe to call more than once.
    pub fn shutdown(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(worker) = worker else {
            return;
        };
        let _ = self.tx.send(Job::Run(Command::Stop));
        let _ = self.tx.send(Job::Shutdown);
        if worker.join().is_err() {
            error!("Playback sequencer thread panicked");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }
}

impl Drop for SequencerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Apply one command. A panic is logged and swallowed so the worker survives
/// to run the next command.
fn run_command(coordinator: &SharedCoordinator, command: Command) {
    let name = command.name();
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        lock_coordinator(coordinator).apply(command);
    }));
    if let Err(panic) = result {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        error!("{} command panicked: {}", name, message);
    }
}
