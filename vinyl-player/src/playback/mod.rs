//! Playback coordination
//!
//! - [`Command`]: what clients ask for
//! - [`SequencerHandle`]: ordered, single-consumer execution of commands
//! - [`Coordinator`]: the state machine over the two backends
//! - [`monitor`]: per-connection natural-finish polling

pub mod command;
pub mod coordinator;
pub mod monitor;
pub mod sequencer;

pub use command::Command;
pub use coordinator::{Coordinator, Transport};
pub use monitor::{start_monitoring, MonitorGuard};
pub use sequencer::{QueueClosed, SequencerHandle};

use std::sync::{Arc, Mutex, MutexGuard};

/// Coordinator shared between the sequencer thread and status readers
pub type SharedCoordinator = Arc<Mutex<Coordinator>>;

/// Lock the coordinator, recovering from a poisoned lock.
///
/// A panic inside one command must not stop playback control for good.
pub fn lock_coordinator(coordinator: &SharedCoordinator) -> MutexGuard<'_, Coordinator> {
    coordinator.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
