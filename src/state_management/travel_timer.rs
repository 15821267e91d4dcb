//! The travel timer: a cancellable, single-shot countdown for the door's mechanical travel window.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use crate::state_management::command_processor::DoorCommand;

/// A single-shot countdown representing the door's travel duration.
///
/// At most one timer is outstanding per door: arming cancels the previous one first. A
/// fired timer reports back through the same command mailbox as every other mutation,
/// carrying the generation it was armed with; the processor discards generations that have
/// since been superseded, so a timeout that raced its own cancellation never reaches the
/// state machine.
#[derive(Debug, Default)]
pub struct TravelTimer {
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl TravelTimer {
    /// Creates an unarmed timer.
    pub fn new() -> Self {
        TravelTimer {
            handle: None,
            generation: 0,
        }
    }

    /// Arms the timer, cancelling any previously armed one.
    ///
    /// After `duration` the spawned task enqueues `DoorCommand::TravelTimeout` on
    /// `commands`, tagged with the generation returned here.
    pub fn arm(&mut self, duration: Duration, commands: mpsc::Sender<DoorCommand>) -> u64 {
        self.cancel();
        let generation = self.generation;
        debug!("arming travel timer for {:?} (generation {})", duration, generation);
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = commands.send(DoorCommand::TravelTimeout { generation }).await;
        }));
        generation
    }

    /// Cancels the outstanding timer, if any. Idempotent.
    ///
    /// The generation advances even when a fired task already enqueued its timeout, which
    /// is what invalidates that in-flight message.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.generation += 1;
    }

    /// The generation the next `arm` call will use, i.e. the only generation currently
    /// accepted as live.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `generation` identifies the currently armed timer.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Whether a timer task is armed and has not yet fired.
    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }
}
