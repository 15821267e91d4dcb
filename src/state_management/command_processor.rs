//! The command mailbox serializing every mutation of the door state machine.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};
use crate::errors::{GarageDoorError, GarageDoorResult};
use crate::models::{DoorState, SensorReport};
use crate::state_management::state_machine::DoorStateMachine;

/// Represents the different commands that can be processed by the `CommandProcessor`.
///
/// Host-facing operations carry a oneshot responder; bus- and timer-originated commands are
/// fire-and-forget. The reachability gate lives here: gated host operations fail fast with
/// `Unreachable` while device liveness is lost.
#[derive(Debug)]
pub enum DoorCommand {
    SetTargetState(DoorState, oneshot::Sender<GarageDoorResult<()>>),
    GetCurrentState(oneshot::Sender<GarageDoorResult<DoorState>>),
    GetTargetState(oneshot::Sender<GarageDoorResult<DoorState>>),
    GetObstructionDetected(oneshot::Sender<GarageDoorResult<bool>>),
    SensorMessage(SensorReport),
    TravelTimeout { generation: u64 },
    SetReachable(bool),
}

/// Processes commands for a single door.
///
/// The processor task is the sole owner of the `DoorStateMachine`; running commands off one
/// mailbox is what serializes the three entry points (sensor updates, travel timeouts, host
/// calls) that arrive from independent sources.
pub struct CommandProcessor {
    command_receiver: mpsc::Receiver<DoorCommand>,
    machine: DoorStateMachine,
}

impl CommandProcessor {
    /// Creates a new `CommandProcessor` over the given mailbox and machine.
    pub fn new(command_receiver: mpsc::Receiver<DoorCommand>, machine: DoorStateMachine) -> Self {
        Self {
            command_receiver,
            machine,
        }
    }

    /// Runs the command processing loop until the mailbox closes.
    ///
    /// A failed oneshot response (the caller gave up waiting) is logged and does not stop
    /// the loop.
    pub async fn run(&mut self) -> GarageDoorResult<()> {
        while let Some(command) = self.command_receiver.recv().await {
            if let Err(e) = self.process_command(command).await {
                error!("Error processing command: {:?}", e);
            }
        }
        Ok(())
    }

    async fn process_command(&mut self, command: DoorCommand) -> GarageDoorResult<()> {
        match command {
            DoorCommand::SetTargetState(target, response_sender) => {
                let result = if self.machine.is_reachable() {
                    self.machine.set_target(target, true).await
                } else {
                    Err(GarageDoorError::Unreachable)
                };
                response_sender.send(result).map_err(|_| {
                    GarageDoorError::ChannelSendError("Failed to send SetTargetState response".to_string())
                })?;
            }
            DoorCommand::GetCurrentState(response_sender) => {
                let result = if self.machine.is_reachable() {
                    Ok(self.machine.current_state_with_poll().await)
                } else {
                    Err(GarageDoorError::Unreachable)
                };
                response_sender.send(result).map_err(|_| {
                    GarageDoorError::ChannelSendError("Failed to send GetCurrentState response".to_string())
                })?;
            }
            DoorCommand::GetTargetState(response_sender) => {
                response_sender.send(Ok(self.machine.host_target_state())).map_err(|_| {
                    GarageDoorError::ChannelSendError("Failed to send GetTargetState response".to_string())
                })?;
            }
            DoorCommand::GetObstructionDetected(response_sender) => {
                let result = if self.machine.is_reachable() {
                    Ok(self.machine.obstruction_detected())
                } else {
                    Err(GarageDoorError::Unreachable)
                };
                response_sender.send(result).map_err(|_| {
                    GarageDoorError::ChannelSendError("Failed to send GetObstructionDetected response".to_string())
                })?;
            }
            DoorCommand::SensorMessage(report) => {
                // Any recognized report proves the device alive.
                self.machine.set_reachable(true).await;
                if let Err(e) = self.machine.on_sensor_update(&report).await {
                    error!("Error processing sensor report: {:?}", e);
                }
            }
            DoorCommand::TravelTimeout { generation } => {
                if self.machine.timer_is_current(generation) && self.machine.is_running() {
                    self.machine.on_timeout().await;
                } else {
                    debug!("discarding stale travel timeout (generation {})", generation);
                }
            }
            DoorCommand::SetReachable(reachable) => {
                self.machine.set_reachable(reachable).await;
            }
        }
        Ok(())
    }
}
