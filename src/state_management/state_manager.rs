use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::sync::mpsc::Receiver;
use tracing::{error, info};
use crate::config::Settings;
use crate::errors::GarageDoorResult;
use crate::models::{DoorEvent, DoorState};
use crate::services::mqtt::MessageBus;
use crate::state_management::command_processor::{CommandProcessor, DoorCommand};
use crate::state_management::event_dispatcher::EventDispatcher;
use crate::state_management::state_machine::DoorStateMachine;

/// Manages the overall state of the garage door bridge.
///
/// The manager wires the door state machine into its command mailbox and exposes async
/// round-trip methods over that mailbox; the returned receiver carries the door events the
/// host boundary consumes.
#[derive(Clone)]
pub struct GarageDoorStateManager {
    command_sender: mpsc::Sender<DoorCommand>,
    processor: Arc<Mutex<CommandProcessor>>,
}

impl GarageDoorStateManager {
    /// Creates a new `GarageDoorStateManager`.
    ///
    /// # Arguments
    ///
    /// * `settings` - The application settings.
    /// * `bus` - The message bus outbound commands are published on.
    ///
    /// # Returns
    ///
    /// The manager together with the host-boundary event receiver.
    pub fn new(settings: &Settings, bus: Arc<dyn MessageBus>) -> (Self, Receiver<DoorEvent>) {
        let (command_sender, command_receiver) = mpsc::channel(100);
        let (event_sender, event_receiver) = mpsc::channel(1000);

        let event_dispatcher = EventDispatcher::new(event_sender);
        let machine = DoorStateMachine::new(settings, bus, event_dispatcher, command_sender.clone());
        let processor = Arc::new(Mutex::new(CommandProcessor::new(command_receiver, machine)));

        (
            Self {
                command_sender,
                processor,
            },
            event_receiver,
        )
    }

    /// Runs the command processing loop until the mailbox closes.
    pub async fn run(&self) {
        info!("Starting GarageDoorStateManager");
        if let Err(e) = self.processor.lock().await.run().await {
            error!("Error in command processor: {:?}", e);
        }
        info!("GarageDoorStateManager stopped");
    }

    /// A sender handle onto the command mailbox, for the bus listener and timers.
    pub fn command_sender(&self) -> mpsc::Sender<DoorCommand> {
        self.command_sender.clone()
    }

    /// Requests a user-initiated transition toward `target`.
    pub async fn set_target_state(&self, target: DoorState) -> GarageDoorResult<()> {
        let (response_sender, response_receiver) = oneshot::channel();
        self.command_sender
            .send(DoorCommand::SetTargetState(target, response_sender))
            .await?;
        response_receiver.await?
    }

    /// The door's current state; triggers a device status poll as a side effect.
    pub async fn current_state(&self) -> GarageDoorResult<DoorState> {
        let (response_sender, response_receiver) = oneshot::channel();
        self.command_sender
            .send(DoorCommand::GetCurrentState(response_sender))
            .await?;
        response_receiver.await?
    }

    /// The door's target state as the host sees it.
    pub async fn target_state(&self) -> GarageDoorResult<DoorState> {
        let (response_sender, response_receiver) = oneshot::channel();
        self.command_sender
            .send(DoorCommand::GetTargetState(response_sender))
            .await?;
        response_receiver.await?
    }

    /// Whether an obstruction is currently detected.
    pub async fn obstruction_detected(&self) -> GarageDoorResult<bool> {
        let (response_sender, response_receiver) = oneshot::channel();
        self.command_sender
            .send(DoorCommand::GetObstructionDetected(response_sender))
            .await?;
        response_receiver.await?
    }
}
