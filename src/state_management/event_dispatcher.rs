use tokio::sync::mpsc;
use tracing::{debug, error};
use crate::errors::{GarageDoorError, GarageDoorResult};
use crate::models::DoorEvent;

/// Forwards door events to the host boundary.
///
/// The host integration layer consumes the receiving end of the channel; the reconciliation
/// core never blocks on it beyond the channel's buffering.
pub struct EventDispatcher {
    /// The sender end of the host-boundary event channel.
    event_sender: mpsc::Sender<DoorEvent>,
}

impl EventDispatcher {
    /// Creates a new `EventDispatcher`.
    pub fn new(event_sender: mpsc::Sender<DoorEvent>) -> Self {
        Self { event_sender }
    }

    /// Dispatches an event to the host boundary.
    ///
    /// # Returns
    ///
    /// A `GarageDoorResult` indicating success or failure of the dispatch operation.
    pub async fn dispatch_event(&self, event: DoorEvent) -> GarageDoorResult<()> {
        debug!("Dispatching event: {:?}", event);
        self.event_sender.send(event).await.map_err(|e| {
            error!("Failed to dispatch event: {:?}", e);
            GarageDoorError::ChannelSendError(format!("Failed to dispatch event: {}", e))
        })
    }

    /// Checks if the event channel is still open and able to send events.
    pub fn is_channel_open(&self) -> bool {
        !self.event_sender.is_closed()
    }
}
