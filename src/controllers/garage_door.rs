//! # Garage Door Controller

//! This module defines the `GarageDoorController`, the host-facing surface of the bridge.
//! An automation host integration consumes exactly these four operations; everything else
//! it needs arrives through the door event channel.

use std::sync::Arc;
use crate::errors::{GarageDoorError, GarageDoorResult};
use crate::models::DoorState;
use crate::state_management::GarageDoorStateManager;

/// The host-facing contract of the bridge.
///
/// `get_current_state`, `set_target_state` and `get_obstruction_detected` fail fast with
/// `Unreachable` while device liveness is lost; `get_target_state` always answers, with
/// `Closed` forced on the very first read after startup.
pub struct GarageDoorController {
    state_manager: Arc<GarageDoorStateManager>,
}

impl GarageDoorController {
    /// Creates a new `GarageDoorController`.
    pub fn new(state_manager: Arc<GarageDoorStateManager>) -> Self {
        GarageDoorController { state_manager }
    }

    /// The door's current state. Side effect: publishes one device status poll.
    pub async fn get_current_state(&self) -> GarageDoorResult<DoorState> {
        self.state_manager.current_state().await
    }

    /// The door's target state as the host should display it.
    pub async fn get_target_state(&self) -> GarageDoorResult<DoorState> {
        self.state_manager.target_state().await
    }

    /// Requests a user-initiated transition. Only the two resting states are valid
    /// targets.
    pub async fn set_target_state(&self, target: DoorState) -> GarageDoorResult<()> {
        if !target.is_resting() {
            return Err(GarageDoorError::StateError(format!(
                "invalid target state {}",
                target
            )));
        }
        self.state_manager.set_target_state(target).await
    }

    /// Whether an obstruction is currently detected.
    pub async fn get_obstruction_detected(&self) -> GarageDoorResult<bool> {
        self.state_manager.obstruction_detected().await
    }
}
