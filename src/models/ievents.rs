//! # Garage Door Event Definitions

//! This module defines the `DoorEvent` enum and its associated structs, which represent the observable changes
//! the reconciliation core reports to the host boundary: current-state transitions, target resynchronizations,
//! obstruction flag updates and device reachability changes.


use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use crate::models::istates::{DoorState, TransitionCause};

/// Represents the different events emitted at the host boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DoorEvent {
    /// Event indicating that the door's current state has changed
    CurrentStateChanged(CurrentStateChangedEvent),
    /// Event indicating that the door's target state has changed
    TargetStateChanged(TargetStateChangedEvent),
    /// Event indicating that the obstruction flag was updated
    ObstructionChanged(ObstructionChangedEvent),
    /// Event indicating that device reachability changed
    ReachabilityChanged(ReachabilityChangedEvent),
}

impl DoorEvent {
    /// Retrieves the timestamp of the event
    pub fn timestamp(&self) -> NaiveDateTime {
        match self {
            DoorEvent::CurrentStateChanged(e) => e.timestamp,
            DoorEvent::TargetStateChanged(e) => e.timestamp,
            DoorEvent::ObstructionChanged(e) => e.timestamp,
            DoorEvent::ReachabilityChanged(e) => e.timestamp,
        }
    }
}

/// Represents an event where the door's current state has changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentStateChangedEvent {
    /// The previous current state
    pub old_state: DoorState,
    /// The new current state
    pub new_state: DoorState,
    /// What triggered the transition
    pub cause: TransitionCause,
    /// The timestamp when the state changed
    pub timestamp: NaiveDateTime,
}

/// Represents an event where the door's target state has changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetStateChangedEvent {
    /// The previous target state
    pub old_state: DoorState,
    /// The new target state
    pub new_state: DoorState,
    /// The timestamp when the target changed
    pub timestamp: NaiveDateTime,
}

/// Represents an update of the externally observable obstruction flag.
///
/// Emitted on every flag write, matching the downstream characteristic that is
/// re-published even when the value did not move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstructionChangedEvent {
    /// Whether an obstruction is currently detected
    pub detected: bool,
    /// The timestamp of the flag update
    pub timestamp: NaiveDateTime,
}

/// Represents an event where device reachability changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReachabilityChangedEvent {
    /// Whether the device is now considered reachable
    pub reachable: bool,
    /// The timestamp when reachability changed
    pub timestamp: NaiveDateTime,
}
