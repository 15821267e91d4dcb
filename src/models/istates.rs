//! # Garage Door State Enums

//! This module defines the enums representing the logical states of the garage door.
//! These enums enable structured and type-safe representation of the door's position and of what caused it to change, enhancing code clarity and maintainability.

use std::fmt;
use serde::{Deserialize, Serialize};
use derive_more::FromStr;

/// Represents the logical states the garage door can be in.
#[derive(Debug, Clone, PartialEq, Eq, Copy, Serialize, Deserialize, FromStr)]
pub enum DoorState {
    /// The door rests fully open.
    Open,
    /// The door is travelling toward the open endpoint.
    Opening,
    /// The door is travelling toward the closed endpoint.
    Closing,
    /// The door rests fully closed.
    Closed,
    /// The door halted between its endpoint sensors; the physical position is indeterminate.
    Stopped,
}

impl DoorState {
    /// The transitional state entered while travelling toward `target`.
    pub fn transitional_toward(target: DoorState) -> DoorState {
        if target == DoorState::Open {
            DoorState::Opening
        } else {
            DoorState::Closing
        }
    }

    /// The resting state on the other side of this one.
    ///
    /// `Stopped` resolves to `Open`: a door that is not known to be closed is
    /// reconciled toward the open side.
    pub fn opposite(self) -> DoorState {
        match self {
            DoorState::Open | DoorState::Opening => DoorState::Closed,
            DoorState::Closed | DoorState::Closing | DoorState::Stopped => DoorState::Open,
        }
    }

    /// Whether this is one of the two resting endpoint states.
    pub fn is_resting(self) -> bool {
        matches!(self, DoorState::Open | DoorState::Closed)
    }
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DoorState::Open => "OPEN",
            DoorState::Opening => "OPENING",
            DoorState::Closing => "CLOSING",
            DoorState::Closed => "CLOSED",
            DoorState::Stopped => "STOPPED",
        };
        write!(f, "{}", name)
    }
}

/// Represents what triggered a door state transition.
#[derive(Debug, Clone, PartialEq, Eq, Copy, Serialize, Deserialize)]
pub enum TransitionCause {
    /// A decoded sensor report drove the transition.
    SensorUpdate,
    /// The travel timer expired.
    Timeout,
    /// The automation host requested a new target.
    UserCommand,
}
