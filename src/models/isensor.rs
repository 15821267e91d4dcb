//! # Door Sensor Representation

//! This module defines the `SensorTracker`, which holds the two latched boolean facts the
//! telemetry reports about the door (`closed`, `open`), together with the `SensorFact` input
//! type and the `SensorEvaluation` result of latching one.
//!
//! The two facts are independent by construction: both true and both false are legal latch
//! states and represent physical anomalies that the obstruction logic acts on.

use serde::{Deserialize, Serialize};

/// One individually settable sensor fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorFact {
    /// The closed-contact reading.
    Closed(bool),
    /// The open-contact reading.
    Open(bool),
}

/// Represents the result of latching a sensor fact
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SensorEvaluation {
    /// Indicates whether at least one latch actually flipped
    pub changed: bool,
    /// The closed latch after the update
    pub closed: bool,
    /// The open latch after the update
    pub open: bool,
}

/// Holds the latched sensor facts for a single door.
///
/// Policy: single-sensor deployments (`dual_sensor == false`) infer the complement on every
/// latch write (`closed := !open` and vice versa). Dual-wired deployments perform no
/// inference, so the two latches may disagree and that disagreement is allowed to surface
/// as an obstruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorTracker {
    closed: bool,
    open: bool,
    dual_sensor: bool,
}

impl SensorTracker {
    /// Creates a new tracker assuming the door is closed on cold start.
    pub fn new(dual_sensor: bool) -> Self {
        SensorTracker {
            closed: true,
            open: false,
            dual_sensor,
        }
    }

    /// Latches the given fact and reports whether a latch flipped.
    pub fn update(&mut self, fact: SensorFact) -> SensorEvaluation {
        let (old_closed, old_open) = (self.closed, self.open);
        match fact {
            SensorFact::Closed(value) => {
                self.closed = value;
                if !self.dual_sensor {
                    self.open = !value;
                }
            }
            SensorFact::Open(value) => {
                self.open = value;
                if !self.dual_sensor {
                    self.closed = !value;
                }
            }
        }
        SensorEvaluation {
            changed: self.closed != old_closed || self.open != old_open,
            closed: self.closed,
            open: self.open,
        }
    }

    /// The latched closed-contact fact.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The latched open-contact fact.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Whether independent closed- and open-sensors are wired.
    pub fn is_dual_sensor(&self) -> bool {
        self.dual_sensor
    }
}
