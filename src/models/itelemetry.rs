//! # Telemetry Wire Models

//! This module defines the JSON bodies exchanged with the actuator controller over the bus:
//! the inbound `DeviceStatus` telemetry payload and the outbound `SwitchCommand` /
//! `DeviceInfoRequest` command payloads, plus the typed forms the parser produces from
//! inbound traffic.

use serde::{Deserialize, Serialize};
use crate::models::istates::DoorState;

/// Represents an inbound telemetry body as published by the actuator controller.
///
/// Fields beyond `idx` and `nvalue` are present on the wire but carry nothing this bridge
/// consumes; serde ignores them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceStatus {
    /// The device id the reading belongs to
    pub idx: u32,
    /// The numeric device value: 0 maps to "Off", 1 maps to "On"
    #[serde(default)]
    pub nvalue: Option<i64>,
}

impl DeviceStatus {
    /// Maps the numeric device value onto its logical string form.
    ///
    /// `0` becomes `"Off"`, `1` becomes `"On"`; any other value is rendered as its decimal
    /// form, the application-defined device value.
    pub fn logical_value(&self) -> String {
        match self.nvalue {
            Some(0) => "Off".to_string(),
            Some(1) => "On".to_string(),
            Some(n) => n.to_string(),
            None => String::new(),
        }
    }
}

/// The endpoint position a recognized sensor report announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservedPosition {
    Open,
    Closed,
}

impl ObservedPosition {
    /// The door state this observation corresponds to.
    pub fn as_door_state(self) -> DoorState {
        match self {
            ObservedPosition::Open => DoorState::Open,
            ObservedPosition::Closed => DoorState::Closed,
        }
    }
}

/// A decoded sensor report for the configured sensor device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorReport {
    /// The device id that produced the reading
    pub device_idx: u32,
    /// The endpoint position the reading announces
    pub observed: ObservedPosition,
}

/// The typed result of decoding one inbound publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParsedMessage {
    /// A recognized sensor report
    Report(SensorReport),
    /// A zero-length body: liveness traffic on the subscribed topic, no sensor fact
    Heartbeat,
}

/// The outbound `switchlight` command body.
#[derive(Debug, Serialize)]
pub struct SwitchCommand<'a> {
    pub command: &'a str,
    pub idx: u32,
    pub switchcmd: &'a str,
}

/// The outbound `getdeviceinfo` poll body.
#[derive(Debug, Serialize)]
pub struct DeviceInfoRequest {
    pub command: &'static str,
    pub idx: u32,
}
