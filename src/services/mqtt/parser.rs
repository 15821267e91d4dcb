//! Stateless decoding of inbound telemetry into typed sensor reports.

use tracing::{debug, warn};
use crate::config::DeviceSettings;
use crate::models::{DeviceStatus, ObservedPosition, ParsedMessage, SensorReport};

/// Decodes raw inbound publishes on the status topic.
///
/// A zero-length body is liveness traffic, not a sensor fact. A decoded body is only
/// turned into a report when its device id matches the configured sensor and its logical
/// value matches one of the configured sentinels; everything else is dropped, a malformed
/// body with a warning, an unrecognized value or foreign device silently. Nothing here is
/// ever fatal.
pub struct TelemetryParser {
    sensor_idx: u32,
    open_value: String,
    closed_value: String,
}

impl TelemetryParser {
    /// Creates a parser for the configured sensor device and sentinel values.
    pub fn new(device: &DeviceSettings) -> Self {
        TelemetryParser {
            sensor_idx: device.sensor_idx,
            open_value: device.open_value.clone(),
            closed_value: device.closed_value.clone(),
        }
    }

    /// Decodes one inbound message.
    ///
    /// # Returns
    ///
    /// * `Some(ParsedMessage::Heartbeat)` for a zero-length body
    /// * `Some(ParsedMessage::Report(..))` for a recognized sensor report
    /// * `None` for anything dropped
    pub fn parse(&self, topic: &str, payload: &[u8]) -> Option<ParsedMessage> {
        if payload.is_empty() {
            return Some(ParsedMessage::Heartbeat);
        }

        let status: DeviceStatus = match serde_json::from_slice(payload) {
            Ok(status) => status,
            Err(e) => {
                warn!("dropping malformed telemetry on {}: {}", topic, e);
                return None;
            }
        };

        if status.idx != self.sensor_idx {
            debug!("ignoring telemetry for foreign device {}", status.idx);
            return None;
        }

        let value = status.logical_value();
        let observed = if value == self.closed_value {
            ObservedPosition::Closed
        } else if value == self.open_value {
            ObservedPosition::Open
        } else {
            debug!("dropping unrecognized telemetry value {:?} for device {}", value, status.idx);
            return None;
        };

        Some(ParsedMessage::Report(SensorReport {
            device_idx: status.idx,
            observed,
        }))
    }
}
