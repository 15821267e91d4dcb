//! Outbound actuator command dispatch.

use std::sync::Arc;
use tracing::info;
use crate::config::Settings;
use crate::errors::GarageDoorResult;
use crate::models::{DeviceInfoRequest, SwitchCommand};
use crate::services::mqtt::MessageBus;

/// Translates a requested target transition into exactly one outbound command publish.
///
/// Each dispatch method publishes a single message and returns immediately; a publish
/// failure is surfaced to the caller and never retried here, since retry policy belongs to
/// the transport layer. The dispatcher is only invoked for user-initiated transitions;
/// reconciliation reads resynchronize state without re-issuing commands, which is what
/// prevents command echo loops.
pub struct CommandDispatcher {
    bus: Arc<dyn MessageBus>,
    command_topic: String,
    switch_idx: u32,
    sensor_idx: u32,
    open_command: String,
    close_command: String,
}

impl CommandDispatcher {
    /// Creates a new `CommandDispatcher` publishing on the configured command topic.
    pub fn new(settings: &Settings, bus: Arc<dyn MessageBus>) -> Self {
        CommandDispatcher {
            bus,
            command_topic: settings.broker.command_topic.clone(),
            switch_idx: settings.device.switch_idx,
            sensor_idx: settings.device.sensor_idx,
            open_command: settings.device.open_command.clone(),
            close_command: settings.device.close_command.clone(),
        }
    }

    /// Publishes the deployment-configured open command for the switch device.
    pub async fn dispatch_open(&self) -> GarageDoorResult<()> {
        info!("Triggering garage door command: open");
        self.switchlight(&self.open_command).await
    }

    /// Publishes the deployment-configured close command for the switch device.
    pub async fn dispatch_close(&self) -> GarageDoorResult<()> {
        info!("Triggering garage door command: close");
        self.switchlight(&self.close_command).await
    }

    /// Publishes a `getdeviceinfo` poll for the sensor device.
    pub async fn poll_device_status(&self) -> GarageDoorResult<()> {
        let body = serde_json::to_string(&DeviceInfoRequest {
            command: "getdeviceinfo",
            idx: self.sensor_idx,
        })?;
        self.bus.publish(&self.command_topic, body).await
    }

    async fn switchlight(&self, switchcmd: &str) -> GarageDoorResult<()> {
        let body = serde_json::to_string(&SwitchCommand {
            command: "switchlight",
            idx: self.switch_idx,
            switchcmd,
        })?;
        self.bus.publish(&self.command_topic, body).await
    }
}
