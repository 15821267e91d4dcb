//! The MQTT message bus: the publish seam of the bridge and its rumqttc-backed implementation.

use std::sync::Arc;
use async_trait::async_trait;
use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use secrecy::ExposeSecret;
use crate::config::BrokerSettings;
use crate::errors::{GarageDoorError, GarageDoorResult};

/// The outbound side of the message bus.
///
/// The reconciliation core publishes through this trait only, which keeps the transport
/// swappable and lets tests record commands instead of sending them.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publishes one message and returns once it is handed to the transport.
    async fn publish(&self, topic: &str, payload: String) -> GarageDoorResult<()>;
}

/// The rumqttc-backed bus.
///
/// Publishes at QoS 0, matching the fire-and-forget semantics of the actuator controller;
/// delivery retries belong to the transport layer, not to callers.
pub struct MqttBus {
    client: AsyncClient,
}

impl MqttBus {
    /// Builds the broker session from the settings and returns the bus together with the
    /// event loop the `BusListener` drives.
    pub fn connect(settings: &BrokerSettings) -> GarageDoorResult<(Arc<Self>, EventLoop)> {
        let (host, port) = settings.endpoint()?;
        let mut options = MqttOptions::new(settings.client_id.clone(), host, port);
        options.set_keep_alive(settings.keep_alive());
        if let Some(username) = &settings.username {
            let password = settings
                .password
                .as_ref()
                .map(|p| p.expose_secret().clone())
                .unwrap_or_default();
            options.set_credentials(username.clone(), password);
        }

        let (client, eventloop) = AsyncClient::new(options, 64);
        Ok((Arc::new(MqttBus { client }), eventloop))
    }

    /// Subscribes to `topic` at QoS 0.
    pub async fn subscribe(&self, topic: &str) -> GarageDoorResult<()> {
        self.client
            .subscribe(topic, QoS::AtMostOnce)
            .await
            .map_err(|e| GarageDoorError::ConnectionError(format!("subscribe {} failed: {}", topic, e)))
    }
}

#[async_trait]
impl MessageBus for MqttBus {
    async fn publish(&self, topic: &str, payload: String) -> GarageDoorResult<()> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await
            .map_err(GarageDoorError::from)
    }
}
