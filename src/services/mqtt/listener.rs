//! The inbound side of the bus: event loop polling, subscriptions and message routing.

use std::sync::Arc;
use std::time::Duration;
use rumqttc::{Event, EventLoop, Packet, Publish};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use crate::config::Settings;
use crate::models::{ParsedMessage, SensorReport};
use crate::services::mqtt::bus::MqttBus;
use crate::services::mqtt::parser::TelemetryParser;
use crate::state_management::command_processor::DoorCommand;

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Drives the broker event loop and routes inbound traffic into the command mailbox.
///
/// Subscriptions are re-established on every ConnAck, so a broker reconnect cannot leave
/// the bridge deaf. The listener caches the last decoded sensor report: a zero-length
/// heartbeat body replays it, keeping the reconciliation path alive across liveness-only
/// traffic.
pub struct BusListener {
    bus: Arc<MqttBus>,
    eventloop: EventLoop,
    parser: TelemetryParser,
    command_sender: mpsc::Sender<DoorCommand>,
    status_topic: String,
    liveness_topic: Option<String>,
    offline_payload: String,
    last_report: Option<SensorReport>,
}

impl BusListener {
    /// Creates a new `BusListener` over the given event loop.
    pub fn new(
        settings: &Settings,
        bus: Arc<MqttBus>,
        eventloop: EventLoop,
        command_sender: mpsc::Sender<DoorCommand>,
    ) -> Self {
        BusListener {
            bus,
            eventloop,
            parser: TelemetryParser::new(&settings.device),
            command_sender,
            status_topic: settings.broker.status_topic.clone(),
            liveness_topic: settings.broker.liveness_topic.clone(),
            offline_payload: settings.broker.offline_payload.clone(),
            last_report: None,
        }
    }

    /// Polls the broker session until the command mailbox closes.
    pub async fn run(mut self) {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("Connected to broker, subscribing to topics");
                    self.subscribe_all().await;
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    if self.command_sender.is_closed() {
                        info!("command mailbox closed, stopping bus listener");
                        return;
                    }
                    self.route(publish).await;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("broker connection error: {}, retrying in {:?}", e, RECONNECT_DELAY);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }

    async fn subscribe_all(&mut self) {
        if let Err(e) = self.bus.subscribe(&self.status_topic).await {
            error!("{}", e);
        }
        if let Some(liveness_topic) = &self.liveness_topic {
            if let Err(e) = self.bus.subscribe(liveness_topic).await {
                error!("{}", e);
            }
        }
    }

    async fn route(&mut self, publish: Publish) {
        let topic = publish.topic.as_str();

        if Some(topic) == self.liveness_topic.as_deref() {
            let offline = publish.payload.as_ref() == self.offline_payload.as_bytes();
            self.send(DoorCommand::SetReachable(!offline)).await;
            return;
        }

        if topic != self.status_topic {
            debug!("ignoring publish on unexpected topic {}", topic);
            return;
        }

        match self.parser.parse(topic, publish.payload.as_ref()) {
            Some(ParsedMessage::Report(report)) => {
                self.last_report = Some(report.clone());
                self.send(DoorCommand::SensorMessage(report)).await;
            }
            Some(ParsedMessage::Heartbeat) => {
                if let Some(report) = self.last_report.clone() {
                    debug!("replaying cached sensor report for transport heartbeat");
                    self.send(DoorCommand::SensorMessage(report)).await;
                }
            }
            None => {}
        }
    }

    async fn send(&mut self, command: DoorCommand) {
        if let Err(e) = self.command_sender.send(command).await {
            error!("failed to enqueue door command: {}", e);
        }
    }
}
