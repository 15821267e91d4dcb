pub mod mqtt;

pub use mqtt::{BusListener, MessageBus, MqttBus, TelemetryParser};
