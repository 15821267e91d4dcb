pub mod bus;
pub mod listener;
pub mod parser;

pub use bus::{MessageBus, MqttBus};
pub use listener::BusListener;
pub use parser::TelemetryParser;
