/// # Garage Door Bridge Errors
/// This module defines the `GarageDoorError` enum, which encapsulates all potential errors that can occur within the garage door bridge.
/// The enum variants provide specific error types for the telemetry, bus and state-machine layers, facilitating clear error handling and reporting throughout the application.


use thiserror::Error;
use std::io;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::oneshot::error::RecvError;

#[derive(Error, Debug)]
pub enum GarageDoorError {
    /// The device has dropped off the bus; host-facing operations fail fast until liveness recovers.
    #[error("device unreachable")]
    Unreachable,

    /// Represents an inbound telemetry body that failed to decode. The message is dropped, never fatal.
    #[error("malformed telemetry: {0}")]
    MalformedTelemetry(String),

    /// Represents a decoded telemetry value matching neither configured sentinel.
    #[error("unrecognized telemetry value: {0}")]
    UnrecognizedValue(String),

    /// Represents an outbound command that could not be handed to the bus.
    /// Retry policy belongs to the transport layer, not to this crate.
    #[error("publish failure: {0}")]
    PublishFailure(String),

    /// Represents errors related to establishing or maintaining the broker connection.
    #[error("connection error: {0}")]
    ConnectionError(String),

    /// Represents errors arising from misconfigurations or invalid settings.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Represents errors occurring within the state management component.
    #[error("state management error: {0}")]
    StateError(String),

    /// Represents errors that occur during serialization or deserialization of data.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Represents standard input/output errors.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// Represents errors when sending data over a channel.
    #[error("channel send error: {0}")]
    ChannelSendError(String),

    /// Represents errors when receiving data from a channel.
    #[error("channel receive error: {0}")]
    ChannelRecvError(String),
}

impl<T> From<SendError<T>> for GarageDoorError {
    fn from(err: SendError<T>) -> Self {
        GarageDoorError::ChannelSendError(err.to_string())
    }
}

impl From<RecvError> for GarageDoorError {
    fn from(err: RecvError) -> Self {
        GarageDoorError::ChannelRecvError(err.to_string())
    }
}

impl From<config::ConfigError> for GarageDoorError {
    fn from(err: config::ConfigError) -> Self {
        GarageDoorError::ConfigError(err.to_string())
    }
}

impl From<rumqttc::ClientError> for GarageDoorError {
    fn from(err: rumqttc::ClientError) -> Self {
        GarageDoorError::PublishFailure(err.to_string())
    }
}

pub type GarageDoorResult<T> = Result<T, GarageDoorError>;
