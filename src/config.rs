//! # Configuration Management

//! This module handles the configuration loading and management for the garage door bridge.
//! It leverages the `config` crate to provide a flexible and structured way to define and access configuration settings from various sources, including:

//! * YAML configuration files (default.yaml, development.yaml, production.yaml)
//! * Environment variables

//! The core of this module is the `Settings` struct, which encapsulates all the configuration settings required by the application.

use serde::Deserialize;
use config::{Config, Environment, File};
use std::{env, fmt};
use std::path::PathBuf;
use std::time::Duration;
use secrecy::Secret;
use log::debug;
use url::Url;
use crate::errors::GarageDoorError;

/// Represents the complete set of configuration settings for the garage door bridge.
/// It's populated by reading from various configuration sources and provides convenient access to the settings throughout the application.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Settings for connecting to the MQTT broker
    pub broker: BrokerSettings,
    /// Identifiers and command tokens of the downstream actuator controller
    pub device: DeviceSettings,
    /// Physical behavior of the door mechanism
    pub door: DoorSettings,
    /// Settings for application logging
    pub logging: LoggingSettings,
}

/// Holds the configuration settings required to establish a connection to the MQTT broker
/// and the topics the bridge exchanges messages on.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    /// The broker URL, e.g. `mqtt://192.168.1.10:1883`
    pub url: String,
    /// The username for broker authentication (optional)
    pub username: Option<String>,
    /// The password for broker authentication (optional)
    #[serde(default, deserialize_with = "deserialize_optional_secret")]
    pub password: Option<Secret<String>>,
    /// The MQTT client identifier presented to the broker
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// The keep-alive interval of the broker session, in seconds
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// The topic outbound actuator commands are published on
    #[serde(default = "default_command_topic")]
    pub command_topic: String,
    /// The topic inbound device telemetry is subscribed on
    #[serde(default = "default_status_topic")]
    pub status_topic: String,
    /// The topic carrying the device liveness announcement (optional).
    /// When configured, the device starts out unreachable until traffic proves it alive.
    pub liveness_topic: Option<String>,
    /// The liveness payload that marks the device unreachable
    #[serde(default = "default_offline_payload")]
    pub offline_payload: String,
}

impl BrokerSettings {
    /// Parses the configured broker URL into a `(host, port)` endpoint.
    ///
    /// The port defaults to 1883 when the URL does not carry one.
    ///
    /// # Returns
    ///
    /// * `Ok((host, port))` if the URL is well formed
    /// * `Err(GarageDoorError::ConfigError)` otherwise
    pub fn endpoint(&self) -> Result<(String, u16), GarageDoorError> {
        let url = Url::parse(&self.url)
            .map_err(|e| GarageDoorError::ConfigError(format!("invalid broker url {}: {}", self.url, e)))?;
        let host = url.host_str()
            .ok_or_else(|| GarageDoorError::ConfigError(format!("broker url {} has no host", self.url)))?
            .to_string();
        let port = url.port().unwrap_or(1883);
        Ok((host, port))
    }

    /// The keep-alive interval as a `Duration`.
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

/// Identifies the switch and sensor devices of the actuator controller and the
/// deployment-configured opaque tokens it understands.
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceSettings {
    /// The device id of the open/close switch
    pub switch_idx: u32,
    /// The device id of the open/close sensor
    pub sensor_idx: u32,
    /// The telemetry value string meaning "open" for this deployment
    #[serde(default = "default_open_value")]
    pub open_value: String,
    /// The telemetry value string meaning "closed" for this deployment
    #[serde(default = "default_closed_value")]
    pub closed_value: String,
    /// The switch command token that opens the door
    pub open_command: String,
    /// The switch command token that closes the door
    pub close_command: String,
}

/// Physical behavior of the door mechanism.
#[derive(Debug, Deserialize, Clone)]
pub struct DoorSettings {
    /// The time budget the door mechanism is expected to take to fully open or close, in seconds
    #[serde(default = "default_travel_secs")]
    pub travel_secs: u64,
    /// Whether independent closed- and open-sensors are wired.
    /// Single-sensor deployments (the default) infer the complement latch on every update.
    #[serde(default)]
    pub dual_sensor: bool,
}

impl DoorSettings {
    /// The travel duration as a `Duration`.
    pub fn travel_duration(&self) -> Duration {
        Duration::from_secs(self.travel_secs)
    }
}

/// Holds the configuration settings for application logging
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    /// The logging level (e.g., "info", "debug", "error")
    pub level: String,
    /// The name of the log file (optional)
    pub file: Option<String>,
    /// The directory path where log files will be stored (optional)
    pub path: Option<PathBuf>,
}

/// # Settings Initialization
///
/// The `Settings` implementation provides a `new` function to load and construct the configuration settings.
impl Settings {
    /// Loads and constructs the application settings from various configuration sources.
    ///
    /// This function reads configuration settings from the following sources, in order of precedence:
    ///
    /// 1. `default.yaml`: Contains default settings for the application
    /// 2. Environment-specific YAML file (e.g., `development.yaml` or `production.yaml`) based on the `RUN_MODE` environment variable
    /// 3. Environment variables prefixed with `APP` (e.g., `APP__BROKER__URL`)
    ///
    /// The `CONFIG_DIR` environment variable can be used to specify the directory where the YAML configuration files are located (defaults to "src/config").
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)`: If the settings were loaded and constructed successfully
    /// * `Err(GarageDoorError)`: If there was an error during the loading or construction process
    pub fn new() -> Result<Self, GarageDoorError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let config_dir = env::var("CONFIG_DIR").unwrap_or_else(|_| "src/config".into());
        debug!("Run Mode: {:?}, Config Dir: {:?}", run_mode, config_dir);

        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/default", config_dir)))
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        let mut s: Self = s.try_deserialize::<Settings>()
            .map_err(GarageDoorError::from)?;

        if let Some(ref mut path) = s.logging.path {
            *path = env::current_dir()?.join(path.clone());
        }

        Ok(s)
    }
}

fn default_client_id() -> String {
    "garagedoor-bridge".to_string()
}

fn default_keep_alive_secs() -> u64 {
    10
}

fn default_command_topic() -> String {
    "domoticz/in".to_string()
}

fn default_status_topic() -> String {
    "domoticz/out".to_string()
}

fn default_offline_payload() -> String {
    "Offline".to_string()
}

fn default_open_value() -> String {
    "On".to_string()
}

fn default_closed_value() -> String {
    "Off".to_string()
}

fn default_travel_secs() -> u64 {
    20
}

/// Deserializes a secret string from configuration into a `Secret<String>`
fn deserialize_optional_secret<'de, D>(deserializer: D) -> Result<Option<Secret<String>>, D::Error>
    where
        D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.map(Secret::new))
}

impl fmt::Display for BrokerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BrokerSettings {{ url: {}, username: {:?}, client_id: {}, command_topic: {}, status_topic: {}, liveness_topic: {:?} }}",
            self.url, self.username, self.client_id, self.command_topic, self.status_topic, self.liveness_topic
        )
    }
}
