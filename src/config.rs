//! Device configuration
//!
//! Loaded from a TOML file, then patched with command-line overrides.

use command_shared::{topic::AWS_PREFIX, ResultEncoding, Topics};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "command-device.toml";

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Broker connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    /// Defaults to the thing name
    pub client_id: Option<String>,
    pub keep_alive_secs: u64,
    /// Pause after a failed poll before the client reconnects
    pub reconnect_delay_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1883,
            client_id: None,
            keep_alive_secs: 30,
            reconnect_delay_secs: 5,
        }
    }
}

/// Certificate files for mutual TLS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TlsConfig {
    pub ca_file: PathBuf,
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

/// Configuration for the device console
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// AWS IoT thing name; also the default MQTT client id
    pub thing_name: String,
    /// Topic namespace, `$aws` on AWS IoT Core
    pub topic_prefix: String,
    pub result_encoding: ResultEncoding,
    pub mqtt: MqttConfig,
    /// Plain TCP when absent
    pub tls: Option<TlsConfig>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            thing_name: String::new(),
            topic_prefix: AWS_PREFIX.into(),
            result_encoding: ResultEncoding::Plain,
            mqtt: MqttConfig::default(),
            tls: None,
        }
    }
}

impl DeviceConfig {
    /// Load from an explicit path, or from the default file if it exists
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(toml::from_str(&content)?)
    }

    /// Check the fields that topic building and the client depend on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thing_name.is_empty() {
            return Err(ConfigError::MissingField("thing_name".into()));
        }
        if self.thing_name.contains(['/', '+', '#']) {
            return Err(ConfigError::Invalid(format!(
                "thing_name '{}' must not contain '/', '+' or '#'",
                self.thing_name
            )));
        }
        if self.mqtt.host.is_empty() {
            return Err(ConfigError::MissingField("mqtt.host".into()));
        }
        if matches!(self.mqtt.client_id.as_deref(), Some(id) if id.trim().is_empty()) {
            return Err(ConfigError::Invalid("mqtt.client_id must not be blank".into()));
        }
        if self.mqtt.keep_alive_secs < 5 {
            return Err(ConfigError::Invalid(
                "mqtt.keep_alive_secs must be at least 5".into(),
            ));
        }
        Ok(())
    }

    pub fn topics(&self) -> Topics {
        Topics::with_prefix(self.topic_prefix.clone(), self.thing_name.clone())
    }

    pub fn client_id(&self) -> String {
        self.mqtt
            .client_id
            .clone()
            .unwrap_or_else(|| self.thing_name.clone())
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.mqtt.keep_alive_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.mqtt.reconnect_delay_secs)
    }
}
