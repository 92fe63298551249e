//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `meshlight.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use meshlight_adapter_mqtt::MqttConfig;
use meshlight_app::outbound_queue::QueueConfig;
use meshlight_app::services::light_service::LightConfig;
use meshlight_domain::credentials::ControlCredentials;
use meshlight_domain::device::Device;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Broker connection settings.
    pub mqtt: MqttConfig,
    /// Outbound queue timings.
    pub queue: QueueSettings,
    /// Reconciliation of commands with status readings.
    pub lights: LightSettings,
    /// Integration toggles.
    pub integrations: IntegrationsConfig,
    /// Static roster used when the virtual mesh is disabled.
    pub roster: RosterConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Outbound queue timings, in milliseconds.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub debounce_ms: u64,
    pub publish_timeout_ms: u64,
    pub retry_delay_ms: u64,
}

/// Light state reconciliation.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LightSettings {
    /// Readings this soon after our own command are ignored.
    pub echo_window_ms: u64,
    /// HS readings closer than this RGB distance keep the current colour.
    pub echo_distance: f64,
}

/// Per-integration toggles.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IntegrationsConfig {
    /// Run against the simulated mesh instead of the broker.
    pub virtual_enabled: bool,
}

/// Devices and broker identities of the account.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    pub devices: Vec<Device>,
    pub credentials: Vec<ControlCredentials>,
}

impl Config {
    /// Load configuration from `meshlight.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if
    /// the resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("meshlight.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MESHLIGHT_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("MESHLIGHT_PORT")
            && let Ok(port) = val.parse()
        {
            self.server.port = port;
        }
        if let Ok(val) = std::env::var("MESHLIGHT_BIND")
            && let Some((host, port)) = val.rsplit_once(':')
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("MESHLIGHT_COUNTRY") {
            self.mqtt.country = val;
        }
        if let Ok(val) = std::env::var("MESHLIGHT_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.queue.debounce_ms == 0 {
            return Err(ConfigError::Validation(
                "queue debounce must be non-zero".to_string(),
            ));
        }
        if self.queue.retry_delay_ms <= self.queue.debounce_ms {
            return Err(ConfigError::Validation(
                "queue retry delay must be greater than the debounce".to_string(),
            ));
        }
        if self.lights.echo_distance.is_nan() || self.lights.echo_distance < 0.0 {
            return Err(ConfigError::Validation(
                "echo distance must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    #[must_use]
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            debounce: Duration::from_millis(self.queue.debounce_ms),
            publish_timeout: Duration::from_millis(self.queue.publish_timeout_ms),
            retry_delay: Duration::from_millis(self.queue.retry_delay_ms),
        }
    }

    #[must_use]
    pub fn light_config(&self) -> LightConfig {
        LightConfig {
            echo_window: Duration::from_millis(self.lights.echo_window_ms),
            echo_distance: self.lights.echo_distance,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "meshlight=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 50,
            publish_timeout_ms: 5000,
            retry_delay_ms: 3000,
        }
    }
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            echo_window_ms: 2000,
            echo_distance: 50.0,
        }
    }
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            virtual_enabled: true,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshlight_domain::credentials::ChannelKind;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.mqtt.broker_port, 1883);
        assert!(config.integrations.virtual_enabled);
        assert!(config.roster.devices.is_empty());
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.queue_config(), QueueConfig::default());
        assert_eq!(config.light_config(), LightConfig::default());
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [server]
            host = '127.0.0.1'
            port = 9090

            [logging]
            filter = 'debug'

            [mqtt]
            country = 'DE'
            keep_alive_secs = 30

            [queue]
            debounce_ms = 100
            publish_timeout_ms = 2000
            retry_delay_ms = 1500

            [lights]
            echo_window_ms = 500
            echo_distance = 25.0

            [integrations]
            virtual_enabled = false
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.mqtt.broker_host(), "eu.meshbroker.magichue.net");
        assert_eq!(config.mqtt.keep_alive_secs, 30);
        assert_eq!(config.queue_config().debounce, Duration::from_millis(100));
        assert_eq!(config.queue_config().retry_delay, Duration::from_millis(1500));
        assert_eq!(config.light_config().echo_window, Duration::from_millis(500));
        assert!(!config.integrations.virtual_enabled);
    }

    #[test]
    fn should_parse_static_roster() {
        let toml = "
            [[roster.devices]]
            unique_id = 'uid-1'
            mac_address = 'AA:BB:CC:DD:EE:01'
            display_name = 'Porch'
            mesh_address = 7
            wiring_type = 1
            groups = [3]

            [[roster.credentials]]
            kind = 'HARDWARE'
            device_name = 'hwdn'
            product_key = 'hwpk'
            device_secret = 'hw-secret'

            [[roster.credentials]]
            kind = 'SOFTWARE'
            device_name = 'swdn'
            product_key = 'swpk'
            device_secret = 'sw-secret'
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.roster.devices.len(), 1);
        assert_eq!(config.roster.devices[0].mesh_address.get(), 7);
        assert_eq!(config.roster.devices[0].groups, vec![3]);
        assert_eq!(config.roster.credentials[1].kind, ChannelKind::Software);
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn should_reject_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_zero_debounce() {
        let mut config = Config::default();
        config.queue.debounce_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_retry_delay_not_above_debounce() {
        let mut config = Config::default();
        config.queue.retry_delay_ms = config.queue.debounce_ms;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_negative_echo_distance() {
        let mut config = Config::default();
        config.lights.echo_distance = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_accept_defaults() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn should_format_custom_bind_addr() {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 9090;
        assert_eq!(config.bind_addr(), "127.0.0.1:9090");
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
