//! MQTT integration configuration.

use serde::Deserialize;

use crate::region;

/// Configuration for the broker connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Account country code, used to pick the regional broker.
    pub country: String,
    /// Broker hostname; overrides the regional default when set.
    pub broker_host: Option<String>,
    /// MQTT broker port.
    pub broker_port: u16,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Prefix of the client identifier; a random suffix is appended.
    pub client_id_prefix: String,
    /// Capacity of the client request queue and of the status feed.
    pub channel_capacity: usize,
    /// Delay before polling again after a connection error, in milliseconds.
    pub reconnect_delay_ms: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            country: "US".to_string(),
            broker_host: None,
            broker_port: 1883,
            keep_alive_secs: 60,
            client_id_prefix: "meshlight-".to_string(),
            channel_capacity: 64,
            reconnect_delay_ms: 1000,
        }
    }
}

impl MqttConfig {
    /// The broker to connect to.
    #[must_use]
    pub fn broker_host(&self) -> &str {
        self.broker_host
            .as_deref()
            .unwrap_or_else(|| region::lookup(&self.country).broker_host)
    }

    /// A fresh client identifier.
    #[must_use]
    pub fn client_id(&self) -> String {
        format!("{}{}", self.client_id_prefix, uuid::Uuid::new_v4().simple())
    }
}
