//! MQTT adapter error types.

use meshlight_app::ports::TransportError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The rumqttc client returned an error.
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),

    /// Failed to serialise an outgoing payload as JSON.
    #[error("failed to serialise MQTT payload")]
    Payload(#[source] serde_json::Error),
}

impl From<MqttError> for TransportError {
    fn from(err: MqttError) -> Self {
        match err {
            // The request channel only closes once the event loop is gone.
            MqttError::Client(rumqttc::ClientError::Request(_)) => Self::Disconnected,
            other => Self::Rejected(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_payload_error_to_rejected() {
        let json_err = serde_json::from_str::<serde_json::Value>("{{bad").unwrap_err();
        let err: TransportError = MqttError::Payload(json_err).into();
        assert!(matches!(err, TransportError::Rejected(_)));
    }

    #[test]
    fn should_display_payload_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{{bad").unwrap_err();
        let err = MqttError::Payload(json_err);
        assert_eq!(err.to_string(), "failed to serialise MQTT payload");
    }
}
