//! rumqttc-backed [`MeshTransport`] and the connection event loop.

use std::future::Future;
use std::time::Duration;

use meshlight_app::ports::{MeshTransport, StatusFeed, TransportError};
use meshlight_domain::credentials::ControlChannels;
use meshlight_domain::message::{ControlMessage, StatusRequest};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::MqttConfig;
use crate::error::MqttError;
use crate::topics::{Topics, login};

/// Publishing half of the broker connection.
#[derive(Clone)]
pub struct MqttTransport {
    client: AsyncClient,
    topics: Topics,
}

/// Everything [`connect`] sets up.
pub struct MqttConnection {
    pub transport: MqttTransport,
    /// Raw payloads received on the status topic.
    pub status: StatusFeed,
    /// Drives the connection; abort it to disconnect.
    pub event_loop: JoinHandle<()>,
}

/// Open the broker connection and start its event loop.
///
/// The connection itself is established lazily by the event loop, which
/// also reconnects after errors and re-subscribes to the status topic on
/// every acknowledgement. Once the subscription is confirmed the loop asks
/// the bridge for the status of every device, so a fresh connection never
/// misses the initial state.
#[must_use]
pub fn connect(config: &MqttConfig, channels: &ControlChannels) -> MqttConnection {
    let topics = Topics::new(channels);
    let (username, password) = login(channels);

    let client_id = config.client_id();
    let mut options = MqttOptions::new(&client_id, config.broker_host(), config.broker_port);
    options.set_keep_alive(Duration::from_secs(u64::from(config.keep_alive_secs)));
    options.set_credentials(username, password);
    tracing::info!(
        broker = config.broker_host(),
        port = config.broker_port,
        %client_id,
        "connecting to MQTT broker"
    );

    let (client, event_loop) = AsyncClient::new(options, config.channel_capacity);
    let (sender, status) = mpsc::channel(config.channel_capacity);
    let event_loop = tokio::spawn(run_event_loop(
        event_loop,
        client.clone(),
        topics.clone(),
        sender,
        Duration::from_millis(config.reconnect_delay_ms),
    ));

    MqttConnection {
        transport: MqttTransport { client, topics },
        status,
        event_loop,
    }
}

impl MqttTransport {
    async fn publish_json(
        &self,
        topic: &str,
        payload: Result<Vec<u8>, serde_json::Error>,
    ) -> Result<(), MqttError> {
        let payload = payload.map_err(MqttError::Payload)?;
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(MqttError::Client)
    }
}

impl MeshTransport for MqttTransport {
    fn publish_control(
        &self,
        message: &ControlMessage,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        let payload = message.to_json();
        async move {
            self.publish_json(&self.topics.control, payload).await?;
            Ok(())
        }
    }

    fn request_status(&self) -> impl Future<Output = Result<(), TransportError>> + Send {
        let payload = serde_json::to_vec(&StatusRequest::default());
        async move {
            self.publish_json(&self.topics.request, payload).await?;
            Ok(())
        }
    }
}

async fn run_event_loop(
    mut event_loop: EventLoop,
    client: AsyncClient,
    topics: Topics,
    sink: mpsc::Sender<Vec<u8>>,
    reconnect_delay: Duration,
) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                // Subscriptions do not survive a reconnect.
                tracing::info!(topic = %topics.status, "MQTT connected, subscribing to status");
                if let Err(err) = client.try_subscribe(topics.status.as_str(), QoS::AtLeastOnce) {
                    tracing::error!(topic = %topics.status, error = %err, "failed to subscribe");
                }
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                tracing::info!(pkid = ack.pkid, "status subscription acknowledged");
                request_initial_status(&client, &topics.request);
            }
            Ok(Event::Incoming(Packet::Publish(publish)))
                if is_topic(&publish.topic, &topics.status) =>
            {
                tracing::debug!(bytes = publish.payload.len(), "status message received");
                if sink.send(publish.payload.to_vec()).await.is_err() {
                    tracing::info!("status feed closed, stopping MQTT event loop");
                    break;
                }
            }
            Ok(_) => {}
            Err(err) => {
                tracing::error!(error = %err, "MQTT event loop error");
                tokio::time::sleep(reconnect_delay).await;
            }
        }
    }
}

fn request_initial_status(client: &AsyncClient, topic: &str) {
    let payload = match serde_json::to_vec(&StatusRequest::default()) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!(error = %err, "failed to serialise status request");
            return;
        }
    };
    if let Err(err) = client.try_publish(topic, QoS::AtLeastOnce, false, payload) {
        tracing::error!(%topic, error = %err, "failed to request device status");
    }
}

fn is_topic(topic: &impl AsRef<[u8]>, expected: &str) -> bool {
    topic.as_ref() == expected.as_bytes()
}
