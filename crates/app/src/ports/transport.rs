//! Transport port — the publish side of the broker connection.
//!
//! Inbound status messages do not go through this trait: adapters push the
//! raw payloads into a [`StatusFeed`] drained by
//! [`MeshConnector::run_status_feed`].
//!
//! [`MeshConnector::run_status_feed`]: crate::connector::MeshConnector::run_status_feed

use std::future::Future;
use std::time::Duration;

use meshlight_domain::message::ControlMessage;
use tokio::sync::mpsc;

/// Raw status-topic payloads, in arrival order.
pub type StatusFeed = mpsc::Receiver<Vec<u8>>;

/// Failure to hand a message to the broker.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The publish did not complete within the configured bound.
    #[error("publish timed out after {0:?}")]
    Timeout(Duration),

    /// The connection is gone and the client no longer accepts requests.
    #[error("transport is disconnected")]
    Disconnected,

    /// The client refused the request.
    #[error("transport rejected the request")]
    Rejected(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Publishes control traffic to the mesh bridge.
///
/// Delivery is "at least once"; reconnecting is the implementation's job.
pub trait MeshTransport: Send + Sync + 'static {
    /// Publish one control message to the control topic.
    fn publish_control(
        &self,
        message: &ControlMessage,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Ask the bridge to push the current status of every device.
    fn request_status(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

impl<T: MeshTransport> MeshTransport for std::sync::Arc<T> {
    fn publish_control(
        &self,
        message: &ControlMessage,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        (**self).publish_control(message)
    }

    fn request_status(&self) -> impl Future<Output = Result<(), TransportError>> + Send {
        (**self).request_status()
    }
}

/// Run `future` with an upper bound so a stalled broker never holds a
/// caller forever.
///
/// # Errors
///
/// Returns [`TransportError::Timeout`] when `limit` elapses first, or the
/// error the transport itself reported.
pub async fn bounded<F>(limit: Duration, future: F) -> Result<(), TransportError>
where
    F: Future<Output = Result<(), TransportError>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(limit)),
    }
}
