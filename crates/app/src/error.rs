//! Application-level errors and their conversion into [`MeshError`].

use std::sync::Arc;

use meshlight_domain::address::Destination;
use meshlight_domain::credentials::ChannelKind;
use meshlight_domain::error::{MeshError, ValidationError};

use crate::ports::{CloudError, TransportError};

/// Outcome of a batch flush as seen by one submitter.
///
/// Every submitter of a batch receives the same outcome, so the error is
/// cheap to clone.
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueueError {
    /// At least one command of the batch could not be published.
    #[error("failed to publish command for {destination}")]
    Publish {
        destination: Destination,
        #[source]
        source: Arc<TransportError>,
    },

    /// The batch was dropped before it produced an outcome.
    #[error("outbound batch aborted")]
    Aborted,
}

/// Fatal failure while bootstrapping the roster.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("cloud login refused")]
    Authentication(#[source] CloudError),

    #[error("cloud session unreachable")]
    Transport(#[source] CloudError),

    #[error("the account has no devices")]
    EmptyRoster,

    #[error("no {0} control channel in the broker credentials")]
    MissingChannel(ChannelKind),

    #[error("invalid roster")]
    InvalidRoster(#[from] ValidationError),
}

impl From<CloudError> for SetupError {
    fn from(value: CloudError) -> Self {
        match value {
            CloudError::Authentication(_) => Self::Authentication(value),
            CloudError::Transport(_) => Self::Transport(value),
        }
    }
}

impl From<TransportError> for MeshError {
    fn from(value: TransportError) -> Self {
        Self::Transport(Box::new(value))
    }
}

impl From<QueueError> for MeshError {
    fn from(value: QueueError) -> Self {
        Self::Transport(Box::new(value))
    }
}
