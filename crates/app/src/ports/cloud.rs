//! Cloud session port — the vendor account that owns the roster.

use std::future::Future;

use meshlight_domain::credentials::ControlCredentials;
use meshlight_domain::device::Device;

/// Failure reported by the cloud session.
#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    /// The account was refused.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The service could not be reached or answered with a failure status.
    #[error("cloud transport error")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// An authenticated session with the vendor cloud.
///
/// Calls are made in order: [`login`](Self::login) first, then the fetches.
pub trait CloudSession: Send + Sync {
    fn login(&self) -> impl Future<Output = Result<(), CloudError>> + Send;

    /// Every device registered on the account.
    fn fetch_devices(&self) -> impl Future<Output = Result<Vec<Device>, CloudError>> + Send;

    /// Broker identities, one record per control channel.
    fn fetch_broker_credentials(
        &self,
    ) -> impl Future<Output = Result<Vec<ControlCredentials>, CloudError>> + Send;
}
