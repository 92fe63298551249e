//! Event bus port — publish/subscribe for light state changes.

use std::future::Future;

use meshlight_domain::error::MeshError;
use meshlight_domain::event::LightEvent;

/// Publishes light events to interested subscribers.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: LightEvent) -> impl Future<Output = Result<(), MeshError>> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(&self, event: LightEvent) -> impl Future<Output = Result<(), MeshError>> + Send {
        (**self).publish(event)
    }
}
