//! Shared application state for axum handlers.

use std::sync::Arc;

use meshlight_app::event_bus::InProcessEventBus;
use meshlight_app::ports::{EventPublisher, MeshTransport};
use meshlight_app::services::light_service::LightService;

/// Application state shared across all axum handlers.
///
/// Generic over the transport and the event publisher to avoid dynamic
/// dispatch. `Clone` is implemented manually so the underlying types
/// themselves do not need to be `Clone`; only the `Arc` wrappers are cloned.
pub struct AppState<T, P> {
    /// Light control and state.
    pub light_service: Arc<LightService<T, P>>,
    /// Event bus the SSE stream subscribes to.
    pub event_bus: Arc<InProcessEventBus>,
}

impl<T, P> Clone for AppState<T, P> {
    fn clone(&self) -> Self {
        Self {
            light_service: Arc::clone(&self.light_service),
            event_bus: Arc::clone(&self.event_bus),
        }
    }
}

impl<T, P> AppState<T, P>
where
    T: MeshTransport,
    P: EventPublisher + Send + Sync + 'static,
{
    /// Create the state from pre-wrapped `Arc`s.
    ///
    /// The light service is shared with its status reconciliation task, so
    /// it is always built before the HTTP state.
    pub fn new(light_service: Arc<LightService<T, P>>, event_bus: Arc<InProcessEventBus>) -> Self {
        Self {
            light_service,
            event_bus,
        }
    }
}
