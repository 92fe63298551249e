//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod lights;
pub mod sse;
#[allow(clippy::missing_errors_doc)]
pub mod status;

use axum::Router;
use axum::routing::{get, post};

use meshlight_app::ports::{EventPublisher, MeshTransport};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<T, P>() -> Router<AppState<T, P>>
where
    T: MeshTransport,
    P: EventPublisher + Send + Sync + 'static,
{
    Router::new()
        // Lights
        .route("/lights", get(lights::list::<T, P>))
        .route("/lights/{address}", get(lights::get::<T, P>))
        .route("/lights/{address}/turn_on", post(lights::turn_on::<T, P>))
        .route("/lights/{address}/turn_off", post(lights::turn_off::<T, P>))
        // Status
        .route("/status/refresh", post(status::refresh::<T, P>))
        // Events
        .route("/events/stream", get(sse::stream::<T, P>))
}
