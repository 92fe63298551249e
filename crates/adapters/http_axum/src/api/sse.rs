//! Server-Sent Events (SSE) stream of light state changes.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use meshlight_app::ports::{EventPublisher, MeshTransport};

use crate::state::AppState;

/// `GET /api/events/stream`
///
/// Each [`LightEvent`](meshlight_domain::event::LightEvent) is sent as a
/// JSON `data:` frame named `light`. The stream continues until the client
/// disconnects or the event bus is closed.
pub async fn stream<T, P>(
    State(state): State<AppState<T, P>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>>
where
    T: MeshTransport,
    P: EventPublisher + Send + Sync + 'static,
{
    let event_rx = state.event_bus.subscribe();
    let event_stream = BroadcastStream::new(event_rx).filter_map(|result| match result {
        Ok(event) => match serde_json::to_string(&event) {
            Ok(json) => Some(Ok(Event::default().event("light").data(json))),
            Err(err) => {
                tracing::warn!(%err, "failed to serialize light event for SSE stream");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(n)) => {
            tracing::warn!(skipped = n, "SSE subscriber lagged, some events were dropped");
            None
        }
    });

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}
