//! Status refresh handler.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use meshlight_app::ports::{EventPublisher, MeshTransport};

use crate::error::ApiError;
use crate::state::AppState;

/// Possible responses from the refresh endpoint.
pub enum RefreshResponse {
    /// The request was published; readings arrive on the event stream.
    Accepted,
}

impl IntoResponse for RefreshResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Accepted => StatusCode::ACCEPTED.into_response(),
        }
    }
}

/// `POST /api/status/refresh`
pub async fn refresh<T, P>(State(state): State<AppState<T, P>>) -> Result<RefreshResponse, ApiError>
where
    T: MeshTransport,
    P: EventPublisher + Send + Sync + 'static,
{
    state.light_service.refresh().await?;
    Ok(RefreshResponse::Accepted)
}
