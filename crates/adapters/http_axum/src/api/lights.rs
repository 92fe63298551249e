//! JSON REST handlers for lights.

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};

use meshlight_app::ports::{EventPublisher, MeshTransport};
use meshlight_domain::address::MeshAddress;
use meshlight_domain::light::{LightState, TurnOn};

use crate::error::ApiError;
use crate::state::AppState;

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<LightState>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the single-light endpoints.
pub enum LightResponse {
    Ok(Json<LightState>),
}

impl IntoResponse for LightResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/lights`
pub async fn list<T, P>(State(state): State<AppState<T, P>>) -> ListResponse
where
    T: MeshTransport,
    P: EventPublisher + Send + Sync + 'static,
{
    ListResponse::Ok(Json(state.light_service.list()))
}

/// `GET /api/lights/{address}`
pub async fn get<T, P>(
    State(state): State<AppState<T, P>>,
    Path(address): Path<String>,
) -> Result<LightResponse, ApiError>
where
    T: MeshTransport,
    P: EventPublisher + Send + Sync + 'static,
{
    let address: MeshAddress = address.parse()?;
    let light = state.light_service.get(address)?;
    Ok(LightResponse::Ok(Json(light)))
}

/// `POST /api/lights/{address}/turn_on`
///
/// The body is optional; an empty object turns the light on unchanged.
pub async fn turn_on<T, P>(
    State(state): State<AppState<T, P>>,
    Path(address): Path<String>,
    request: Option<Json<TurnOn>>,
) -> Result<LightResponse, ApiError>
where
    T: MeshTransport,
    P: EventPublisher + Send + Sync + 'static,
{
    let address: MeshAddress = address.parse()?;
    let request = request.map(|Json(request)| request).unwrap_or_default();
    let light = state.light_service.turn_on(address, request).await?;
    Ok(LightResponse::Ok(Json(light)))
}

/// `POST /api/lights/{address}/turn_off`
pub async fn turn_off<T, P>(
    State(state): State<AppState<T, P>>,
    Path(address): Path<String>,
) -> Result<LightResponse, ApiError>
where
    T: MeshTransport,
    P: EventPublisher + Send + Sync + 'static,
{
    let address: MeshAddress = address.parse()?;
    let light = state.light_service.turn_off(address).await?;
    Ok(LightResponse::Ok(Json(light)))
}
