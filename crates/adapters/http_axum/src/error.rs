//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use meshlight_domain::address::AddressParseError;
use meshlight_domain::error::MeshError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps handler failures to an HTTP response with appropriate status code.
#[derive(Debug)]
pub enum ApiError {
    /// The `{address}` path segment is not a mesh address.
    InvalidAddress(AddressParseError),
    /// The light service refused or failed the request.
    Mesh(MeshError),
}

impl From<MeshError> for ApiError {
    fn from(err: MeshError) -> Self {
        Self::Mesh(err)
    }
}

impl From<AddressParseError> for ApiError {
    fn from(err: AddressParseError) -> Self {
        Self::InvalidAddress(err)
    }
}

/// The error's message followed by its sources.
fn describe(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::InvalidAddress(err) => (StatusCode::BAD_REQUEST, describe(err)),
            Self::Mesh(err @ (MeshError::Validation(_) | MeshError::Decode(_))) => {
                (StatusCode::BAD_REQUEST, describe(err))
            }
            Self::Mesh(err @ MeshError::NotFound(_)) => (StatusCode::NOT_FOUND, describe(err)),
            Self::Mesh(err @ MeshError::Transport(_)) => {
                tracing::error!(error = %describe(err), "mesh transport error");
                (StatusCode::BAD_GATEWAY, "mesh bridge unavailable".to_string())
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshlight_domain::address::MeshAddress;
    use meshlight_domain::error::{NotFoundError, ValidationError};

    #[test]
    fn should_map_validation_to_bad_request() {
        let err = ApiError::from(MeshError::from(ValidationError::ZeroMeshAddress));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn should_map_not_found_to_404() {
        let err = ApiError::from(MeshError::from(NotFoundError {
            entity: "Light",
            id: "7".to_string(),
        }));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn should_map_transport_to_bad_gateway() {
        let err = ApiError::from(MeshError::Transport("broker down".into()));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn should_map_unparsable_address_to_bad_request() {
        let err = ApiError::from("abc".parse::<MeshAddress>().unwrap_err());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn should_include_source_in_message() {
        let err = MeshError::from(ValidationError::ZeroMeshAddress);
        assert_eq!(
            describe(&err),
            "validation error: mesh address must be positive"
        );
    }
}
