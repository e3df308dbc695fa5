//! Mapping of gateway errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use triage_core::GatewayError;

/// JSON body returned for every error response.
///
/// Carries the failure class name and (where known) the request path, but
/// deliberately never a stack trace.
#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub detail: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// An error ready to leave the API boundary.
#[derive(Clone, Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    /// Attach the request path to the response body.
    pub fn at(mut self, path: &str) -> Self {
        self.body.path = Some(path.to_string());
        self
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let (status, kind) = match &err {
            GatewayError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "InvalidInput"),
            GatewayError::Config(_) => (StatusCode::BAD_REQUEST, "Config"),
            GatewayError::Auth(_) => (StatusCode::UNAUTHORIZED, "Auth"),
            GatewayError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "Unavailable"),
            GatewayError::Upstream { status, .. } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                "Upstream",
            ),
            GatewayError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal"),
        };

        Self {
            status,
            body: ErrorBody {
                detail: err.to_string(),
                kind: kind.to_string(),
                path: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = self.status.as_u16(),
                path = self.body.path.as_deref().unwrap_or(""),
                "{}",
                self.body.detail
            );
        }
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_map_to_401() {
        let err = ApiError::from(GatewayError::Auth("invalid state".to_string()));
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.body.kind, "Auth");
    }

    #[test]
    fn upstream_status_is_propagated() {
        let err = ApiError::from(GatewayError::Upstream {
            status: 404,
            detail: "Patient not found".to_string(),
        });
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn bogus_upstream_status_falls_back_to_bad_gateway() {
        let err = ApiError::from(GatewayError::Upstream {
            status: 42,
            detail: "weird".to_string(),
        });
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn transport_failures_map_to_503() {
        let err = ApiError::from(GatewayError::Unavailable("connection refused".to_string()));
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn at_records_the_request_path() {
        let err = ApiError::from(GatewayError::Internal("boom".to_string()))
            .at("/api/v1/patient/p1/summary");
        assert_eq!(
            err.body.path.as_deref(),
            Some("/api/v1/patient/p1/summary")
        );
    }
}
