//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use powerhub_domain::error::{PowerHubError, ValidationError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Body of a `409 Conflict` for a busy device.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BusyBody<'a> {
    error: &'static str,
    message: &'static str,
    device_name: &'a str,
}

/// Body of a `500` caused by a driver failure.
#[derive(Serialize)]
struct DriverBody {
    error: String,
    details: String,
}

/// Maps [`PowerHubError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub struct ApiError(PowerHubError);

impl From<PowerHubError> for ApiError {
    fn from(err: PowerHubError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self.0 {
            PowerHubError::Validation(err) => error(StatusCode::BAD_REQUEST, err.to_string()),
            PowerHubError::NotFound(err) => error(StatusCode::NOT_FOUND, err.to_string()),
            PowerHubError::Busy(err) => (
                StatusCode::CONFLICT,
                Json(BusyBody {
                    error: "busy",
                    message: err.message(),
                    device_name: &err.device_name,
                }),
            )
                .into_response(),
            PowerHubError::Driver(err) => {
                tracing::warn!(device = %err.device_name, error = %err.source, "driver failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(DriverBody {
                        error: err.to_string(),
                        details: err.source.to_string(),
                    }),
                )
                    .into_response()
            }
            PowerHubError::Storage(err) => {
                tracing::error!(error = %err, "storage error");
                error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        }
    }
}

fn error(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorBody { error: message })).into_response()
}
