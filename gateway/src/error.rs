//! HTTP error mapping
//!
//! Every error leaves the gateway as `{"success": false, "error", "message"}`
//! with the matching status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use drinks_service::ServiceError;
use error::{AppError, AuthFailure, ErrorResponse};

/// Error returned by request handlers
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self(AppError::NotFound(what.into()))
    }

    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self(AppError::Validation(reason.into()))
    }

    pub fn unprocessable(reason: impl Into<String>) -> Self {
        Self(AppError::Unprocessable(reason.into()))
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<AuthFailure> for ApiError {
    fn from(err: AuthFailure) -> Self {
        Self(AppError::Auth(err))
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self.0 {
            AppError::Auth(failure) => {
                tracing::info!("Rejected request: {} ({})", failure.code(), status)
            }
            err if status.is_server_error() => tracing::error!("Request failed: {}", err),
            err => tracing::debug!("Request failed: {}", err),
        }

        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}
