//! Common error types for the drinks services.
//!
//! This crate provides unified error handling across the workspace and the
//! JSON error envelope returned to API clients.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authorization error: {0}")]
    Auth(#[from] AuthFailure),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Auth(failure) => failure.status_code(),
            AppError::Database(DatabaseError::NotFound) => 404,
            AppError::Database(DatabaseError::DuplicateEntry(_)) => 422,
            AppError::Database(_) => 500,
            AppError::Validation(_) => 400,
            AppError::NotFound(_) => 404,
            AppError::Unprocessable(_) => 422,
            AppError::Internal(_) => 500,
        }
    }
}

/// Reasons a bearer token is refused by the authorization guard.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("Authorization header is expected.")]
    MissingHeader,

    #[error("Authorization header must be a bearer token.")]
    MalformedHeader,

    #[error("Authorization malformed.")]
    MalformedToken,

    #[error("Unable to find the appropriate key.")]
    UnknownKey,

    #[error("Token is invalid or expired.")]
    InvalidToken,

    #[error("Permissions not included in JWT.")]
    MissingPermissionsClaim,

    #[error("Permission not found.")]
    InsufficientScope,

    #[error("Signing keys are unavailable.")]
    KeySourceUnavailable,
}

impl AuthFailure {
    /// HTTP status code associated with the failure.
    ///
    /// Every authentication failure is a 401; a verified token that lacks the
    /// scope is a 403.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthFailure::InsufficientScope => 403,
            AuthFailure::KeySourceUnavailable => 503,
            _ => 401,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            AuthFailure::MissingHeader => "authorization_header_missing",
            AuthFailure::MalformedHeader | AuthFailure::MalformedToken => "invalid_header",
            AuthFailure::UnknownKey => "unknown_key",
            AuthFailure::InvalidToken => "invalid_token",
            AuthFailure::MissingPermissionsClaim => "invalid_claims",
            AuthFailure::InsufficientScope => "unauthorized",
            AuthFailure::KeySourceUnavailable => "key_source_unavailable",
        }
    }

    /// Human-readable description.
    pub fn description(&self) -> String {
        self.to_string()
    }
}

/// Database-related errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Record not found")]
    NotFound,

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}

/// Error response for API clients.
///
/// Serialized as `{"success": false, "error": <status>, "message": <text>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// HTTP status code
    pub error: u16,
    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: status,
            message: message.into(),
        }
    }

    pub fn bad_request() -> Self {
        Self::new(400, "bad request")
    }

    pub fn not_found() -> Self {
        Self::new(404, "resource not found")
    }

    pub fn unprocessable() -> Self {
        Self::new(422, "unprocessable")
    }

    pub fn internal() -> Self {
        Self::new(500, "internal server error")
    }
}

impl From<&AuthFailure> for ErrorResponse {
    fn from(err: &AuthFailure) -> Self {
        Self::new(err.status_code(), err.description())
    }
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::Auth(failure) => failure.into(),
            other => match other.status_code() {
                400 => Self::bad_request(),
                404 => Self::not_found(),
                422 => Self::unprocessable(),
                status => Self::new(status, "internal server error"),
            },
        }
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_are_401_except_scope() {
        let unauthenticated = [
            AuthFailure::MissingHeader,
            AuthFailure::MalformedHeader,
            AuthFailure::MalformedToken,
            AuthFailure::UnknownKey,
            AuthFailure::InvalidToken,
            AuthFailure::MissingPermissionsClaim,
        ];
        for failure in unauthenticated {
            assert_eq!(failure.status_code(), 401, "{failure:?}");
        }
        assert_eq!(AuthFailure::InsufficientScope.status_code(), 403);
        assert_eq!(AuthFailure::KeySourceUnavailable.status_code(), 503);
    }

    #[test]
    fn error_response_envelope() {
        let body = ErrorResponse::from(&AuthFailure::MissingHeader);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": false,
                "error": 401,
                "message": "Authorization header is expected."
            })
        );
    }

    #[test]
    fn app_error_statuses() {
        assert_eq!(AppError::Validation("title".into()).status_code(), 400);
        assert_eq!(AppError::NotFound("drink 7".into()).status_code(), 404);
        assert_eq!(AppError::Unprocessable("recipe".into()).status_code(), 422);
        assert_eq!(
            AppError::Database(DatabaseError::DuplicateEntry("water".into())).status_code(),
            422
        );
        assert_eq!(
            AppError::Database(DatabaseError::QueryFailed("boom".into())).status_code(),
            500
        );
        assert_eq!(
            AppError::Auth(AuthFailure::InsufficientScope).status_code(),
            403
        );
    }

    #[test]
    fn app_error_messages_hide_internals() {
        let err = AppError::Database(DatabaseError::QueryFailed("disk I/O error".into()));
        let body = ErrorResponse::from(&err);
        assert_eq!(body.error, 500);
        assert!(!body.message.contains("disk"));

        let body = ErrorResponse::from(&AppError::NotFound("drink 3".into()));
        assert_eq!(body, ErrorResponse::new(404, "resource not found"));
    }
}
