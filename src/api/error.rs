//! Shared error handling for API endpoints.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, warn};

use crate::jwt::JwtError;
use crate::session::SessionError;

/// API error type with automatic response conversion.
///
/// Every terminal authentication failure collapses into the same
/// `Unauthenticated` response so callers cannot probe whether a token was
/// expired, revoked, or malformed. The specific reason is logged, never
/// echoed.
pub enum ApiError {
    Unauthenticated,
    BadRequest(String),
    ServiceUnavailable,
    Internal,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::InvalidCredentials => ApiError::Unauthenticated,
            SessionError::InvalidToken(e) => match e {
                // Signing-side failures are our fault, not the caller's
                JwtError::KeyUnavailable | JwtError::Encoding(_) | JwtError::TimeError => {
                    error!("Token issuance failed: {}", e);
                    ApiError::Internal
                }
                _ => ApiError::Unauthenticated,
            },
            SessionError::ReuseDetected => {
                // Security event; already logged by the session service.
                // Surfaced to the caller as plain unauthenticated.
                ApiError::Unauthenticated
            }
            SessionError::Store(e) => {
                // Fail closed: an unreachable ledger must never turn into a
                // success. Retriable by the caller.
                warn!("Session store unavailable: {}", e);
                ApiError::ServiceUnavailable
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated".to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service unavailable".to_string(),
            ),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            ),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
