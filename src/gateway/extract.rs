//! Axum extractor for bearer authentication at the gateway.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};

use super::GatewayState;
use super::cache::Verdict;
use super::context::AuthContext;

/// Extractor for gateway endpoints that require authentication.
///
/// Reads the `Authorization: Bearer` header and consults the validation
/// cache. Handlers receive only the [`AuthContext`], never the raw token.
pub struct BearerAuth(pub AuthContext);

impl FromRequestParts<GatewayState> for BearerAuth {
    type Rejection = GatewayAuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &GatewayState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(GatewayAuthError)?;

        match state.cache.check(token).await {
            Verdict::Valid(ctx) => Ok(BearerAuth(ctx)),
            Verdict::Invalid => Err(GatewayAuthError),
        }
    }
}

/// Extract the bearer token from the Authorization header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

/// Uniform gateway rejection: every authentication failure looks the same
/// to the caller, whatever the underlying reason.
#[derive(Debug)]
pub struct GatewayAuthError;

impl IntoResponse for GatewayAuthError {
    fn into_response(self) -> Response {
        use serde::Serialize;

        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "unauthenticated",
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_auth(value: &'static str) -> Parts {
        let (parts, _body) = Request::builder()
            .header(header::AUTHORIZATION, value)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn test_bearer_token_extraction() {
        let parts = parts_with_auth("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&parts), Some("abc.def.ghi"));
    }

    #[test]
    fn test_missing_or_malformed_header() {
        let (parts, _body) = Request::builder().body(()).unwrap().into_parts();
        assert_eq!(bearer_token(&parts), None);

        let parts = parts_with_auth("Basic abc");
        assert_eq!(bearer_token(&parts), None);

        let parts = parts_with_auth("Bearer ");
        assert_eq!(bearer_token(&parts), None);
    }
}
