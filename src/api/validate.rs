//! Token validation endpoint, consumed by gateways on a cache miss.
//!
//! Runs the full trust decision: codec verification (signature, expiry,
//! type) plus revocation ledger membership. 200 means valid; any terminal
//! failure is a uniform 401; a ledger outage is a 503, never a 200.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ApiState;
use super::error::ApiError;
use crate::jwt::TokenType;

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub token: String,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub sub: String,
    pub roles: Vec<String>,
    pub exp: u64,
}

pub async fn validate(
    State(state): State<ApiState>,
    Json(body): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let claims = state
        .codec
        .verify(&body.token, TokenType::Access)
        .map_err(|e| {
            debug!("Token failed verification: {}", e);
            ApiError::Unauthenticated
        })?;

    // Ledger check is fail-closed: a store error propagates as 503 rather
    // than skipping the membership test.
    let revoked = state
        .db
        .revocations()
        .is_revoked(&claims.jti)
        .await
        .map_err(|e| ApiError::from(crate::session::SessionError::Store(e)))?;

    if revoked {
        debug!(jti = %claims.jti, "Rejected revoked token");
        return Err(ApiError::Unauthenticated);
    }

    Ok(Json(ValidateResponse {
        sub: claims.sub,
        roles: claims.roles,
        exp: claims.exp,
    }))
}
