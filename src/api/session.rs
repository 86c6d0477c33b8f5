//! Session lifecycle endpoints.
//!
//! - POST `/session/login` - Exchange credentials for an access/refresh pair
//! - POST `/session/refresh` - Rotate a refresh token into a new pair
//! - POST `/session/logout` - Revoke the presented tokens (idempotent)

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use super::ApiState;
use super::error::ApiError;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub secret: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize, Default)]
pub struct LogoutRequest {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Serialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

pub async fn login(
    State(state): State<ApiState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenPairResponse>, ApiError> {
    if body.username.is_empty() {
        return Err(ApiError::bad_request("Username cannot be empty"));
    }

    let pair = state.sessions.login(&body.username, &body.secret).await?;

    Ok(Json(TokenPairResponse {
        access_token: pair.access.token,
        refresh_token: pair.refresh.token,
        expires_in: state.sessions.access_ttl().as_secs(),
    }))
}

pub async fn refresh(
    State(state): State<ApiState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<TokenPairResponse>, ApiError> {
    let pair = state.sessions.refresh(&body.refresh_token).await?;

    Ok(Json(TokenPairResponse {
        access_token: pair.access.token,
        refresh_token: pair.refresh.token,
        expires_in: state.sessions.access_ttl().as_secs(),
    }))
}

/// Logout always reports success: revoking already-dead tokens is a no-op
/// and there is nothing useful to tell an unauthenticated caller.
pub async fn logout(
    State(state): State<ApiState>,
    body: Option<Json<LogoutRequest>>,
) -> Result<Json<LogoutResponse>, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    state
        .sessions
        .logout(body.access_token.as_deref(), body.refresh_token.as_deref())
        .await?;

    Ok(Json(LogoutResponse { success: true }))
}
