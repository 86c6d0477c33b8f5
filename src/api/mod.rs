//! Authority HTTP API.

pub mod error;
mod session;
mod validate;

use axum::{Router, middleware, routing::post};
use std::sync::Arc;

pub use error::ApiError;

use crate::db::Database;
use crate::jwt::TokenCodec;
use crate::rate_limit::{RateLimitConfig, rate_limit_login};
use crate::session::SessionService;

/// Shared state for all authority endpoints.
#[derive(Clone)]
pub struct ApiState {
    pub db: Database,
    pub codec: Arc<TokenCodec>,
    pub sessions: Arc<SessionService>,
}

/// Build the authority router: session lifecycle plus the validation
/// endpoint the gateways call on a cache miss.
pub fn create_api_router(state: ApiState) -> Router {
    let rate_limits = Arc::new(RateLimitConfig::new());

    let login_route = Router::new()
        .route("/session/login", post(session::login))
        .layer(middleware::from_fn_with_state(
            rate_limits.clone(),
            rate_limit_login,
        ));

    Router::new()
        .merge(login_route)
        .route("/session/refresh", post(session::refresh))
        .route("/session/logout", post(session::logout))
        .route("/validate", post(validate::validate))
        .with_state(state)
}
