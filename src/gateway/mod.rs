//! Gateway-side authentication: validation cache, authority client, and the
//! bearer extractor that fronts protected routes.

mod cache;
mod client;
mod context;
mod extract;

pub use cache::{CacheConfig, ValidationCache, Verdict};
pub use client::{AuthorityClient, AuthorityUnavailable, ClientError, HttpAuthorityClient};
pub use context::{AuthContext, MissingRequiredClaim};
pub use extract::{BearerAuth, GatewayAuthError};

use axum::{Json, Router, routing::get};
use serde::Serialize;
use std::sync::Arc;

/// Shared state for gateway routes.
#[derive(Clone)]
pub struct GatewayState {
    pub cache: Arc<ValidationCache>,
}

/// Build the gateway router. `/whoami` is the protected surface; anything
/// nested behind [`BearerAuth`] gets the same treatment.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/whoami", get(whoami))
        .with_state(state)
}

#[derive(Serialize)]
struct WhoamiResponse {
    subject: String,
    roles: Vec<String>,
}

async fn whoami(BearerAuth(ctx): BearerAuth) -> Json<WhoamiResponse> {
    Json(WhoamiResponse {
        subject: ctx.subject,
        roles: ctx.roles,
    })
}
