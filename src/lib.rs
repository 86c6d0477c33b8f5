pub mod api;
pub mod cleanup;
pub mod cli;
pub mod db;
pub mod gateway;
pub mod jwt;
pub mod keys;
pub mod rate_limit;
pub mod session;

use api::{ApiState, create_api_router};
use axum::Router;
use db::Database;
use gateway::{CacheConfig, GatewayState, HttpAuthorityClient, ValidationCache};
use jwt::TokenCodec;
use keys::KeyMaterial;
use session::{CredentialVerifier, SessionService};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

/// Configuration for an authority process.
pub struct AuthorityConfig {
    /// Database holding the revocation ledger and session families
    pub db: Database,
    /// RSA key pair (signing + verification)
    pub keys: KeyMaterial,
    /// Credential boundary used by login
    pub verifier: Arc<dyn CredentialVerifier>,
    /// Access token lifetime
    pub access_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_ttl: Duration,
}

/// Configuration for a gateway process.
pub struct GatewayConfig {
    /// Base URL of the authority
    pub authority_url: Url,
    /// Hard timeout on each validation call
    pub authority_timeout: Duration,
    /// Validation cache TTLs
    pub cache: CacheConfig,
}

/// Create the authority application router.
pub fn create_authority_app(config: AuthorityConfig) -> Router {
    let codec = Arc::new(TokenCodec::new(config.keys));
    let sessions = Arc::new(SessionService::new(
        codec.clone(),
        config.db.clone(),
        config.verifier,
        config.access_ttl,
        config.refresh_ttl,
    ));

    create_api_router(ApiState {
        db: config.db,
        codec,
        sessions,
    })
}

/// Create the gateway application router.
pub fn create_gateway_app(config: GatewayConfig) -> Result<Router, gateway::ClientError> {
    let client = Arc::new(HttpAuthorityClient::new(
        &config.authority_url,
        config.authority_timeout,
    )?);
    let cache = Arc::new(ValidationCache::new(client, config.cache));

    Ok(gateway::router(GatewayState { cache }))
}

/// Run the retention sweep and spawn its scheduler.
/// Call this before starting the authority server.
pub async fn init_cleanup(db: &Database) {
    cleanup::run_cleanup(db).await;
    cleanup::spawn_cleanup_scheduler(db.clone());
}

/// Run the authority on the given listener. Blocks until the server exits.
pub async fn run_authority(
    config: AuthorityConfig,
    listener: TcpListener,
) -> Result<(), std::io::Error> {
    let app = create_authority_app(config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Run the gateway on the given listener. Blocks until the server exits.
pub async fn run_gateway(
    config: GatewayConfig,
    listener: TcpListener,
) -> Result<(), std::io::Error> {
    let app = create_gateway_app(config).map_err(std::io::Error::other)?;
    axum::serve(listener, app).await
}

/// Start an authority on the given port in a background task. Use port 0 to
/// let the OS choose. Returns the actual address the server listens on.
/// Note: For production use, prefer `run_authority` directly in main.
pub async fn start_authority(
    config: AuthorityConfig,
    port: u16,
) -> (tokio::task::JoinHandle<()>, SocketAddr) {
    init_cleanup(&config.db).await;

    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
    let local_addr = listener.local_addr().expect("Failed to get local address");

    let handle = tokio::spawn(async move {
        run_authority(config, listener).await.ok();
    });

    (handle, local_addr)
}

/// Start a gateway on the given port in a background task.
pub async fn start_gateway(
    config: GatewayConfig,
    port: u16,
) -> (tokio::task::JoinHandle<()>, SocketAddr) {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
    let local_addr = listener.local_addr().expect("Failed to get local address");

    let handle = tokio::spawn(async move {
        run_gateway(config, listener).await.ok();
    });

    (handle, local_addr)
}
