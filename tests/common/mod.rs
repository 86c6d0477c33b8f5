#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokengate::db::Database;
use tokengate::gateway::CacheConfig;
use tokengate::keys::KeyMaterial;
use tokengate::session::{CredentialVerifier, StaticCredentialVerifier};
use tokengate::{AuthorityConfig, GatewayConfig};

pub const PRIVATE_PEM: &str = include_str!("../keys/test_private.pem");
pub const PUBLIC_PEM: &str = include_str!("../keys/test_public.pem");

pub fn key_material() -> KeyMaterial {
    KeyMaterial::from_rsa_pem(PRIVATE_PEM.as_bytes(), PUBLIC_PEM.as_bytes())
        .expect("valid test keys")
}

pub fn test_verifier() -> Arc<dyn CredentialVerifier> {
    let verifier =
        StaticCredentialVerifier::from_lines("alice:wonderland:user,admin\nbob:builder:user\n")
            .expect("valid credential lines");
    Arc::new(verifier)
}

/// A running authority on a random port with an in-memory database.
pub struct Authority {
    pub base_url: String,
    pub db: Database,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for Authority {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn start_authority() -> Authority {
    start_authority_with_ttls(Duration::from_secs(300), Duration::from_secs(86400)).await
}

pub async fn start_authority_with_ttls(access_ttl: Duration, refresh_ttl: Duration) -> Authority {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");

    let config = AuthorityConfig {
        db: db.clone(),
        keys: key_material(),
        verifier: test_verifier(),
        access_ttl,
        refresh_ttl,
    };

    let (handle, addr) = tokengate::start_authority(config, 0).await;

    Authority {
        base_url: format!("http://{}", addr),
        db,
        handle,
    }
}

/// A running gateway on a random port, pointed at an authority.
pub struct Gateway {
    pub base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn start_gateway(authority_base_url: &str, cache: CacheConfig) -> Gateway {
    let config = GatewayConfig {
        authority_url: url::Url::parse(authority_base_url).expect("valid authority URL"),
        authority_timeout: Duration::from_millis(2000),
        cache,
    };

    let (handle, addr) = tokengate::start_gateway(config, 0).await;

    Gateway {
        base_url: format!("http://{}", addr),
        handle,
    }
}

/// Log in and return (access_token, refresh_token).
pub async fn login(
    client: &reqwest::Client,
    authority: &Authority,
    username: &str,
    secret: &str,
) -> (String, String) {
    let response = client
        .post(format!("{}/session/login", authority.base_url))
        .json(&serde_json::json!({ "username": username, "secret": secret }))
        .send()
        .await
        .expect("login request failed");
    assert_eq!(response.status(), 200, "login should succeed");

    let body: serde_json::Value = response.json().await.expect("login response body");
    (
        body["access_token"].as_str().expect("access_token").to_string(),
        body["refresh_token"].as_str().expect("refresh_token").to_string(),
    )
}

/// POST /validate with a raw token, returning the response.
pub async fn validate(
    client: &reqwest::Client,
    authority: &Authority,
    token: &str,
) -> reqwest::Response {
    client
        .post(format!("{}/validate", authority.base_url))
        .json(&serde_json::json!({ "token": token }))
        .send()
        .await
        .expect("validate request failed")
}

/// GET /whoami through the gateway with a bearer token.
pub async fn whoami(
    client: &reqwest::Client,
    gateway: &Gateway,
    token: &str,
) -> reqwest::Response {
    client
        .get(format!("{}/whoami", gateway.base_url))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("whoami request failed")
}
