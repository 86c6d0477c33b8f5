//! CLI argument parsing, validation, and startup helpers.

use crate::db::Database;
use crate::gateway::CacheConfig;
use crate::keys::KeyMaterial;
use crate::session::{CredentialVerifier, StaticCredentialVerifier};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use url::Url;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

/// Which half of the system this process runs.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Issue and rotate token pairs; own the revocation ledger
    Authority,
    /// Authenticate bearer tokens at the edge via the validation cache
    Gateway,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tokengate",
    about = "Token authority and edge validation gateway"
)]
pub struct Args {
    /// Run as the token authority or as an edge gateway
    #[arg(short, long, value_enum)]
    pub mode: Mode,

    /// Port to listen on
    #[arg(short, long, default_value = "7420")]
    pub port: u16,

    /// Path to SQLite database file (authority only)
    #[arg(short, long, default_value = "tokengate.db")]
    pub database: String,

    /// Path to the PEM-encoded RSA private key (authority only)
    #[arg(long)]
    pub private_key_file: Option<String>,

    /// Path to the PEM-encoded RSA public key (authority only)
    #[arg(long)]
    pub public_key_file: Option<String>,

    /// Path to the credentials file: one `username:secret:role1,role2` per
    /// line (authority only)
    #[arg(long)]
    pub credentials_file: Option<String>,

    /// Access token lifetime in seconds (authority only)
    #[arg(long, default_value = "300")]
    pub access_ttl_secs: u64,

    /// Refresh token lifetime in seconds (authority only)
    #[arg(long, default_value = "1209600")]
    pub refresh_ttl_secs: u64,

    /// Base URL of the authority (gateway only)
    #[arg(long)]
    pub authority_url: Option<String>,

    /// Timeout in milliseconds for each validation call (gateway only)
    #[arg(long, default_value = "2000")]
    pub authority_timeout_ms: u64,

    /// How long a confirmed-valid verdict is cached, in seconds. Shorter
    /// values narrow the window in which a revoked token is still honored
    /// at this edge (gateway only)
    #[arg(long, default_value = "60")]
    pub cache_ttl_secs: u64,

    /// How long a confirmed-invalid verdict is cached, in seconds
    /// (gateway only)
    #[arg(long, default_value = "10")]
    pub negative_cache_ttl_secs: u64,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

impl Args {
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            positive_ttl: Duration::from_secs(self.cache_ttl_secs),
            negative_ttl: Duration::from_secs(self.negative_cache_ttl_secs),
        }
    }
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load the authority's key pair from the configured PEM files.
/// Returns None and logs an error if the keys cannot be loaded; key
/// material is mandatory, so the caller should exit.
pub fn load_key_material(
    private_key_file: Option<&str>,
    public_key_file: Option<&str>,
) -> Option<KeyMaterial> {
    let (Some(private_path), Some(public_path)) = (private_key_file, public_key_file) else {
        error!("Both --private-key-file and --public-key-file are required in authority mode");
        return None;
    };

    let private_pem = match std::fs::read(private_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(path = %private_path, error = %e, "Failed to read private key file");
            return None;
        }
    };
    let public_pem = match std::fs::read(public_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(path = %public_path, error = %e, "Failed to read public key file");
            return None;
        }
    };

    match KeyMaterial::from_rsa_pem(&private_pem, &public_pem) {
        Ok(keys) => Some(keys),
        Err(e) => {
            error!(error = %e, "Failed to parse key material");
            None
        }
    }
}

/// Load the credential file for the login boundary.
pub fn load_credentials(path: Option<&str>) -> Option<Arc<dyn CredentialVerifier>> {
    let Some(path) = path else {
        error!("--credentials-file is required in authority mode");
        return None;
    };

    match StaticCredentialVerifier::from_file(path) {
        Ok(verifier) => Some(Arc::new(verifier)),
        Err(e) => {
            error!(path = %path, error = %e, "Failed to load credentials file");
            None
        }
    }
}

/// Parse and validate the authority URL for gateway mode.
pub fn validate_authority_url(authority_url: Option<&str>) -> Option<Url> {
    let Some(raw) = authority_url else {
        error!("--authority-url is required in gateway mode");
        return None;
    };

    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => {
            error!(url = %raw, error = %e, "Invalid authority URL");
            return None;
        }
    };

    let is_https = url.scheme() == "https";
    let is_local = matches!(url.host_str(), Some("localhost") | Some("127.0.0.1"));

    if !is_https && !is_local {
        error!("Authority URL must use HTTPS for non-localhost deployments");
        return None;
    }

    Some(url)
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
