use std::time::Duration;

use clap::Parser;
use tokengate::cli::{
    Args, Mode, init_logging, load_credentials, load_key_material, open_database,
    validate_authority_url,
};
use tokengate::{AuthorityConfig, GatewayConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });
    let local_addr = listener.local_addr().unwrap();

    match args.mode {
        Mode::Authority => {
            let Some(keys) =
                load_key_material(args.private_key_file.as_deref(), args.public_key_file.as_deref())
            else {
                std::process::exit(1);
            };

            let Some(verifier) = load_credentials(args.credentials_file.as_deref()) else {
                std::process::exit(1);
            };

            let Some(db) = open_database(&args.database).await else {
                std::process::exit(1);
            };

            tokengate::init_cleanup(&db).await;

            let config = AuthorityConfig {
                db,
                keys,
                verifier,
                access_ttl: Duration::from_secs(args.access_ttl_secs),
                refresh_ttl: Duration::from_secs(args.refresh_ttl_secs),
            };

            info!(address = %local_addr, "Authority listening");
            if let Err(e) = tokengate::run_authority(config, listener).await {
                error!(error = %e, "Server error");
                std::process::exit(1);
            }
        }
        Mode::Gateway => {
            let Some(authority_url) = validate_authority_url(args.authority_url.as_deref()) else {
                std::process::exit(1);
            };

            let config = GatewayConfig {
                authority_url,
                authority_timeout: Duration::from_millis(args.authority_timeout_ms),
                cache: args.cache_config(),
            };

            info!(address = %local_addr, "Gateway listening");
            if let Err(e) = tokengate::run_gateway(config, listener).await {
                error!(error = %e, "Server error");
                std::process::exit(1);
            }
        }
    }
}
