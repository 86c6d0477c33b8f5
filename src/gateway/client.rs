//! Remote validation calls from the gateway to the authority.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::context::AuthContext;

/// Upstream validation interface.
///
/// `Ok(Some(ctx))` means the authority confirmed the token; `Ok(None)` means
/// the authority rejected it (any terminal reason); `Err` means the answer is
/// unknown -- the caller must fail closed.
#[async_trait]
pub trait AuthorityClient: Send + Sync {
    async fn validate(&self, raw_token: &str) -> Result<Option<AuthContext>, AuthorityUnavailable>;
}

/// The authority could not be reached or did not answer in time.
#[derive(Debug)]
pub struct AuthorityUnavailable(pub String);

impl std::fmt::Display for AuthorityUnavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Authority unavailable: {}", self.0)
    }
}

impl std::error::Error for AuthorityUnavailable {}

#[derive(Deserialize)]
struct ValidateResponse {
    sub: String,
    #[serde(default)]
    roles: Vec<String>,
    exp: u64,
}

/// HTTP client for the authority's `/validate` endpoint, with a hard
/// per-request timeout so a stalled authority cannot hang gateway workers.
pub struct HttpAuthorityClient {
    http: reqwest::Client,
    validate_url: Url,
}

impl HttpAuthorityClient {
    pub fn new(authority_url: &Url, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Http)?;

        // Normalize the base so `join` appends instead of replacing the
        // last path segment (`https://host/auth` would otherwise become
        // `https://host/validate`).
        let mut base = authority_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let validate_url = base.join("validate").map_err(ClientError::BadUrl)?;

        Ok(Self { http, validate_url })
    }
}

/// Errors constructing an [`HttpAuthorityClient`].
#[derive(Debug)]
pub enum ClientError {
    /// The underlying HTTP client could not be built
    Http(reqwest::Error),
    /// The authority URL does not accept a path segment
    BadUrl(url::ParseError),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Http(e) => write!(f, "Failed to build HTTP client: {}", e),
            ClientError::BadUrl(e) => write!(f, "Invalid authority URL: {}", e),
        }
    }
}

impl std::error::Error for ClientError {}

#[async_trait]
impl AuthorityClient for HttpAuthorityClient {
    async fn validate(&self, raw_token: &str) -> Result<Option<AuthContext>, AuthorityUnavailable> {
        let response = self
            .http
            .post(self.validate_url.clone())
            .json(&serde_json::json!({ "token": raw_token }))
            .send()
            .await
            .map_err(|e| AuthorityUnavailable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AuthorityUnavailable(format!("status {}", status)));
        }
        if !status.is_success() {
            return Ok(None);
        }

        let body: ValidateResponse = response
            .json()
            .await
            .map_err(|e| AuthorityUnavailable(e.to_string()))?;

        match AuthContext::new(&body.sub, body.roles, body.exp) {
            Ok(ctx) => Ok(Some(ctx)),
            Err(e) => {
                // A 200 without a subject is an authority bug; fail closed.
                debug!("Discarding validation response: {}", e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(base: &str) -> HttpAuthorityClient {
        HttpAuthorityClient::new(&Url::parse(base).unwrap(), Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_validate_url_appended_to_bare_host() {
        let client = client_for("http://127.0.0.1:7420");
        assert_eq!(client.validate_url.as_str(), "http://127.0.0.1:7420/validate");
    }

    #[test]
    fn test_validate_url_preserves_base_path() {
        // Without normalization `join` would replace `auth` with `validate`
        let client = client_for("https://example.com/auth");
        assert_eq!(client.validate_url.as_str(), "https://example.com/auth/validate");

        let client = client_for("https://example.com/auth/");
        assert_eq!(client.validate_url.as_str(), "https://example.com/auth/validate");
    }
}
