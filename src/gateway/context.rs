//! Request-scoped caller identity.

use serde::{Deserialize, Serialize};

/// The authenticated caller, derived from verified claims.
///
/// Created once per request after validation succeeds and discarded at
/// request end. Downstream consumers read only from this context, never
/// from the raw token, so the validation path stays the single chokepoint
/// for trust.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Stable subject identifier
    pub subject: String,
    /// Role names granted to the subject
    pub roles: Vec<String>,
    /// Token expiry (Unix timestamp, seconds); bounds how long a cached
    /// positive verdict may live
    pub expires_at: u64,
}

impl AuthContext {
    /// Build a context from verified claim values.
    pub fn new(
        subject: &str,
        roles: Vec<String>,
        expires_at: u64,
    ) -> Result<Self, MissingRequiredClaim> {
        if subject.is_empty() {
            return Err(MissingRequiredClaim("sub"));
        }
        Ok(Self {
            subject: subject.to_string(),
            roles,
            expires_at,
        })
    }
}

/// A required claim was absent or empty.
#[derive(Debug)]
pub struct MissingRequiredClaim(pub &'static str);

impl std::fmt::Display for MissingRequiredClaim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Missing required claim: {}", self.0)
    }
}

impl std::error::Error for MissingRequiredClaim {}
