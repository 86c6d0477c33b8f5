//! Token codec: signing, verification, and claims extraction.
//!
//! The codec is a pure cryptographic primitive. It checks signature, expiry,
//! and token type, and nothing else; revocation is layered on top by the
//! session service and the validation endpoint.

use jsonwebtoken::{Algorithm, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::keys::KeyMaterial;

/// Signature algorithm for all issued tokens. The private key never leaves
/// the authority, so edge nodes holding the public key cannot forge tokens.
const ALGORITHM: Algorithm = Algorithm::RS256;

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived access token presented to the gateway on every request
    Access,
    /// Long-lived refresh token, consumable exactly once for rotation
    Refresh,
}

/// Signed claims carried by every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (stable user identifier)
    pub sub: String,
    /// Token id, unique per issuance; the revocation key
    pub jti: String,
    /// Session family id, constant across rotations of the same session
    pub sid: String,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Role names granted to the subject
    #[serde(default)]
    pub roles: Vec<String>,
    /// Issued at (Unix timestamp, seconds)
    pub iat: u64,
    /// Expiration time (Unix timestamp, seconds)
    pub exp: u64,
    /// Paired access token id (refresh tokens only), so rotating a refresh
    /// token can revoke the whole pair
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pjti: Option<String>,
}

/// A freshly signed token together with its claims.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The serialized, signed token string
    pub token: String,
    /// The claims that were signed into it
    pub claims: Claims,
}

/// Token codec bound to a set of key material.
pub struct TokenCodec {
    keys: KeyMaterial,
}

impl TokenCodec {
    pub fn new(keys: KeyMaterial) -> Self {
        Self { keys }
    }

    /// Issue a signed token with a fresh unique `jti`.
    ///
    /// Fails with `KeyUnavailable` when this codec was built without a
    /// signing key.
    pub fn issue(
        &self,
        subject: &str,
        sid: &str,
        token_type: TokenType,
        ttl: Duration,
        roles: &[String],
        paired_jti: Option<&str>,
    ) -> Result<IssuedToken, JwtError> {
        let encoding = self.keys.encoding().ok_or(JwtError::KeyUnavailable)?;

        let now = unix_now()?;
        let claims = Claims {
            sub: subject.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            sid: sid.to_string(),
            token_type,
            roles: roles.to_vec(),
            iat: now,
            exp: now + ttl.as_secs(),
            pjti: paired_jti.map(|s| s.to_string()),
        };

        let token = jsonwebtoken::encode(&Header::new(ALGORITHM), &claims, encoding)
            .map_err(JwtError::Encoding)?;

        Ok(IssuedToken { token, claims })
    }

    /// Verify a token's signature, expiry, and type, returning its claims.
    ///
    /// Does not consult the revocation ledger.
    pub fn verify(&self, raw: &str, expected: TokenType) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;

        let token_data = jsonwebtoken::decode::<Claims>(raw, self.keys.decoding(), &validation)
            .map_err(classify_decode_error)?;

        if token_data.claims.token_type != expected {
            return Err(JwtError::WrongTokenType);
        }

        Ok(token_data.claims)
    }

    /// Extract claims without checking signature or expiry.
    ///
    /// Used on the logout path so the ids of expired or otherwise dead
    /// tokens can still be inserted into the revocation ledger. Never trust
    /// the returned claims for anything beyond revocation bookkeeping.
    pub fn peek(&self, raw: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(ALGORITHM);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.set_required_spec_claims::<&str>(&[]);

        let token_data = jsonwebtoken::decode::<Claims>(raw, self.keys.decoding(), &validation)
            .map_err(JwtError::Malformed)?;

        Ok(token_data.claims)
    }
}

/// Map jsonwebtoken decode failures onto the codec's error taxonomy.
fn classify_decode_error(e: jsonwebtoken::errors::Error) -> JwtError {
    use jsonwebtoken::errors::ErrorKind;
    match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        _ => JwtError::Malformed(e),
    }
}

/// Current time as Unix seconds.
pub fn unix_now() -> Result<u64, JwtError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| JwtError::TimeError)?
        .as_secs())
}

/// Errors that can occur during token codec operations.
#[derive(Debug)]
pub enum JwtError {
    /// No signing key is loaded (verify-only key material)
    KeyUnavailable,
    /// Error signing the token
    Encoding(jsonwebtoken::errors::Error),
    /// The token structure could not be parsed
    Malformed(jsonwebtoken::errors::Error),
    /// The signature does not match the verification key
    InvalidSignature,
    /// The token is past its expiry
    Expired,
    /// Wrong token type (e.g., a refresh token presented as an access token)
    WrongTokenType,
    /// System time error
    TimeError,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::KeyUnavailable => write!(f, "No signing key available"),
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Malformed(e) => write!(f, "Malformed token: {}", e),
            JwtError::InvalidSignature => write!(f, "Invalid token signature"),
            JwtError::Expired => write!(f, "Token expired"),
            JwtError::WrongTokenType => write!(f, "Wrong token type"),
            JwtError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for JwtError {}
