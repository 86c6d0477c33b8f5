//! Token issuance and session lifecycle.
//!
//! Dual-token sessions: a short-lived access token and a long-lived refresh
//! token sharing a session family id (`sid`). Refresh consumes the presented
//! token exactly once; logout revokes both ids. Presenting an
//! already-consumed refresh token is treated as a security event and kills
//! the whole family.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::db::Database;
use crate::jwt::{IssuedToken, JwtError, TokenCodec, TokenType};

/// Default access token duration: 5 minutes
pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(5 * 60);

/// Default refresh token duration: 2 weeks
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(14 * 24 * 60 * 60);

/// An access/refresh pair issued together.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// A verified caller identity, as reported by the credential boundary.
#[derive(Debug, Clone)]
pub struct Subject {
    pub id: String,
    pub roles: Vec<String>,
}

/// Boundary for the out-of-scope login flow. Implementations own password
/// hashing, directory lookups, and whatever else "credential check" means.
pub trait CredentialVerifier: Send + Sync {
    /// Returns the subject on success, `None` on bad credentials.
    fn verify(&self, username: &str, secret: &str) -> Option<Subject>;
}

/// Credential verifier backed by a fixed set of entries, one per line:
/// `username:secret:role1,role2`. Suitable for small deployments and tests.
pub struct StaticCredentialVerifier {
    entries: HashMap<String, (String, Subject)>,
}

impl StaticCredentialVerifier {
    pub fn from_lines(content: &str) -> Result<Self, String> {
        let mut entries = HashMap::new();
        for (i, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.splitn(3, ':');
            let (Some(username), Some(secret)) = (parts.next(), parts.next()) else {
                return Err(format!("Line {}: expected username:secret[:roles]", i + 1));
            };
            if username.is_empty() || secret.is_empty() {
                return Err(format!("Line {}: empty username or secret", i + 1));
            }
            let roles: Vec<String> = parts
                .next()
                .unwrap_or("")
                .split(',')
                .filter(|r| !r.is_empty())
                .map(|r| r.trim().to_string())
                .collect();
            let subject = Subject {
                id: username.to_string(),
                roles,
            };
            entries.insert(username.to_string(), (secret.to_string(), subject));
        }
        Ok(Self { entries })
    }

    pub fn from_file(path: &str) -> Result<Self, String> {
        let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        Self::from_lines(&content)
    }
}

impl CredentialVerifier for StaticCredentialVerifier {
    fn verify(&self, username: &str, secret: &str) -> Option<Subject> {
        let (expected, subject) = self.entries.get(username)?;
        if expected == secret {
            Some(subject.clone())
        } else {
            None
        }
    }
}

/// Authority-side session service: owns issuance, rotation, and revocation.
pub struct SessionService {
    codec: Arc<TokenCodec>,
    db: Database,
    verifier: Arc<dyn CredentialVerifier>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl SessionService {
    pub fn new(
        codec: Arc<TokenCodec>,
        db: Database,
        verifier: Arc<dyn CredentialVerifier>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            codec,
            db,
            verifier,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Access token duration, exposed so the API can report `expires_in`.
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Issue a fresh pair for a subject under the given session family.
    fn issue_pair(&self, subject: &Subject, sid: &str) -> Result<TokenPair, SessionError> {
        let access = self.codec.issue(
            &subject.id,
            sid,
            TokenType::Access,
            self.access_ttl,
            &subject.roles,
            None,
        )?;
        let refresh = self.codec.issue(
            &subject.id,
            sid,
            TokenType::Refresh,
            self.refresh_ttl,
            &subject.roles,
            Some(&access.claims.jti),
        )?;
        Ok(TokenPair { access, refresh })
    }

    /// Verify credentials and start a new session.
    pub async fn login(&self, username: &str, secret: &str) -> Result<TokenPair, SessionError> {
        let subject = self
            .verifier
            .verify(username, secret)
            .ok_or(SessionError::InvalidCredentials)?;

        let sid = uuid::Uuid::new_v4().to_string();
        let pair = self.issue_pair(&subject, &sid)?;

        self.db
            .sessions()
            .upsert(
                &sid,
                &subject.id,
                &pair.access.claims.jti,
                &pair.refresh.claims.jti,
            )
            .await?;

        Ok(pair)
    }

    /// Rotate a refresh token into a new pair.
    ///
    /// The presented token is consumed atomically: of any number of
    /// concurrent calls with the same token, exactly one wins. A loser means
    /// the token was already rotated (or logged out) -- possible theft -- so
    /// the family's live pair is revoked too before reporting
    /// `ReuseDetected`.
    pub async fn refresh(&self, raw_refresh: &str) -> Result<TokenPair, SessionError> {
        let claims = self.codec.verify(raw_refresh, TokenType::Refresh)?;

        let consumed = self.db.revocations().consume(&claims.jti).await?;
        if !consumed {
            warn!(sid = %claims.sid, sub = %claims.sub, "Refresh token reuse detected");
            if let Some(session) = self.db.sessions().get(&claims.sid).await? {
                self.db
                    .revocations()
                    .revoke_all(&[&session.access_jti, &session.refresh_jti])
                    .await?;
                // Only delete the row holding the pair we just revoked; a
                // concurrent rotation may have installed a fresh pair that
                // must stay tracked for future family revocation.
                self.db
                    .sessions()
                    .delete_if_current(&claims.sid, &session.refresh_jti)
                    .await?;
            }
            return Err(SessionError::ReuseDetected);
        }

        // Winner: retire the paired access token alongside the consumed
        // refresh token, then mint the replacement pair under the same sid.
        if let Some(paired) = claims.pjti.as_deref() {
            self.db.revocations().revoke(paired).await?;
        }

        let subject = Subject {
            id: claims.sub.clone(),
            roles: claims.roles.clone(),
        };
        let pair = self.issue_pair(&subject, &claims.sid)?;

        self.db
            .sessions()
            .upsert(
                &claims.sid,
                &subject.id,
                &pair.access.claims.jti,
                &pair.refresh.claims.jti,
            )
            .await?;

        Ok(pair)
    }

    /// End a session by revoking the presented tokens' ids.
    ///
    /// Idempotent, and deliberately lax about token state: expired or
    /// unparseable tokens are skipped rather than rejected, so logging out
    /// twice (or with a dead token) is never an error.
    pub async fn logout(
        &self,
        raw_access: Option<&str>,
        raw_refresh: Option<&str>,
    ) -> Result<(), SessionError> {
        let mut jtis: Vec<String> = Vec::new();
        let mut sid: Option<String> = None;

        for raw in [raw_access, raw_refresh].into_iter().flatten() {
            if let Ok(claims) = self.codec.peek(raw) {
                jtis.push(claims.jti);
                if let Some(paired) = claims.pjti {
                    jtis.push(paired);
                }
                sid.get_or_insert(claims.sid);
            }
        }

        if !jtis.is_empty() {
            let refs: Vec<&str> = jtis.iter().map(|s| s.as_str()).collect();
            self.db.revocations().revoke_all(&refs).await?;
        }
        if let Some(sid) = sid {
            self.db.sessions().delete(&sid).await?;
        }

        Ok(())
    }
}

/// Errors from the session service.
#[derive(Debug)]
pub enum SessionError {
    /// Credential check failed
    InvalidCredentials,
    /// The presented token failed codec verification
    InvalidToken(JwtError),
    /// A refresh token was presented after it had already been consumed
    ReuseDetected,
    /// The revocation ledger or session store is unreachable
    Store(sqlx::Error),
}

impl From<JwtError> for SessionError {
    fn from(e: JwtError) -> Self {
        SessionError::InvalidToken(e)
    }
}

impl From<sqlx::Error> for SessionError {
    fn from(e: sqlx::Error) -> Self {
        SessionError::Store(e)
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::InvalidCredentials => write!(f, "Invalid credentials"),
            SessionError::InvalidToken(e) => write!(f, "Invalid token: {}", e),
            SessionError::ReuseDetected => write!(f, "Refresh token reuse detected"),
            SessionError::Store(e) => write!(f, "Store unavailable: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}
