//! Durable revocation ledger keyed by token id.
//!
//! The single source of truth for "this token id must never be honored
//! again". Rows are append-only; retention is handled by the cleanup sweep.

use sqlx::sqlite::SqlitePool;

/// Store for revoked token ids.
pub struct RevocationStore {
    pool: SqlitePool,
}

impl RevocationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a token id into the ledger. Idempotent: revoking an
    /// already-revoked id is a no-op, not an error.
    pub async fn revoke(&self, jti: &str) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT OR IGNORE INTO revoked_tokens (jti) VALUES (?)")
            .bind(jti)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Insert a token id and report whether this call inserted it.
    ///
    /// The single-statement insert is the atomic compare-and-set that
    /// decides the winner when the same refresh token is presented twice:
    /// exactly one caller sees `true`, every other caller sees `false`.
    pub async fn consume(&self, jti: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("INSERT OR IGNORE INTO revoked_tokens (jti) VALUES (?)")
            .bind(jti)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke several token ids in one transaction. Idempotent.
    pub async fn revoke_all(&self, jtis: &[&str]) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for jti in jtis {
            sqlx::query("INSERT OR IGNORE INTO revoked_tokens (jti) VALUES (?)")
                .bind(jti)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Check whether a token id has been revoked.
    ///
    /// A revoke that committed before this lookup began is guaranteed to be
    /// visible. Callers must treat a store error as fail-closed: unable to
    /// confirm "not revoked" means the token cannot be reported valid.
    pub async fn is_revoked(&self, jti: &str) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM revoked_tokens WHERE jti = ?")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Delete ledger rows older than the given age in seconds.
    ///
    /// Safe once the age exceeds the longest token lifetime: a token whose
    /// revocation record aged out is already rejected by expiry alone.
    pub async fn delete_older_than(&self, age_secs: u64) -> Result<u64, sqlx::Error> {
        let modifier = format!("-{} seconds", age_secs);
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE revoked_at < datetime('now', ?)")
            .bind(modifier)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
