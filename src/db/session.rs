//! Session family tracking.
//!
//! One row per session family (`sid`), holding the ids of the currently-live
//! access/refresh pair. Consulted when refresh reuse is detected so the whole
//! family can be revoked, not just the presented token.

use sqlx::sqlite::SqlitePool;

/// The live token pair of one session family.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub sid: String,
    pub subject: String,
    pub access_jti: String,
    pub refresh_jti: String,
}

/// Store for session family records.
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace the live pair for a session family.
    pub async fn upsert(
        &self,
        sid: &str,
        subject: &str,
        access_jti: &str,
        refresh_jti: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO sessions (sid, subject, access_jti, refresh_jti) VALUES (?, ?, ?, ?)
             ON CONFLICT(sid) DO UPDATE SET
                 access_jti = excluded.access_jti,
                 refresh_jti = excluded.refresh_jti,
                 updated_at = datetime('now')",
        )
        .bind(sid)
        .bind(subject)
        .bind(access_jti)
        .bind(refresh_jti)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get the live pair for a session family.
    pub async fn get(&self, sid: &str) -> Result<Option<SessionRecord>, sqlx::Error> {
        let row: Option<(String, String, String, String)> = sqlx::query_as(
            "SELECT sid, subject, access_jti, refresh_jti FROM sessions WHERE sid = ?",
        )
        .bind(sid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(sid, subject, access_jti, refresh_jti)| SessionRecord {
            sid,
            subject,
            access_jti,
            refresh_jti,
        }))
    }

    /// Remove a session family record (logout).
    pub async fn delete(&self, sid: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM sessions WHERE sid = ?")
            .bind(sid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Remove a session family record only if it still holds the given
    /// refresh token id. Reports whether a row was deleted.
    ///
    /// Used on the reuse-detection path: the caller read the row, revoked
    /// the pair it saw, and must not delete a row a concurrent rotation
    /// has since replaced with a fresh (unrevoked) pair.
    pub async fn delete_if_current(
        &self,
        sid: &str,
        refresh_jti: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE sid = ? AND refresh_jti = ?")
            .bind(sid)
            .bind(refresh_jti)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
