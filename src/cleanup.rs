//! Scheduled retention sweep for the revocation ledger.

use crate::db::Database;
use std::time::Duration;
use tracing::{error, info};

/// Ledger rows older than this are deleted. Must exceed the longest token
/// lifetime so no live token's revocation record can age out.
const LEDGER_RETENTION_SECS: u64 = 30 * 24 * 60 * 60;

/// Interval between sweep runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Run the retention sweep once.
pub async fn run_cleanup(db: &Database) {
    match db.revocations().delete_older_than(LEDGER_RETENTION_SECS).await {
        Ok(count) if count > 0 => info!("Swept {} aged-out revocation records", count),
        Ok(_) => {}
        Err(e) => error!("Failed to sweep revocation ledger: {}", e),
    }
}

/// Spawn a background task that runs the sweep periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler(db: Database) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

        loop {
            interval.tick().await;
            run_cleanup(&db).await;
        }
    })
}
