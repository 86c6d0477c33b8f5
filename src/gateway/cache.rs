//! Edge validation cache.
//!
//! Maps raw bearer tokens to validation verdicts so the gateway can approve
//! repeat requests without a round trip to the authority. Entries are keyed
//! by the exact token string: a forged token with a guessed id must never
//! borrow another token's cached verdict.
//!
//! Staleness is the deliberate trade-off here: once a token is revoked at
//! the authority, an edge holding a positive verdict keeps honoring it until
//! that entry's TTL lapses. Both TTLs are explicit configuration, and a
//! positive entry is additionally capped at the token's own expiry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Notify;
use tracing::{debug, warn};

use super::client::AuthorityClient;
use super::context::AuthContext;

/// How long a waiter sticks with an in-flight leader before validating on
/// its own. Generous relative to the authority client timeout.
const FLIGHT_WAIT: Duration = Duration::from_secs(5);

/// Sweep expired entries once the map grows past this size.
const SWEEP_WATERMARK: usize = 1024;

/// Cache TTL configuration. Shorter positive TTL narrows the revocation
/// staleness window at the cost of more authority traffic.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lifetime of a confirmed-valid verdict
    pub positive_ttl: Duration,
    /// Lifetime of a confirmed-invalid verdict
    pub negative_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            positive_ttl: Duration::from_secs(60),
            negative_ttl: Duration::from_secs(10),
        }
    }
}

/// Outcome of a validation check.
#[derive(Debug, Clone)]
pub enum Verdict {
    Valid(AuthContext),
    Invalid,
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid(_))
    }
}

struct Entry {
    verdict: Verdict,
    expires_at: Instant,
}

/// TTL-bounded validation cache in front of an [`AuthorityClient`].
///
/// Concurrent misses on the same token collapse into a single upstream call
/// (single-flight); authority failures are fail-closed and never cached.
pub struct ValidationCache {
    client: Arc<dyn AuthorityClient>,
    config: CacheConfig,
    entries: RwLock<HashMap<String, Entry>>,
    inflight: Mutex<HashMap<String, Arc<Notify>>>,
}

impl ValidationCache {
    pub fn new(client: Arc<dyn AuthorityClient>, config: CacheConfig) -> Self {
        Self {
            client,
            config,
            entries: RwLock::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Check a raw bearer token, consulting the authority on a miss.
    ///
    /// Never returns `Valid` unless either a live cached verdict or the
    /// authority itself said so; any infrastructure failure on the miss
    /// path yields `Invalid`.
    pub async fn check(&self, raw_token: &str) -> Verdict {
        if let Some(verdict) = self.lookup(raw_token) {
            return verdict;
        }

        // Single-flight: the first miss becomes the leader, later misses
        // wait for its verdict instead of stampeding the authority.
        let (notify, is_leader) = {
            let mut inflight = self.inflight.lock().expect("inflight lock poisoned");
            match inflight.get(raw_token) {
                Some(notify) => (notify.clone(), false),
                None => {
                    let notify = Arc::new(Notify::new());
                    inflight.insert(raw_token.to_string(), notify.clone());
                    (notify, true)
                }
            }
        };

        if is_leader {
            // The guard removes the registration and wakes waiters even if
            // this future is dropped mid-fetch (client disconnect cancels
            // the handler); a leaked entry would stall every later miss.
            let _guard = FlightGuard {
                cache: self,
                key: raw_token.to_string(),
                notify,
            };
            return self.fetch(raw_token).await;
        }

        let notified = notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        // The leader may have finished between our miss and registering
        if let Some(verdict) = self.lookup(raw_token) {
            return verdict;
        }

        let _ = tokio::time::timeout(FLIGHT_WAIT, notified).await;
        if let Some(verdict) = self.lookup(raw_token) {
            return verdict;
        }
        // Leader failed or timed out; drop its stale registration so the
        // next miss leads again, then validate for ourselves.
        self.evict_flight(raw_token, &notify);
        self.fetch(raw_token).await
    }

    /// Remove an in-flight registration, but only if it is still the one
    /// the caller saw; a newer leader's entry must stay. Always wakes
    /// waiters parked on the evicted `Notify`.
    fn evict_flight(&self, key: &str, notify: &Arc<Notify>) {
        let mut inflight = self.inflight.lock().expect("inflight lock poisoned");
        if inflight.get(key).is_some_and(|n| Arc::ptr_eq(n, notify)) {
            inflight.remove(key);
        }
        drop(inflight);
        notify.notify_waiters();
    }

    /// Look up a live cached verdict.
    fn lookup(&self, raw_token: &str) -> Option<Verdict> {
        let entries = self.entries.read().expect("entries lock poisoned");
        let entry = entries.get(raw_token)?;
        if entry.expires_at > Instant::now() {
            Some(entry.verdict.clone())
        } else {
            None
        }
    }

    /// Ask the authority and cache the answer.
    async fn fetch(&self, raw_token: &str) -> Verdict {
        match self.client.validate(raw_token).await {
            Ok(Some(ctx)) => {
                let ttl = self.positive_ttl_for(&ctx);
                let verdict = Verdict::Valid(ctx);
                self.store(raw_token, verdict.clone(), ttl);
                verdict
            }
            Ok(None) => {
                self.store(raw_token, Verdict::Invalid, self.config.negative_ttl);
                Verdict::Invalid
            }
            Err(e) => {
                // Fail closed, and do not cache: the token itself was not
                // judged, the infrastructure was.
                warn!("Validation call failed, rejecting: {}", e);
                Verdict::Invalid
            }
        }
    }

    /// Positive TTL, capped so a verdict never outlives the token itself.
    fn positive_ttl_for(&self, ctx: &AuthContext) -> Duration {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();
        let until_expiry = Duration::from_secs(ctx.expires_at.saturating_sub(now));
        self.config.positive_ttl.min(until_expiry)
    }

    fn store(&self, raw_token: &str, verdict: Verdict, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let mut entries = self.entries.write().expect("entries lock poisoned");
        if entries.len() >= SWEEP_WATERMARK {
            let now = Instant::now();
            let before = entries.len();
            entries.retain(|_, entry| entry.expires_at > now);
            debug!("Swept {} expired cache entries", before - entries.len());
        }
        entries.insert(
            raw_token.to_string(),
            Entry {
                verdict,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

/// Releases a leader's in-flight registration on drop, whether the fetch
/// finished or the future was dropped mid-flight.
struct FlightGuard<'a> {
    cache: &'a ValidationCache,
    key: String,
    notify: Arc<Notify>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.cache.evict_flight(&self.key, &self.notify);
    }
}
