//! Fixed-window rate limiting.
//!
//! Counters live behind [`RateLimitStore`] so the in-process map can be
//! replaced by a shared store without touching the window algorithm.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time;

use crate::observability::metrics;

pub const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
pub const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
pub const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Counter state for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    /// Requests observed in the current window.
    pub count: u32,
    /// Absolute time (ms since epoch) at which the window ends.
    pub reset_at_ms: u64,
}

/// Storage for rate-limit counters.
pub trait RateLimitStore: Send + Sync {
    fn get(&self, key: &str) -> Option<RateLimitEntry>;

    fn set(&self, key: &str, entry: RateLimitEntry);

    /// Read-modify-write one entry.
    ///
    /// The default composes `get` and `set` and is not atomic; stores that
    /// can lock a key should override it.
    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<RateLimitEntry>) -> RateLimitEntry,
    ) -> RateLimitEntry {
        let next = f(self.get(key));
        self.set(key, next);
        next
    }

    /// Drop entries whose window ended at or before `now_ms`. Returns the number removed.
    fn remove_expired(&self, now_ms: u64) -> usize;

    /// Number of keys currently tracked.
    fn tracked_keys(&self) -> usize;
}

/// Process-local store. Lives as long as the process.
#[derive(Default)]
pub struct MemoryRateLimitStore {
    entries: DashMap<String, RateLimitEntry>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for MemoryRateLimitStore {
    fn get(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries.get(key).map(|e| *e.value())
    }

    fn set(&self, key: &str, entry: RateLimitEntry) {
        self.entries.insert(key.to_string(), entry);
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<RateLimitEntry>) -> RateLimitEntry,
    ) -> RateLimitEntry {
        // The shard lock is held for the whole read-modify-write.
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let next = f(Some(*occupied.get()));
                occupied.insert(next);
                next
            }
            Entry::Vacant(vacant) => {
                let next = f(None);
                vacant.insert(next);
                next
            }
        }
    }

    fn remove_expired(&self, now_ms: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.reset_at_ms > now_ms);
        before.saturating_sub(self.entries.len())
    }

    fn tracked_keys(&self) -> usize {
        self.entries.len()
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Seconds until the window resets.
    pub reset_secs: u64,
}

impl RateLimitDecision {
    /// `RateLimit-*` headers for this decision.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(3);
        headers.insert(RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(RATELIMIT_RESET, HeaderValue::from(self.reset_secs));
        headers
    }
}

/// Fixed-window limiter over a shared store.
#[derive(Clone)]
pub struct FixedWindowLimiter {
    store: Arc<dyn RateLimitStore>,
}

impl FixedWindowLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryRateLimitStore::new()))
    }

    pub fn store(&self) -> &Arc<dyn RateLimitStore> {
        &self.store
    }

    /// Count a request against `key` at the current wall-clock time.
    pub fn check(&self, key: &str, limit: u32, window_ms: u64) -> RateLimitDecision {
        self.check_at(key, limit, window_ms, now_ms())
    }

    /// Count a request against `key` at `now_ms`.
    pub fn check_at(&self, key: &str, limit: u32, window_ms: u64, now_ms: u64) -> RateLimitDecision {
        let mut fresh = false;
        let entry = self.store.update(key, &mut |current| match current {
            Some(entry) if entry.reset_at_ms > now_ms => RateLimitEntry {
                count: entry.count.saturating_add(1),
                reset_at_ms: entry.reset_at_ms,
            },
            _ => {
                fresh = true;
                RateLimitEntry {
                    count: 1,
                    reset_at_ms: now_ms + window_ms,
                }
            }
        });

        if fresh {
            return RateLimitDecision {
                allowed: true,
                limit,
                remaining: limit.saturating_sub(1),
                reset_secs: window_ms.div_ceil(1000),
            };
        }

        RateLimitDecision {
            allowed: entry.count <= limit,
            limit,
            remaining: limit.saturating_sub(entry.count),
            reset_secs: entry.reset_at_ms.saturating_sub(now_ms).div_ceil(1000),
        }
    }
}

/// Build the counter key `{identifier}:{client}`.
///
/// The client is the first `X-Forwarded-For` entry, else the peer IP, else
/// `"unknown"`.
pub fn client_key(identifier: &str, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    format!("{identifier}:{}", client_address(headers, peer))
}

pub fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match (forwarded, peer) {
        (Some(ip), _) => ip.to_string(),
        (None, Some(addr)) => addr.ip().to_string(),
        (None, None) => "unknown".to_string(),
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Background task that evicts expired counters.
pub struct RateLimitSweeper {
    store: Arc<dyn RateLimitStore>,
    interval: Duration,
}

impl RateLimitSweeper {
    pub fn new(store: Arc<dyn RateLimitStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Rate limit sweeper starting");

        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately; nothing to sweep yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.store.remove_expired(now_ms());
                    let tracked = self.store.tracked_keys();
                    metrics::record_rate_limit_entries(tracked);
                    if removed > 0 {
                        tracing::debug!(removed, tracked, "Swept expired rate limit entries");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate limit sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: u64 = 60_000;

    #[test]
    fn test_window_reset() {
        let limiter = FixedWindowLimiter::in_memory();
        let start = 1_000_000;

        for i in 0..5 {
            let d = limiter.check_at("contact:post:1.2.3.4", 5, WINDOW, start + i * 100);
            assert!(d.allowed, "request {} should pass", i + 1);
        }

        let sixth = limiter.check_at("contact:post:1.2.3.4", 5, WINDOW, start + 1_000);
        assert!(!sixth.allowed);
        assert_eq!(sixth.remaining, 0);

        let after = limiter.check_at("contact:post:1.2.3.4", 5, WINDOW, start + WINDOW);
        assert!(after.allowed);
        assert_eq!(after.remaining, 4);
        assert_eq!(
            limiter.store().get("contact:post:1.2.3.4"),
            Some(RateLimitEntry {
                count: 1,
                reset_at_ms: start + 2 * WINDOW
            })
        );
    }

    #[test]
    fn test_key_isolation() {
        let limiter = FixedWindowLimiter::in_memory();
        let now = 5_000;

        for _ in 0..10 {
            assert!(limiter.check_at("blog:post:9.9.9.9", 10, WINDOW, now).allowed);
        }
        assert!(!limiter.check_at("blog:post:9.9.9.9", 10, WINDOW, now).allowed);

        let other = limiter.check_at("blog:delete:9.9.9.9", 10, WINDOW, now);
        assert!(other.allowed);
        assert_eq!(other.remaining, 9);
    }

    #[test]
    fn test_headers_on_first_and_later_requests() {
        let limiter = FixedWindowLimiter::in_memory();

        let first = limiter.check_at("k", 3, 1_500, 10_000);
        assert_eq!(first.reset_secs, 2);
        assert_eq!(first.remaining, 2);

        let second = limiter.check_at("k", 3, 1_500, 10_600);
        assert_eq!(second.reset_secs, 1);
        assert_eq!(second.remaining, 1);

        let headers = second.headers();
        assert_eq!(headers[&RATELIMIT_LIMIT], "3");
        assert_eq!(headers[&RATELIMIT_REMAINING], "1");
        assert_eq!(headers[&RATELIMIT_RESET], "1");
    }

    #[test]
    fn test_rejected_requests_still_report_headers() {
        let limiter = FixedWindowLimiter::in_memory();
        limiter.check_at("k", 1, WINDOW, 0);
        let denied = limiter.check_at("k", 1, WINDOW, 30_000);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.reset_secs, 30);
    }

    #[test]
    fn test_remove_expired() {
        let store = MemoryRateLimitStore::new();
        store.set("old", RateLimitEntry { count: 3, reset_at_ms: 100 });
        store.set("edge", RateLimitEntry { count: 1, reset_at_ms: 200 });
        store.set("live", RateLimitEntry { count: 1, reset_at_ms: 500 });

        assert_eq!(store.remove_expired(200), 2);
        assert_eq!(store.tracked_keys(), 1);
        assert!(store.get("live").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_expired_and_exits_on_shutdown() {
        let store: Arc<dyn RateLimitStore> = Arc::new(MemoryRateLimitStore::new());
        store.set("expired", RateLimitEntry { count: 4, reset_at_ms: 0 });
        store.set("live", RateLimitEntry { count: 1, reset_at_ms: u64::MAX });

        let (tx, rx) = broadcast::channel(1);
        let sweeper = RateLimitSweeper::new(store.clone(), Duration::from_secs(60));
        let task = tokio::spawn(sweeper.run(rx));

        time::sleep(Duration::from_secs(30)).await;
        assert!(store.get("expired").is_some(), "no sweep before the first interval");

        time::sleep(Duration::from_secs(31)).await;
        assert!(store.get("expired").is_none());
        assert!(store.get("live").is_some());
        assert_eq!(store.tracked_keys(), 1);

        tx.send(()).unwrap();
        time::timeout(Duration::from_secs(1), task)
            .await
            .expect("sweeper exits after shutdown")
            .unwrap();
    }

    #[test]
    fn test_default_update_composes_get_and_set() {
        struct Plain(std::sync::Mutex<std::collections::HashMap<String, RateLimitEntry>>);

        impl RateLimitStore for Plain {
            fn get(&self, key: &str) -> Option<RateLimitEntry> {
                self.0.lock().unwrap().get(key).copied()
            }
            fn set(&self, key: &str, entry: RateLimitEntry) {
                self.0.lock().unwrap().insert(key.to_string(), entry);
            }
            fn remove_expired(&self, _now_ms: u64) -> usize {
                0
            }
            fn tracked_keys(&self) -> usize {
                self.0.lock().unwrap().len()
            }
        }

        let limiter = FixedWindowLimiter::new(Arc::new(Plain(Default::default())));
        assert!(limiter.check_at("k", 2, WINDOW, 0).allowed);
        assert!(limiter.check_at("k", 2, WINDOW, 1).allowed);
        assert!(!limiter.check_at("k", 2, WINDOW, 2).allowed);
    }

    #[test]
    fn test_client_key() {
        let mut headers = HeaderMap::new();
        let peer: SocketAddr = "10.0.0.7:5000".parse().unwrap();

        assert_eq!(client_key("blog:post", &headers, None), "blog:post:unknown");
        assert_eq!(client_key("blog:post", &headers, Some(peer)), "blog:post:10.0.0.7");

        headers.insert("x-forwarded-for", HeaderValue::from_static(" 203.0.113.9 , 10.0.0.1"));
        assert_eq!(client_key("blog:post", &headers, Some(peer)), "blog:post:203.0.113.9");
    }
}
