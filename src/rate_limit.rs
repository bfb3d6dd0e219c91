//! Per-client fixed-window rate limiting.
//!
//! State lives in memory and is scoped to one running process, so
//! enforcement across several instances is best-effort.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{debug, info};

use crate::metrics::RATE_LIMIT_CLIENTS;

// Rate limit entry - tracks accepted requests per client
#[derive(Debug, Clone)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_end: Instant,
}

/// Outcome of a single rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    /// Time left until the client's window resets.
    Denied { retry_after: Duration },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Storage-agnostic rate limiter used by the proxy handler.
///
/// The in-memory implementation below is the default; a shared counter
/// store can implement this trait to enforce one limit across instances.
#[async_trait]
pub trait RateLimitBackend: Send + Sync {
    /// Count one request for `client_id`, or deny it if the quota is used up.
    async fn check(&self, client_id: &str) -> Decision;

    /// Drop entries whose window has ended. Returns how many were removed.
    async fn sweep(&self) -> usize {
        0
    }

    /// Number of clients currently tracked.
    fn tracked_clients(&self) -> usize;
}

pub struct InMemoryRateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    max_requests: u32,
    window: Duration,
}

impl InMemoryRateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Check-and-increment against an explicit clock reading.
    ///
    /// The entry guard holds the shard lock for the whole read-modify-write,
    /// so concurrent checks for one key cannot both take the last slot.
    pub fn check_at(&self, client_id: &str, now: Instant) -> Decision {
        let window = self.window;
        let mut entry = self
            .entries
            .entry(client_id.to_string())
            .or_insert_with(|| RateLimitEntry {
                count: 0,
                window_end: now + window,
            });

        // window over? start a fresh one
        if now > entry.window_end {
            entry.count = 0;
            entry.window_end = now + window;
        }

        if entry.count >= self.max_requests {
            return Decision::Denied {
                retry_after: entry.window_end.saturating_duration_since(now),
            };
        }

        entry.count += 1;
        Decision::Allowed
    }

    /// Remove every entry whose window ended before `now`.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let live = now <= entry.window_end;
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }

    pub fn entry(&self, client_id: &str) -> Option<RateLimitEntry> {
        self.entries.get(client_id).map(|e| e.value().clone())
    }
}

#[async_trait]
impl RateLimitBackend for InMemoryRateLimiter {
    async fn check(&self, client_id: &str) -> Decision {
        self.check_at(client_id, Instant::now())
    }

    async fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    fn tracked_clients(&self) -> usize {
        self.entries.len()
    }
}

// Housekeeping loop - runs for the lifetime of the process
pub async fn sweeper(limiter: Arc<dyn RateLimitBackend>, period: Duration) {
    let mut interval = interval(period);

    info!(?period, "Rate limit sweeper started");

    loop {
        interval.tick().await;

        let removed = limiter.sweep().await;
        let remaining = limiter.tracked_clients();
        RATE_LIMIT_CLIENTS.set(remaining as f64);

        if removed > 0 {
            debug!(removed, remaining, "Swept expired rate limit entries");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(300);

    #[test]
    fn allows_up_to_max_requests() {
        let limiter = InMemoryRateLimiter::new(5, WINDOW);
        let now = Instant::now();
        for _ in 0..5 {
            assert_eq!(limiter.check_at("1.2.3.4", now), Decision::Allowed);
        }
        assert_eq!(limiter.entry("1.2.3.4").unwrap().count, 5);
    }

    #[test]
    fn request_over_max_is_denied_with_retry_hint() {
        let limiter = InMemoryRateLimiter::new(5, WINDOW);
        let start = Instant::now();
        for _ in 0..5 {
            assert!(limiter.check_at("1.2.3.4", start).is_allowed());
        }

        let later = start + Duration::from_secs(60);
        match limiter.check_at("1.2.3.4", later) {
            Decision::Denied { retry_after } => {
                assert!(retry_after > Duration::ZERO);
                assert!(retry_after <= WINDOW);
                assert_eq!(retry_after, Duration::from_secs(240));
            }
            Decision::Allowed => panic!("sixth request should be denied"),
        }
        // denied requests are not counted
        assert_eq!(limiter.entry("1.2.3.4").unwrap().count, 5);
    }

    #[test]
    fn window_expiry_resets_the_counter() {
        let limiter = InMemoryRateLimiter::new(2, WINDOW);
        let start = Instant::now();
        assert!(limiter.check_at("c", start).is_allowed());
        assert!(limiter.check_at("c", start).is_allowed());
        assert!(!limiter.check_at("c", start).is_allowed());

        // the window end itself still belongs to the old window
        assert!(!limiter.check_at("c", start + WINDOW).is_allowed());

        let after = start + WINDOW + Duration::from_millis(1);
        assert!(limiter.check_at("c", after).is_allowed());
        let entry = limiter.entry("c").unwrap();
        assert_eq!(entry.count, 1);
        assert_eq!(entry.window_end, after + WINDOW);
    }

    #[test]
    fn different_clients_are_independent() {
        let limiter = InMemoryRateLimiter::new(1, WINDOW);
        let now = Instant::now();
        assert!(limiter.check_at("a", now).is_allowed());
        assert!(!limiter.check_at("a", now).is_allowed());
        assert!(limiter.check_at("b", now).is_allowed());
    }

    #[test]
    fn zero_max_denies_everything() {
        let limiter = InMemoryRateLimiter::new(0, WINDOW);
        assert!(!limiter.check_at("a", Instant::now()).is_allowed());
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let limiter = InMemoryRateLimiter::new(5, WINDOW);
        let start = Instant::now();
        limiter.check_at("old", start);
        limiter.check_at("new", start + Duration::from_secs(120));

        assert_eq!(limiter.sweep_at(start + WINDOW), 0);

        let removed = limiter.sweep_at(start + WINDOW + Duration::from_secs(1));
        assert_eq!(removed, 1);
        assert!(limiter.entry("old").is_none());
        assert!(limiter.entry("new").is_some());
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn concurrent_checks_never_exceed_max() {
        let limiter = Arc::new(InMemoryRateLimiter::new(5, WINDOW));
        let now = Instant::now();

        let admitted: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..32)
                .map(|_| {
                    let limiter = Arc::clone(&limiter);
                    scope.spawn(move || limiter.check_at("shared", now).is_allowed() as usize)
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(admitted, 5);
        assert_eq!(limiter.entry("shared").unwrap().count, 5);
    }

    #[tokio::test]
    async fn backend_trait_counts_through_the_real_clock() {
        let limiter: Arc<dyn RateLimitBackend> =
            Arc::new(InMemoryRateLimiter::new(1, Duration::from_secs(60)));
        assert_eq!(limiter.check("x").await, Decision::Allowed);
        assert!(!limiter.check("x").await.is_allowed());
        assert_eq!(limiter.sweep().await, 0);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[tokio::test]
    async fn sweeper_clears_expired_entries_in_background() {
        let limiter = Arc::new(InMemoryRateLimiter::new(1, Duration::from_millis(10)));
        limiter.check("x").await;

        let task = tokio::spawn(sweeper(limiter.clone(), Duration::from_millis(20)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        task.abort();

        assert_eq!(limiter.tracked_clients(), 0);
    }
}
