//! Fixed-window rate limiter
//!
//! Per-process keyed counters behind an explicit interface, so a
//! distributed implementation (shared counter store) can be substituted
//! without changing callers. Window reset is lazy: a new window starts on
//! the first check after expiry, not via a background timer. Background
//! cleanup only reclaims memory for idle keys.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::RateLimitError;

/// A request quota: at most `limit` operations per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateQuota {
    /// Maximum operations per window
    pub limit: u32,

    /// Window length
    pub window: Duration,
}

impl RateQuota {
    /// Create a quota.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window }
    }

    /// `limit` operations per minute.
    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }

    /// `limit` operations per hour.
    pub fn per_hour(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(3600))
    }
}

/// Outcome of one rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    /// Whether the operation may proceed
    pub allowed: bool,

    /// Operations left in the current window
    pub remaining: u32,

    /// When the current window resets (wall clock)
    pub reset_at: DateTime<Utc>,

    /// Seconds until retry is worthwhile; set exactly when blocked
    pub retry_after_secs: Option<u64>,
}

impl RateLimitDecision {
    /// Convert a blocked decision into the error an edge returns as 429.
    pub fn as_error(&self) -> Option<RateLimitError> {
        if self.allowed {
            None
        } else {
            Some(RateLimitError::Exceeded {
                retry_after_secs: self.retry_after_secs.unwrap_or(1),
            })
        }
    }
}

/// Keyed rate limiting interface.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Check (and consume) one operation for `key` under `quota`.
    ///
    /// A blocked check does not consume quota; a rejected caller cannot
    /// extend its own block.
    async fn check(&self, key: &str, quota: RateQuota) -> RateLimitDecision;
}

/// One key's window state.
#[derive(Debug)]
struct WindowEntry {
    count: u32,
    started: Instant,
    window: Duration,
}

impl WindowEntry {
    fn expired(&self, now: Instant) -> bool {
        now >= self.started + self.window
    }
}

/// In-memory fixed-window rate limiter.
///
/// Process-local: counters are lost on restart and not shared across
/// instances. That is acceptable for a coarse request guard; horizontally
/// scaled deployments need a [`RateLimiter`] backed by a shared counter.
#[derive(Default)]
pub struct MemoryRateLimiter {
    entries: Arc<Mutex<HashMap<String, WindowEntry>>>,
}

impl MemoryRateLimiter {
    /// Create an empty limiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop entries whose window has expired.
    ///
    /// Purely a memory reclamation; correctness never depends on it
    /// because expired entries reset lazily on their next check.
    pub async fn prune_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.expired(now));
        before - entries.len()
    }

    /// Spawn a background task pruning expired entries every `interval`.
    pub fn start_cleanup(&self, interval: Duration) -> JoinHandle<()> {
        let entries = self.entries.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;

                let now = Instant::now();
                let mut entries = entries.lock().await;
                let before = entries.len();
                entries.retain(|_, entry| !entry.expired(now));

                let removed = before - entries.len();
                if removed > 0 {
                    tracing::debug!(removed, "Pruned expired rate-limit entries");
                }
            }
        })
    }

    /// Number of tracked keys.
    pub async fn tracked_keys(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl RateLimiter for MemoryRateLimiter {
    async fn check(&self, key: &str, quota: RateQuota) -> RateLimitDecision {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        let entry = entries.entry(key.to_string()).or_insert(WindowEntry {
            count: 0,
            started: now,
            window: quota.window,
        });

        // Lazy reset: the first check after expiry opens a new window.
        if entry.expired(now) {
            entry.count = 0;
            entry.started = now;
            entry.window = quota.window;
        }

        let window_remaining = (entry.started + entry.window).saturating_duration_since(now);
        let reset_at = Utc::now()
            + chrono::Duration::from_std(window_remaining)
                .unwrap_or_else(|_| chrono::Duration::zero());

        if entry.count < quota.limit {
            entry.count += 1;
            RateLimitDecision {
                allowed: true,
                remaining: quota.limit - entry.count,
                reset_at,
                retry_after_secs: None,
            }
        } else {
            let retry_after_secs = window_remaining.as_secs().max(1);
            tracing::debug!(key, retry_after_secs, "Rate limit exceeded");
            RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at,
                retry_after_secs: Some(retry_after_secs),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_counts_down_then_blocks() {
        let limiter = MemoryRateLimiter::new();
        let quota = RateQuota::per_minute(5);

        for expected_remaining in (0..5).rev() {
            let decision = limiter.check("user:42", quota).await;
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
            assert_eq!(decision.retry_after_secs, None);
        }

        // 6th call within the window
        let decision = limiter.check("user:42", quota).await;
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert!(decision.retry_after_secs.unwrap() > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_lazily() {
        let limiter = MemoryRateLimiter::new();
        let quota = RateQuota::per_minute(5);

        for _ in 0..6 {
            limiter.check("k", quota).await;
        }
        assert!(!limiter.check("k", quota).await.allowed);

        // Past the window boundary a fresh window opens on the next check.
        tokio::time::advance(Duration::from_millis(60_001)).await;

        let decision = limiter.check("k", quota).await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, quota.limit - 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hourly_quota_boundary() {
        let limiter = MemoryRateLimiter::new();
        let quota = RateQuota::per_hour(1000);

        for _ in 0..1000 {
            assert!(limiter.check("api:key", quota).await.allowed);
        }

        let blocked = limiter.check("api:key", quota).await;
        assert!(!blocked.allowed);
        assert!(blocked.retry_after_secs.unwrap() > 0);

        // One millisecond past the hour boundary
        tokio::time::advance(Duration::from_millis(3_600_001)).await;

        let decision = limiter.check("api:key", quota).await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 999);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_check_does_not_consume_quota() {
        let limiter = MemoryRateLimiter::new();
        let quota = RateQuota::new(1, Duration::from_secs(60));

        assert!(limiter.check("k", quota).await.allowed);

        // Hammering while blocked must not push the reset out.
        for _ in 0..10 {
            assert!(!limiter.check("k", quota).await.allowed);
        }

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(limiter.check("k", quota).await.allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let limiter = MemoryRateLimiter::new();
        let quota = RateQuota::new(1, Duration::from_secs(60));

        assert!(limiter.check("user:a", quota).await.allowed);
        assert!(!limiter.check("user:a", quota).await.allowed);

        // Another key is unaffected
        assert!(limiter.check("user:b", quota).await.allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_reclaims_expired_entries_only() {
        let limiter = MemoryRateLimiter::new();

        limiter
            .check("short", RateQuota::new(5, Duration::from_secs(10)))
            .await;
        limiter.check("long", RateQuota::per_hour(5)).await;
        assert_eq!(limiter.tracked_keys().await, 2);

        tokio::time::advance(Duration::from_secs(11)).await;

        assert_eq!(limiter.prune_expired().await, 1);
        assert_eq!(limiter.tracked_keys().await, 1);

        // Pruning does not change what a caller observes
        let decision = limiter
            .check("short", RateQuota::new(5, Duration::from_secs(10)))
            .await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_decision_converts_to_error() {
        let limiter = MemoryRateLimiter::new();
        let quota = RateQuota::new(1, Duration::from_secs(60));

        let allowed = limiter.check("k", quota).await;
        assert_eq!(allowed.as_error(), None);

        let blocked = limiter.check("k", quota).await;
        let err = blocked.as_error().unwrap();
        assert_eq!(err.status_code(), 429);
    }

    #[test]
    fn test_quota_presets() {
        assert_eq!(RateQuota::per_minute(30).window, Duration::from_secs(60));
        assert_eq!(RateQuota::per_hour(1000).window, Duration::from_secs(3600));
        assert_eq!(RateQuota::per_hour(1000).limit, 1000);
    }
}
