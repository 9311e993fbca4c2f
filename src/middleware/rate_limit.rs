use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Sliding-window in-memory limiter for credential endpoints (login, signup,
/// invites), keyed by whatever identifier the handler chooses.
#[derive(Clone)]
pub struct RateLimiter {
    hits: Arc<RwLock<HashMap<String, VecDeque<Instant>>>>,
    max_hits: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_hits: usize, window_secs: u64) -> Self {
        Self {
            hits: Arc::new(RwLock::new(HashMap::new())),
            max_hits,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Records an attempt for `key` and reports whether it is allowed.
    pub async fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut hits = self.hits.write().await;
        let window = hits.entry(key.to_string()).or_default();

        while window
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            window.pop_front();
        }

        if window.len() < self.max_hits {
            window.push_back(now);
            true
        } else {
            false
        }
    }

    /// Drops identifiers whose window has fully expired.
    pub async fn sweep(&self) {
        let now = Instant::now();
        let mut hits = self.hits.write().await;
        hits.retain(|_, window| {
            window.retain(|t| now.duration_since(*t) < self.window);
            !window.is_empty()
        });
        tracing::debug!(active = hits.len(), "rate limiter swept");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blocks_after_limit_within_window() {
        let limiter = RateLimiter::new(3, 60);

        assert!(limiter.allow("alice@example.com").await);
        assert!(limiter.allow("alice@example.com").await);
        assert!(limiter.allow("alice@example.com").await);
        assert!(!limiter.allow("alice@example.com").await);

        // unrelated keys are unaffected
        assert!(limiter.allow("bob@example.com").await);
    }

    #[tokio::test]
    async fn window_expiry_frees_the_key() {
        let limiter = RateLimiter::new(1, 1);
        assert!(limiter.allow("key").await);
        assert!(!limiter.allow("key").await);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(limiter.allow("key").await);
    }

    #[tokio::test]
    async fn sweep_drops_expired_identifiers() {
        let limiter = RateLimiter::new(5, 1);
        limiter.allow("a").await;
        limiter.allow("b").await;

        tokio::time::sleep(Duration::from_millis(1100)).await;
        limiter.sweep().await;

        let hits = limiter.hits.read().await;
        assert!(hits.is_empty());
    }
}
