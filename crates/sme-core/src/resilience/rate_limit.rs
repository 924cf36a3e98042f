//! Per-user message rate limiting (fixed window)

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::warn;

use crate::config::BotConfig;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum messages per window
    pub max_requests: u32,
    /// Time window for rate limiting
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
        }
    }
}

impl From<&BotConfig> for RateLimitConfig {
    fn from(config: &BotConfig) -> Self {
        Self {
            max_requests: config.rate_limit_per_user,
            window: Duration::from_secs(config.rate_limit_window_secs),
        }
    }
}

#[derive(Debug, Clone)]
struct UserWindow {
    count: u32,
    window_start: Instant,
}

/// In-memory rate limiter keyed by LINE user id
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    users: Arc<RwLock<HashMap<String, UserWindow>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::default())
    }

    pub fn with_config(config: RateLimitConfig) -> Self {
        Self {
            config,
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Count one message for the user; false when over the limit
    pub async fn check(&self, user_id: &str) -> bool {
        let mut users = self.users.write().await;
        let now = Instant::now();

        let state = users.entry(user_id.to_string()).or_insert(UserWindow {
            count: 0,
            window_start: now,
        });

        if now.duration_since(state.window_start) > self.config.window {
            state.count = 0;
            state.window_start = now;
        }

        if state.count >= self.config.max_requests {
            warn!("Rate limit exceeded for user: {}", user_id);
            return false;
        }

        state.count += 1;
        true
    }

    /// Drop windows that have already expired
    pub async fn cleanup(&self) {
        let mut users = self.users.write().await;
        let now = Instant::now();
        users.retain(|_, state| now.duration_since(state.window_start) <= self.config.window);
    }

    /// Number of tracked users
    pub async fn tracked_users(&self) -> usize {
        self.users.read().await.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allows_within_limit() {
        let limiter = RateLimiter::with_config(RateLimitConfig {
            max_requests: 3,
            window: Duration::from_secs(60),
        });

        assert!(limiter.check("U1").await);
        assert!(limiter.check("U1").await);
        assert!(limiter.check("U1").await);
        assert!(!limiter.check("U1").await);
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let limiter = RateLimiter::with_config(RateLimitConfig {
            max_requests: 1,
            window: Duration::from_secs(60),
        });

        assert!(limiter.check("U1").await);
        assert!(!limiter.check("U1").await);
        assert!(limiter.check("U2").await);
    }

    #[tokio::test]
    async fn test_window_resets() {
        let limiter = RateLimiter::with_config(RateLimitConfig {
            max_requests: 1,
            window: Duration::from_millis(20),
        });

        assert!(limiter.check("U1").await);
        assert!(!limiter.check("U1").await);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(limiter.check("U1").await);
    }

    #[tokio::test]
    async fn test_cleanup_removes_expired() {
        let limiter = RateLimiter::with_config(RateLimitConfig {
            max_requests: 5,
            window: Duration::from_millis(10),
        });

        limiter.check("U1").await;
        assert_eq!(limiter.tracked_users().await, 1);
        tokio::time::sleep(Duration::from_millis(30)).await;
        limiter.cleanup().await;
        assert_eq!(limiter.tracked_users().await, 0);
    }

    #[test]
    fn test_from_bot_config() {
        let config = RateLimitConfig::from(&BotConfig::default());
        assert_eq!(config.max_requests, 10);
        assert_eq!(config.window, Duration::from_secs(60));
    }
}
