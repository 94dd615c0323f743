use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::warn;

use crate::config::RateLimitSettings;
use crate::domain::services::cache_service::CacheService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub name: &'static str,
    pub window: Duration,
    pub max: u64,
    pub message: &'static str,
    /// Key by IP and authenticated user instead of IP alone.
    pub per_user: bool,
}

impl RateLimitPolicy {
    pub fn general(settings: &RateLimitSettings) -> Self {
        Self {
            name: "general",
            window: settings.window,
            max: settings.max_requests,
            message: "Too many requests from this IP, please try again later.",
            per_user: false,
        }
    }

    pub fn auth() -> Self {
        Self {
            name: "auth",
            window: Duration::from_secs(15 * 60),
            max: 5,
            message: "Too many authentication attempts, please try again later.",
            per_user: false,
        }
    }

    pub fn api() -> Self {
        Self {
            name: "api",
            window: Duration::from_secs(60),
            max: 60,
            message: "API rate limit exceeded, please slow down.",
            per_user: true,
        }
    }

    pub fn upload() -> Self {
        Self {
            name: "upload",
            window: Duration::from_secs(3600),
            max: 10,
            message: "Too many uploads, please try again later.",
            per_user: false,
        }
    }

    pub fn webhook() -> Self {
        Self {
            name: "webhook",
            window: Duration::from_secs(60),
            max: 100,
            message: "Too many webhook requests.",
            per_user: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    pub reset_after: Duration,
}

/// Fixed-window counter over the shared cache. Each window gets its own key,
/// so the reset time is known without asking the store for a TTL.
pub struct RateLimiter {
    policy: RateLimitPolicy,
    cache: CacheService,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy, cache: CacheService) -> Self {
        Self { policy, cache }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub async fn check(&self, key: &str) -> RateLimitDecision {
        let window_ms = self.policy.window.as_millis().max(1) as u64;
        let now_ms = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0);
        let bucket = now_ms / window_ms;
        let reset_after = Duration::from_millis((bucket + 1) * window_ms - now_ms);

        let cache_key = format!("ratelimit:{}:{}:{}", self.policy.name, key, bucket);
        let count = match self.cache.increment_rate_limit(&cache_key, self.policy.window).await {
            Ok(count) => count.max(0) as u64,
            Err(_) => {
                warn!(limiter = self.policy.name, key, "Rate limit store unavailable, allowing request");
                return RateLimitDecision {
                    allowed: true,
                    limit: self.policy.max,
                    remaining: self.policy.max,
                    reset_after,
                };
            }
        };

        RateLimitDecision {
            allowed: count <= self.policy.max,
            limit: self.policy.max,
            remaining: self.policy.max.saturating_sub(count),
            reset_after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::cache::{memory_store::MemoryCacheStore, redis_store::RedisCacheStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_auth_policy_blocks_sixth_attempt() {
        let limiter = RateLimiter::new(RateLimitPolicy::auth(), CacheService::new(Arc::new(MemoryCacheStore::new())));
        for i in 1..=5 {
            let decision = limiter.check("10.0.0.1").await;
            assert!(decision.allowed, "attempt {} should pass", i);
            assert_eq!(decision.remaining, 5 - i);
        }
        let blocked = limiter.check("10.0.0.1").await;
        assert!(!blocked.allowed);
        assert_eq!(blocked.remaining, 0);
        assert!(blocked.reset_after <= Duration::from_secs(900));

        assert!(limiter.check("10.0.0.2").await.allowed);
    }

    #[tokio::test]
    async fn test_unavailable_cache_allows() {
        let store = RedisCacheStore::new("redis://127.0.0.1:1").unwrap();
        let limiter = RateLimiter::new(RateLimitPolicy::auth(), CacheService::new(Arc::new(store)));
        for _ in 0..3 {
            assert!(limiter.check("ip").await.allowed);
        }
    }

    #[test]
    fn test_presets() {
        assert_eq!(RateLimitPolicy::api().max, 60);
        assert!(RateLimitPolicy::api().per_user);
        assert_eq!(RateLimitPolicy::upload().window, Duration::from_secs(3600));
        assert_eq!(RateLimitPolicy::webhook().max, 100);
    }
}
