use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::domain::models::{auth::SessionRecord, chatbot::Chatbot, user::User};
use crate::domain::ports::{CacheStore, CacheUnavailable};

pub const USER_TTL: Duration = Duration::from_secs(3600);
pub const CHATBOT_TTL: Duration = Duration::from_secs(1800);
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 3600);

/// Typed, fail-open facade over the raw cache store.
///
/// Every call returns `Result<_, CacheUnavailable>` so callers can tell a
/// miss from an outage. Nothing here panics or produces an `AppError`;
/// callers decide whether to ignore the outage.
#[derive(Clone)]
pub struct CacheService {
    store: Arc<dyn CacheStore>,
}

impl CacheService {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    fn log(op: &str, key: &str, err: &CacheUnavailable) {
        warn!(op, key, error = %err, "Cache operation failed");
    }

    /// JSON-decoded read. An undecodable value is reported as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheUnavailable> {
        let raw = self.store.get(key).await.inspect_err(|e| Self::log("get", key, e))?;
        Ok(raw.and_then(|raw| match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(key, error = %e, "Discarding undecodable cache value");
                None
            }
        }))
    }

    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<(), CacheUnavailable> {
        let raw = serde_json::to_string(value).map_err(|e| CacheUnavailable(format!("serialize: {}", e)))?;
        self.store.set(key, &raw, ttl).await.inspect_err(|e| Self::log("set", key, e))
    }

    pub async fn del(&self, key: &str) -> Result<bool, CacheUnavailable> {
        self.store.del(key).await.inspect_err(|e| Self::log("del", key, e))
    }

    pub async fn exists(&self, key: &str) -> Result<bool, CacheUnavailable> {
        self.store.exists(key).await.inspect_err(|e| Self::log("exists", key, e))
    }

    pub async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheUnavailable> {
        self.store.expire(key, ttl).await.inspect_err(|e| Self::log("expire", key, e))
    }

    pub async fn increment(&self, key: &str, by: i64) -> Result<i64, CacheUnavailable> {
        self.store.incr_by(key, by).await.inspect_err(|e| Self::log("increment", key, e))
    }

    pub async fn decrement(&self, key: &str, by: i64) -> Result<i64, CacheUnavailable> {
        self.store.incr_by(key, -by).await.inspect_err(|e| Self::log("decrement", key, e))
    }

    pub async fn hget<T: DeserializeOwned>(&self, key: &str, field: &str) -> Result<Option<T>, CacheUnavailable> {
        let raw = self.store.hget(key, field).await.inspect_err(|e| Self::log("hget", key, e))?;
        Ok(raw.and_then(|raw| serde_json::from_str(&raw).ok()))
    }

    pub async fn hset<T: Serialize + ?Sized>(&self, key: &str, field: &str, value: &T) -> Result<(), CacheUnavailable> {
        let raw = serde_json::to_string(value).map_err(|e| CacheUnavailable(format!("serialize: {}", e)))?;
        self.store.hset(key, field, &raw).await.inspect_err(|e| Self::log("hset", key, e))
    }

    pub async fn hdel(&self, key: &str, field: &str) -> Result<bool, CacheUnavailable> {
        self.store.hdel(key, field).await.inspect_err(|e| Self::log("hdel", key, e))
    }

    pub async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, CacheUnavailable> {
        self.store.hgetall(key).await.inspect_err(|e| Self::log("hgetall", key, e))
    }

    pub async fn cache_user(&self, user: &User) -> Result<(), CacheUnavailable> {
        self.set(&user_key(&user.id), user, Some(USER_TTL)).await
    }

    pub async fn get_cached_user(&self, user_id: &str) -> Result<Option<User>, CacheUnavailable> {
        self.get(&user_key(user_id)).await
    }

    pub async fn invalidate_user(&self, user_id: &str) -> Result<bool, CacheUnavailable> {
        self.del(&user_key(user_id)).await
    }

    pub async fn cache_chatbot(&self, chatbot: &Chatbot) -> Result<(), CacheUnavailable> {
        self.set(&chatbot_key(&chatbot.id), chatbot, Some(CHATBOT_TTL)).await
    }

    pub async fn get_cached_chatbot(&self, chatbot_id: &str) -> Result<Option<Chatbot>, CacheUnavailable> {
        self.get(&chatbot_key(chatbot_id)).await
    }

    pub async fn invalidate_chatbot(&self, chatbot_id: &str) -> Result<bool, CacheUnavailable> {
        self.del(&chatbot_key(chatbot_id)).await
    }

    pub async fn cache_session(&self, session: &SessionRecord) -> Result<(), CacheUnavailable> {
        self.set(&format!("session:{}", session.user_id), session, Some(SESSION_TTL)).await
    }

    /// Counter whose expiry is attached only when it is created, so later
    /// hits never extend it.
    pub async fn increment_expiring(&self, key: &str, ttl: Duration) -> Result<i64, CacheUnavailable> {
        let count = self.increment(key, 1).await?;
        if count == 1 {
            self.expire(key, ttl).await?;
        }
        Ok(count)
    }

    /// Fixed-window counter.
    pub async fn increment_rate_limit(&self, key: &str, window: Duration) -> Result<i64, CacheUnavailable> {
        self.increment_expiring(key, window).await
    }

    pub async fn ping(&self) -> Result<(), CacheUnavailable> {
        self.store.ping().await
    }

    pub async fn disconnect(&self) {
        self.store.close().await;
    }
}

fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

fn chatbot_key(id: &str) -> String {
    format!("chatbot:{}", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::cache::{memory_store::MemoryCacheStore, redis_store::RedisCacheStore};

    fn memory() -> CacheService {
        CacheService::new(Arc::new(MemoryCacheStore::new()))
    }

    #[tokio::test]
    async fn test_user_round_trip_and_invalidate() {
        let cache = memory();
        let user = User::new("t1".into(), "a@b.co".into(), "hash".into(), "Ann".into(), "Lee".into());

        cache.cache_user(&user).await.unwrap();
        let cached = cache.get_cached_user(&user.id).await.unwrap().unwrap();
        assert_eq!(cached.email, "a@b.co");
        assert!(cached.password_hash.is_empty());

        assert!(cache.invalidate_user(&user.id).await.unwrap());
        assert!(cache.get_cached_user(&user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_undecodable_value_is_a_miss() {
        let store = Arc::new(MemoryCacheStore::new());
        store.set("user:x", "not json", None).await.unwrap();
        let cache = CacheService::new(store);
        assert!(cache.get::<User>("user:x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_window_is_fixed() {
        let cache = memory();
        let window = Duration::from_millis(60);
        assert_eq!(cache.increment_rate_limit("ratelimit:k", window).await.unwrap(), 1);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.increment_rate_limit("ratelimit:k", window).await.unwrap(), 2);
        tokio::time::sleep(Duration::from_millis(45)).await;
        // Second hit did not push the expiry out.
        assert_eq!(cache.increment_rate_limit("ratelimit:k", window).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_hash_fields_are_json_encoded() {
        let cache = memory();
        let session = SessionRecord {
            user_id: "u1".into(),
            tenant_id: "t1".into(),
            ip: "203.0.113.9".into(),
            logged_in_at: chrono::Utc::now(),
        };

        cache.hset("sessions:t1", "u1", &session).await.unwrap();
        cache.hset("sessions:t1", "u2", "plain").await.unwrap();

        let back: SessionRecord = cache.hget("sessions:t1", "u1").await.unwrap().unwrap();
        assert_eq!(back.ip, "203.0.113.9");
        let all = cache.hgetall("sessions:t1").await.unwrap();
        assert_eq!(all["u2"], "\"plain\"");
        assert_eq!(all.len(), 2);

        // A field holding another shape reads as a miss.
        assert!(cache.hget::<SessionRecord>("sessions:t1", "u2").await.unwrap().is_none());
        assert!(cache.hdel("sessions:t1", "u1").await.unwrap());
        assert!(cache.hget::<SessionRecord>("sessions:t1", "u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_decrement_and_expiring_counter() {
        let cache = memory();
        assert_eq!(cache.increment("n", 5).await.unwrap(), 5);
        assert_eq!(cache.decrement("n", 2).await.unwrap(), 3);

        assert_eq!(cache.increment_expiring("errors:hourly:x", Duration::from_millis(20)).await.unwrap(), 1);
        assert_eq!(cache.increment_expiring("errors:hourly:x", Duration::from_millis(20)).await.unwrap(), 2);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!cache.exists("errors:hourly:x").await.unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_backend_fails_open() {
        let cache = CacheService::new(Arc::new(RedisCacheStore::new("redis://127.0.0.1:1").unwrap()));
        assert!(cache.get::<String>("k").await.is_err());
        assert!(cache.set("k", "v", None).await.is_err());
        assert!(cache.increment_rate_limit("k", Duration::from_secs(1)).await.is_err());
    }
}
