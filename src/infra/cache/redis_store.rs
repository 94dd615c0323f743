use crate::domain::ports::{CacheStore, CacheUnavailable};
use async_trait::async_trait;
use bb8_redis::{bb8, redis::{self, AsyncCommands}, RedisConnectionManager};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Redis-backed store. The pool is built lazily so an unreachable server
/// surfaces as `CacheUnavailable` on each call instead of failing boot.
pub struct RedisCacheStore {
    pool: bb8::Pool<RedisConnectionManager>,
    closed: AtomicBool,
}

impl RedisCacheStore {
    pub fn new(url: &str) -> Result<Self, CacheUnavailable> {
        let manager = RedisConnectionManager::new(url).map_err(unavailable)?;
        let pool = bb8::Pool::builder()
            .max_size(16)
            .connection_timeout(CONNECT_TIMEOUT)
            .retry_connection(false)
            .build_unchecked(manager);
        Ok(Self { pool, closed: AtomicBool::new(false) })
    }

    async fn conn(&self) -> Result<bb8::PooledConnection<'_, RedisConnectionManager>, CacheUnavailable> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(CacheUnavailable("client closed".to_string()));
        }
        self.pool.get().await.map_err(|e| CacheUnavailable(e.to_string()))
    }
}

fn unavailable(err: redis::RedisError) -> CacheUnavailable {
    CacheUnavailable(err.to_string())
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheUnavailable> {
        let mut conn = self.conn().await?;
        conn.get::<_, Option<String>>(key).await.map_err(unavailable)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheUnavailable> {
        let mut conn = self.conn().await?;
        match ttl {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1)).await,
            None => conn.set::<_, _, ()>(key, value).await,
        }
        .map_err(unavailable)
    }

    async fn del(&self, key: &str) -> Result<bool, CacheUnavailable> {
        let mut conn = self.conn().await?;
        let removed: i64 = conn.del(key).await.map_err(unavailable)?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheUnavailable> {
        let mut conn = self.conn().await?;
        conn.exists::<_, bool>(key).await.map_err(unavailable)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheUnavailable> {
        let mut conn = self.conn().await?;
        let secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1);
        conn.expire::<_, bool>(key, secs).await.map_err(unavailable)
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, CacheUnavailable> {
        let mut conn = self.conn().await?;
        conn.incr::<_, _, i64>(key, delta).await.map_err(unavailable)
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, CacheUnavailable> {
        let mut conn = self.conn().await?;
        conn.hget::<_, _, Option<String>>(key, field).await.map_err(unavailable)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), CacheUnavailable> {
        let mut conn = self.conn().await?;
        conn.hset::<_, _, _, ()>(key, field, value).await.map_err(unavailable)
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<bool, CacheUnavailable> {
        let mut conn = self.conn().await?;
        let removed: i64 = conn.hdel(key, field).await.map_err(unavailable)?;
        Ok(removed > 0)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, CacheUnavailable> {
        let mut conn = self.conn().await?;
        conn.hgetall::<_, HashMap<String, String>>(key).await.map_err(unavailable)
    }

    async fn ping(&self) -> Result<(), CacheUnavailable> {
        let mut conn = self.conn().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut *conn)
            .await
            .map(|_| ())
            .map_err(unavailable)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
        info!("Redis cache client closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let store = RedisCacheStore::new("redis://127.0.0.1:1").unwrap();
        assert!(store.get("k").await.is_err());
        assert!(store.set("k", "v", None).await.is_err());
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(RedisCacheStore::new("not a url").is_err());
    }
}
