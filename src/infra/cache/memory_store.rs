use crate::domain::ports::{CacheStore, CacheUnavailable};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

enum Value {
    Str(String),
    Hash(HashMap<String, String>),
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Expired entries are swept on every this-many writes, so keys that are
/// never read again (old rate-limit windows) do not pile up.
const SWEEP_EVERY: u64 = 256;

/// Process-local store used when no cache server is configured.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, Entry>>,
    writes: AtomicU64,
    closed: AtomicBool,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_open(&self) -> Result<(), CacheUnavailable> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(CacheUnavailable("client closed".to_string()));
        }
        Ok(())
    }

    fn sweep_due(&self) -> bool {
        self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1
    }
}

fn purge(entries: &mut HashMap<String, Entry>) {
    let now = Instant::now();
    entries.retain(|_, entry| !entry.is_expired(now));
}

fn wrong_type(key: &str) -> CacheUnavailable {
    CacheUnavailable(format!("WRONGTYPE operation against key '{}'", key))
}

/// Drops the entry for `key` if it has expired, then returns it.
fn live<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
    let now = Instant::now();
    if entries.get(key).is_some_and(|e| e.is_expired(now)) {
        entries.remove(key);
    }
    entries.get_mut(key)
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheUnavailable> {
        self.check_open()?;
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key) {
            Some(Entry { value: Value::Str(s), .. }) => Ok(Some(s.clone())),
            Some(_) => Err(wrong_type(key)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheUnavailable> {
        self.check_open()?;
        let mut entries = self.entries.lock().await;
        if self.sweep_due() {
            purge(&mut entries);
        }
        entries.insert(key.to_string(), Entry {
            value: Value::Str(value.to_string()),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        });
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool, CacheUnavailable> {
        self.check_open()?;
        let mut entries = self.entries.lock().await;
        let existed = live(&mut entries, key).is_some();
        entries.remove(key);
        Ok(existed)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheUnavailable> {
        self.check_open()?;
        let mut entries = self.entries.lock().await;
        Ok(live(&mut entries, key).is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheUnavailable> {
        self.check_open()?;
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key) {
            Some(entry) => {
                entry.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, CacheUnavailable> {
        self.check_open()?;
        let mut entries = self.entries.lock().await;
        if self.sweep_due() {
            purge(&mut entries);
        }
        let current = match live(&mut entries, key) {
            Some(Entry { value: Value::Str(s), .. }) => s
                .parse::<i64>()
                .map_err(|_| CacheUnavailable(format!("value at '{}' is not an integer", key)))?,
            Some(_) => return Err(wrong_type(key)),
            None => 0,
        };
        let next = current.saturating_add(delta);
        match entries.get_mut(key) {
            Some(entry) => entry.value = Value::Str(next.to_string()),
            None => {
                entries.insert(key.to_string(), Entry { value: Value::Str(next.to_string()), expires_at: None });
            }
        }
        Ok(next)
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, CacheUnavailable> {
        self.check_open()?;
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key) {
            Some(Entry { value: Value::Hash(map), .. }) => Ok(map.get(field).cloned()),
            Some(_) => Err(wrong_type(key)),
            None => Ok(None),
        }
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), CacheUnavailable> {
        self.check_open()?;
        let mut entries = self.entries.lock().await;
        if self.sweep_due() {
            purge(&mut entries);
        }
        match live(&mut entries, key) {
            Some(Entry { value: Value::Hash(map), .. }) => {
                map.insert(field.to_string(), value.to_string());
            }
            Some(_) => return Err(wrong_type(key)),
            None => {
                let map = HashMap::from([(field.to_string(), value.to_string())]);
                entries.insert(key.to_string(), Entry { value: Value::Hash(map), expires_at: None });
            }
        }
        Ok(())
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<bool, CacheUnavailable> {
        self.check_open()?;
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key) {
            Some(Entry { value: Value::Hash(map), .. }) => Ok(map.remove(field).is_some()),
            Some(_) => Err(wrong_type(key)),
            None => Ok(false),
        }
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, CacheUnavailable> {
        self.check_open()?;
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key) {
            Some(Entry { value: Value::Hash(map), .. }) => Ok(map.clone()),
            Some(_) => Err(wrong_type(key)),
            None => Ok(HashMap::new()),
        }
    }

    async fn ping(&self) -> Result<(), CacheUnavailable> {
        self.check_open()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
        self.entries.lock().await.clear();
    }
}
