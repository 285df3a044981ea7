//! Time-boxed LRU of finished extraction results, with a loading registry so
//! concurrent requests for the same key share one fetch.

use std::{
    collections::HashMap,
    future::Future,
    num::NonZeroUsize,
    time::Duration,
};

use lru::LruCache;
use parking_lot::Mutex;
use tokio::{sync::watch, time::Instant};
use tracing::{debug, trace};

use crate::configs::CacheConfig;

/// How often a write also sweeps out expired entries.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// What kind of result an entry holds; one url can cache several kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultKind {
    StreamInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub service: String,
    pub url: String,
    pub kind: ResultKind,
}

impl CacheKey {
    pub fn new(service: impl Into<String>, url: impl Into<String>, kind: ResultKind) -> Self {
        Self {
            service: service.into(),
            url: url.into(),
            kind,
        }
    }
}

struct CacheEntry<V> {
    value: V,
    /// `None` when the TTL is too large to represent; such entries never expire.
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

pub struct ResultCache<V> {
    entries: Mutex<LruCache<CacheKey, CacheEntry<V>>>,
    trim_to: usize,
    default_ttl: Duration,
    service_ttl: HashMap<String, Duration>,
    loading: Mutex<HashMap<CacheKey, watch::Receiver<()>>>,
    next_sweep: Mutex<Instant>,
}

/// Held by the task fetching a key. Dropping it, on success, failure or
/// cancellation, releases everyone waiting on that key.
struct LoadGuard<'a, V> {
    cache: &'a ResultCache<V>,
    key: CacheKey,
    _done: watch::Sender<()>,
}

impl<V> Drop for LoadGuard<'_, V> {
    fn drop(&mut self) {
        self.cache.loading.lock().remove(&self.key);
    }
}

impl<V: Clone> ResultCache<V> {
    pub fn new(capacity: usize, trim_to: usize, default_ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            trim_to: trim_to.min(capacity.get()),
            default_ttl,
            service_ttl: HashMap::new(),
            loading: Mutex::new(HashMap::new()),
            next_sweep: Mutex::new(Instant::now() + SWEEP_INTERVAL),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        let mut cache = Self::new(
            config.capacity,
            config.trim_to,
            Duration::from_secs(config.ttl_secs),
        );
        cache.service_ttl = config
            .service_ttl_secs
            .iter()
            .map(|(service, secs)| (service.clone(), Duration::from_secs(*secs)))
            .collect();
        cache
    }

    pub fn ttl_for(&self, service: &str) -> Duration {
        self.service_ttl
            .get(service)
            .copied()
            .unwrap_or(self.default_ttl)
    }

    /// Returns a live entry and marks it recently used. Expired entries are
    /// evicted here rather than returned.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some(entry) if entry.is_live(Instant::now()) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            trace!("evicting expired entry for {}", key.url);
            entries.pop(key);
        }
        None
    }

    pub fn put(&self, key: CacheKey, value: V) {
        let ttl = self.ttl_for(&key.service);
        self.put_with_ttl(key, value, ttl);
    }

    /// Inserts or refreshes `key`. At capacity the least recently touched
    /// entry makes room. Once per sweep interval expired entries are dropped too.
    pub fn put_with_ttl(&self, key: CacheKey, value: V, ttl: Duration) {
        let now = Instant::now();
        let entry = CacheEntry {
            value,
            expires_at: now.checked_add(ttl),
        };
        let mut entries = self.entries.lock();
        if let Some((evicted, _)) = entries.push(key.clone(), entry) {
            if evicted != key {
                debug!("cache full, evicted {}", evicted.url);
            }
        }

        let mut next_sweep = self.next_sweep.lock();
        if now >= *next_sweep {
            *next_sweep = now + SWEEP_INTERVAL;
            let swept = Self::evict_expired(&mut entries, now);
            if swept > 0 {
                trace!("swept {} expired entries", swept);
            }
        }
    }

    fn evict_expired(entries: &mut LruCache<CacheKey, CacheEntry<V>>, now: Instant) -> usize {
        let expired: Vec<CacheKey> = entries
            .iter()
            .filter(|(_, entry)| !entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops expired entries, then the least recently used ones until at most
    /// `trim_to` remain.
    pub fn trim(&self) {
        let mut entries = self.entries.lock();
        let expired = Self::evict_expired(&mut entries, Instant::now());
        while entries.len() > self.trim_to {
            entries.pop_lru();
        }
        debug!("cache trimmed: {} expired, {} left", expired, entries.len());
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Whether some task is currently fetching `key`.
    pub fn is_loading(&self, key: &CacheKey) -> bool {
        self.loading.lock().contains_key(key)
    }

    /// Registers the caller as the loader of `key`, or hands back a receiver
    /// that closes once the current loader is done.
    fn claim(&self, key: &CacheKey) -> Result<LoadGuard<'_, V>, watch::Receiver<()>> {
        let mut loading = self.loading.lock();
        if let Some(waiting) = loading.get(key) {
            return Err(waiting.clone());
        }
        let (done, waiting) = watch::channel(());
        loading.insert(key.clone(), waiting);
        Ok(LoadGuard {
            cache: self,
            key: key.clone(),
            _done: done,
        })
    }

    /// Returns the cached value for `key`, or runs `load` to produce it. While a
    /// load is in flight, other callers for the same key wait for it and then
    /// read the cache; if the loader failed they take over.
    pub async fn get_or_load<F, Fut, E>(&self, key: CacheKey, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        loop {
            if let Some(value) = self.get(&key) {
                return Ok(value);
            }

            match self.claim(&key) {
                Ok(guard) => {
                    let result = load().await;
                    if let Ok(value) = &result {
                        self.put(key, value.clone());
                    }
                    drop(guard);
                    return result;
                }
                Err(mut waiting) => {
                    trace!("waiting for in-flight load of {}", key.url);
                    // Only ever closes; there are no values to observe.
                    let _ = waiting.changed().await;
                }
            }
        }
    }
}
