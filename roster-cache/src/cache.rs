//! Read-through TTL cache in front of a record provider.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, instrument};

use roster_core::constants::DEFAULT_CACHE_TTL;
use roster_core::error::{CacheOp, Result, RosterError};
use roster_core::traits::{Record, RecordProvider};

use crate::metrics::{MetricsSink, NoopMetrics};
use crate::sweeper::Sweeper;

/// Cached copy of a record with its expiry.
#[derive(Clone)]
struct CacheEntry<R> {
    value: R,
    expires_at: Instant,
}

impl<R> CacheEntry<R> {
    fn new(value: R, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    /// Servable to readers.
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    /// Eligible for removal by a sweep.
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

type Entries<R> = RwLock<HashMap<<R as Record>::Key, CacheEntry<R>>>;

/// Cache configuration.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// How long an entry may be served after it was written
    pub ttl: Duration,
}

impl CacheConfig {
    /// Creates a configuration with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// Creates a configuration with a TTL in whole seconds.
    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    /// Rejects a zero TTL.
    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(RosterError::Config("cache TTL must be greater than zero".into()));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

/// Read-through cache for records of type `R`.
///
/// Every operation goes to the backing provider first; the in-memory map is
/// reconciled only after the provider succeeds, so a failed write never
/// leaves cached state behind. Reads of a fresh entry skip the provider.
///
/// # Concurrency
///
/// One reader/writer lock guards the whole map. It is never held across a
/// provider call, only while the result is committed.
///
/// Operations on the same key are not serialized beyond that lock. A read
/// that misses can therefore race a delete: if the delete commits between
/// the read's provider fetch and its insert, the deleted record is cached
/// again and served as a hit until it expires. [`CacheStore::invalidate`]
/// drops such an entry early.
///
/// # Lifecycle
///
/// Construction spawns a [`Sweeper`] on the current Tokio runtime that runs
/// once per TTL. Call [`CacheStore::shutdown`] to stop it; dropping the
/// store also signals it. The provider's own lifecycle is left to the caller.
pub struct CacheStore<R: Record> {
    provider: Arc<dyn RecordProvider<R>>,
    entries: Arc<Entries<R>>,
    config: CacheConfig,
    metrics: Arc<dyn MetricsSink>,
    sweeper: Sweeper,
}

impl<R: Record> CacheStore<R> {
    /// Creates a cache with the given TTL and no metrics.
    pub fn new<P>(provider: P, ttl: Duration) -> Result<Self>
    where
        P: RecordProvider<R> + 'static,
    {
        Self::with_metrics(provider, CacheConfig::new(ttl), Arc::new(NoopMetrics))
    }

    /// Creates a cache with a custom configuration and no metrics.
    pub fn with_config<P>(provider: P, config: CacheConfig) -> Result<Self>
    where
        P: RecordProvider<R> + 'static,
    {
        Self::with_metrics(provider, config, Arc::new(NoopMetrics))
    }

    /// Creates a cache that reports to `metrics`.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn with_metrics<P>(
        provider: P,
        config: CacheConfig,
        metrics: Arc<dyn MetricsSink>,
    ) -> Result<Self>
    where
        P: RecordProvider<R> + 'static,
    {
        config.validate()?;

        let entries: Arc<Entries<R>> = Arc::new(RwLock::new(HashMap::new()));

        let sweep_entries = entries.clone();
        let sweep_metrics = metrics.clone();
        let sweeper = Sweeper::spawn(config.ttl, move || {
            let (removed, remaining) = remove_expired(&sweep_entries, Instant::now());
            if removed > 0 {
                debug!(removed, remaining, "Swept expired entries");
                sweep_metrics.on_size_changed(remaining);
            }
        })?;

        Ok(Self {
            provider: Arc::new(provider),
            entries,
            config,
            metrics,
            sweeper,
        })
    }

    /// Configured TTL.
    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Stops the background sweeper and waits for it to exit.
    ///
    /// Safe to call more than once. Data operations after shutdown keep
    /// working but expired entries are no longer reclaimed in the background.
    pub async fn shutdown(&self) {
        self.sweeper.stop().await;
        debug!("Cache store shut down");
    }

    /// Returns true while the background sweeper is alive.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.is_running()
    }

    /// Removes all expired entries now, returning how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        let (removed, remaining) = remove_expired(&self.entries, Instant::now());
        if removed > 0 {
            self.metrics.on_size_changed(remaining);
        }
        removed
    }

    /// Drops the cached entry for `key` without touching the provider.
    pub fn invalidate(&self, key: &R::Key) -> bool {
        let (removed, size) = {
            let mut entries = self.entries.write();
            let removed = entries.remove(key).is_some();
            (removed, entries.len())
        };
        if removed {
            self.metrics.on_size_changed(size);
        }
        removed
    }

    /// Clears all cached entries.
    pub fn clear(&self) {
        self.entries.write().clear();
        self.metrics.on_size_changed(0);
    }

    /// Returns true if a fresh entry exists for `key`.
    pub fn contains_fresh(&self, key: &R::Key) -> bool {
        let now = Instant::now();
        self.entries
            .read()
            .get(key)
            .map(|e| e.is_fresh(now))
            .unwrap_or(false)
    }

    /// Returns the number of cached entries, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.entries.read();
        let valid = entries.values().filter(|e| e.is_fresh(now)).count();
        CacheStats {
            total_entries: entries.len(),
            expired_entries: entries.len().saturating_sub(valid),
            valid_entries: valid,
            ttl_secs: self.config.ttl.as_secs(),
        }
    }

    /// Inserts or replaces the entry for `key`, returning the new map size.
    fn store(&self, key: R::Key, value: R) -> usize {
        let mut entries = self.entries.write();
        entries.insert(key, CacheEntry::new(value, self.config.ttl));
        entries.len()
    }
}

/// Removes entries past their expiry, returning `(removed, remaining)`.
fn remove_expired<R: Record>(entries: &Entries<R>, now: Instant) -> (usize, usize) {
    let mut entries = entries.write();
    let before = entries.len();
    entries.retain(|_, e| !e.is_expired(now));
    (before - entries.len(), entries.len())
}

#[async_trait]
impl<R: Record> RecordProvider<R> for CacheStore<R> {
    #[instrument(skip_all)]
    async fn create(&self, record: &R) -> Result<R::Key> {
        let key = self
            .provider
            .create(record)
            .await
            .map_err(|e| RosterError::cache(CacheOp::Create, e))?;

        let size = self.store(key.clone(), record.clone());
        self.metrics.on_size_changed(size);
        debug!(%key, "Cached created record");

        Ok(key)
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn read(&self, key: &R::Key) -> Result<R> {
        let now = Instant::now();
        let cached = self
            .entries
            .read()
            .get(key)
            .filter(|e| e.is_fresh(now))
            .map(|e| e.value.clone());

        if let Some(value) = cached {
            self.metrics.on_hit();
            debug!("Cache hit");
            return Ok(value);
        }

        self.metrics.on_miss();
        debug!("Cache miss");

        let value = self
            .provider
            .read(key)
            .await
            .map_err(|e| RosterError::cache(CacheOp::Read, e))?;

        let size = self.store(key.clone(), value.clone());
        self.metrics.on_size_changed(size);

        Ok(value)
    }

    #[instrument(skip_all)]
    async fn update(&self, record: &R) -> Result<()> {
        self.provider
            .update(record)
            .await
            .map_err(|e| RosterError::cache(CacheOp::Update, e))?;

        // Cold keys stay cold: only refresh what is already cached.
        let key = record.key();
        let refreshed = {
            let mut entries = self.entries.write();
            match entries.get_mut(&key) {
                Some(entry) => {
                    *entry = CacheEntry::new(record.clone(), self.config.ttl);
                    true
                }
                None => false,
            }
        };
        debug!(%key, refreshed, "Updated record");

        Ok(())
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn delete(&self, key: &R::Key) -> Result<()> {
        self.provider
            .delete(key)
            .await
            .map_err(|e| RosterError::cache(CacheOp::Delete, e))?;

        let size = {
            let mut entries = self.entries.write();
            entries.remove(key);
            entries.len()
        };
        self.metrics.on_size_changed(size);
        debug!("Evicted deleted record");

        Ok(())
    }
}

impl<R: Record> fmt::Debug for CacheStore<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("ttl", &self.config.ttl)
            .field("entries", &self.len())
            .field("sweeping", &self.is_sweeping())
            .finish()
    }
}

/// Cache statistics.
#[derive(Clone, Debug, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub valid_entries: usize,
    pub ttl_secs: u64,
}
