//! Observability hooks for the cache.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Receives cache hit/miss/size observations.
///
/// Calls are made outside the cache lock and their outcome is never
/// consulted, so an implementation may be slow or do nothing at all.
pub trait MetricsSink: Send + Sync {
    /// A read was answered from memory.
    fn on_hit(&self) {}

    /// A read had to go to the backing provider.
    fn on_miss(&self) {}

    /// The number of cached entries changed.
    fn on_size_changed(&self, _entries: usize) {}
}

/// Sink that discards every observation.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {}

/// In-process atomic counters.
#[derive(Debug, Default)]
pub struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    size: AtomicUsize,
    size_reports: AtomicU64,
}

/// Point-in-time copy of [`CacheCounters`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub hits: u64,
    pub misses: u64,
    /// Last reported entry count.
    pub size: usize,
    pub size_reports: u64,
}

impl CacheCounters {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current values.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.size.load(Ordering::Relaxed),
            size_reports: self.size_reports.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSink for CacheCounters {
    fn on_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn on_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn on_size_changed(&self, entries: usize) {
        self.size.store(entries, Ordering::Relaxed);
        self.size_reports.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let counters = CacheCounters::new();
        counters.on_hit();
        counters.on_hit();
        counters.on_miss();
        counters.on_size_changed(3);
        counters.on_size_changed(2);

        let snap = counters.snapshot();
        assert_eq!(snap.hits, 2);
        assert_eq!(snap.misses, 1);
        assert_eq!(snap.size, 2);
        assert_eq!(snap.size_reports, 2);
    }

    #[test]
    fn test_noop_accepts_everything() {
        let sink: &dyn MetricsSink = &NoopMetrics;
        sink.on_hit();
        sink.on_miss();
        sink.on_size_changed(usize::MAX);
    }
}
