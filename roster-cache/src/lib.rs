//! Read-through TTL cache for roster records.
//!
//! [`CacheStore`] wraps any [`RecordProvider`](roster_core::RecordProvider)
//! and answers the same create/read/update/delete contract. The provider is
//! always consulted for writes; reads are served from memory while an entry
//! is younger than the configured TTL. A background [`Sweeper`] reclaims
//! expired entries once per TTL period.

mod cache;
mod metrics;
mod sweeper;

pub use cache::{CacheConfig, CacheStats, CacheStore};
pub use metrics::{CacheCounters, CounterSnapshot, MetricsSink, NoopMetrics};
pub use sweeper::Sweeper;
