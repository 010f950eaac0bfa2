//! Common traits for roster.
//!
//! These traits define the keyed record contract shared by storage backends
//! and the cache that sits in front of them, so either can be handed to the
//! use-case layer.

use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

// ═══════════════════════════════════════════════════════════════════════════════
// RECORD TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// A value identified by a unique key.
///
/// Records are treated as immutable snapshots: stores and caches keep their
/// own clone rather than sharing the caller's value.
pub trait Record: Clone + Send + Sync + 'static {
    /// Unique identifier type.
    type Key: Clone + Eq + Hash + Debug + Display + Send + Sync + 'static;

    /// Returns the record's key.
    fn key(&self) -> Self::Key;
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROVIDER TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface for keyed record storage.
///
/// Implementations might use:
/// - In-memory storage (for testing/development)
/// - A JSON file (for single-node deployments)
/// - A read-through cache wrapping another provider
///
/// A missing key must be reported as [`RosterError::NotFound`](crate::RosterError::NotFound).
#[async_trait]
pub trait RecordProvider<R: Record>: Send + Sync {
    /// Stores a new record and returns its key.
    async fn create(&self, record: &R) -> Result<R::Key>;

    /// Fetches the record stored under `key`.
    async fn read(&self, key: &R::Key) -> Result<R>;

    /// Replaces the stored record with the same key.
    async fn update(&self, record: &R) -> Result<()>;

    /// Removes the record stored under `key`.
    async fn delete(&self, key: &R::Key) -> Result<()>;
}

#[async_trait]
impl<R, T> RecordProvider<R> for Arc<T>
where
    R: Record,
    T: RecordProvider<R> + ?Sized,
{
    async fn create(&self, record: &R) -> Result<R::Key> {
        (**self).create(record).await
    }

    async fn read(&self, key: &R::Key) -> Result<R> {
        (**self).read(key).await
    }

    async fn update(&self, record: &R) -> Result<()> {
        (**self).update(record).await
    }

    async fn delete(&self, key: &R::Key) -> Result<()> {
        (**self).delete(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RosterError;

    #[derive(Clone, Debug, PartialEq)]
    struct Note {
        id: u32,
    }

    impl Record for Note {
        type Key = u32;

        fn key(&self) -> u32 {
            self.id
        }
    }

    struct Empty;

    #[async_trait]
    impl RecordProvider<Note> for Empty {
        async fn create(&self, record: &Note) -> Result<u32> {
            Ok(record.id)
        }

        async fn read(&self, key: &u32) -> Result<Note> {
            Err(RosterError::NotFound(key.to_string()))
        }

        async fn update(&self, _record: &Note) -> Result<()> {
            Ok(())
        }

        async fn delete(&self, _key: &u32) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_arc_provider_delegates() {
        let provider: Arc<dyn RecordProvider<Note>> = Arc::new(Empty);
        let rt = tokio_test::block_on(async {
            let id = provider.create(&Note { id: 7 }).await.unwrap();
            assert_eq!(id, 7);
            provider.read(&7).await
        });
        assert!(rt.unwrap_err().is_not_found());
    }
}
