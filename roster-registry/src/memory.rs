//! In-memory record store.
//!
//! Fast, thread-safe storage suitable for development, testing,
//! and single-process deployments.

use std::fmt;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, instrument};

use roster_core::error::{Result, RosterError};
use roster_core::traits::{Record, RecordProvider};

/// In-memory record store.
///
/// Uses a concurrent map so every operation is thread-safe without
/// external synchronization. Keys come from the records themselves;
/// creating a record whose key is already present fails.
pub struct MemoryStore<R: Record> {
    records: DashMap<R::Key, R>,
}

impl<R: Record> MemoryStore<R> {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Creates a store with preallocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: DashMap::with_capacity(capacity),
        }
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Clears all records.
    pub fn clear(&self) {
        self.records.clear();
    }

    /// Returns all records (for export/backup).
    pub fn all_records(&self) -> Vec<R> {
        self.records
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Imports records, replacing any with the same key.
    ///
    /// Useful for restoring from a file or seeding tests.
    pub fn import(&self, records: Vec<R>) -> usize {
        let mut imported = 0;
        for record in records {
            self.records.insert(record.key(), record);
            imported += 1;
        }
        imported
    }

    /// Stores `record` unconditionally, returning the previous value.
    pub(crate) fn put(&self, record: R) -> Option<R> {
        self.records.insert(record.key(), record)
    }

    /// Removes `key` unconditionally, returning the previous value.
    pub(crate) fn take(&self, key: &R::Key) -> Option<R> {
        self.records.remove(key).map(|(_, record)| record)
    }
}

impl<R: Record> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> fmt::Debug for MemoryStore<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("records", &self.records.len())
            .finish()
    }
}

#[async_trait]
impl<R: Record> RecordProvider<R> for MemoryStore<R> {
    #[instrument(skip_all)]
    async fn create(&self, record: &R) -> Result<R::Key> {
        let key = record.key();
        match self.records.entry(key.clone()) {
            Entry::Occupied(_) => Err(RosterError::AlreadyExists(key.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                debug!(%key, "Created record");
                Ok(key)
            }
        }
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn read(&self, key: &R::Key) -> Result<R> {
        self.records
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RosterError::NotFound(key.to_string()))
    }

    #[instrument(skip_all)]
    async fn update(&self, record: &R) -> Result<()> {
        let key = record.key();
        match self.records.get_mut(&key) {
            Some(mut entry) => {
                *entry = record.clone();
                debug!(%key, "Updated record");
                Ok(())
            }
            None => Err(RosterError::NotFound(key.to_string())),
        }
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn delete(&self, key: &R::Key) -> Result<()> {
        match self.records.remove(key) {
            Some(_) => {
                debug!("Deleted record");
                Ok(())
            }
            None => Err(RosterError::NotFound(key.to_string())),
        }
    }
}
