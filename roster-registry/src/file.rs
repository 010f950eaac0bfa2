//! File-backed record store with persistence.
//!
//! Keeps records in a [`MemoryStore`] and rewrites the backing file after
//! every successful mutation, so the file is the durable copy.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use roster_core::error::{Result, RosterError};
use roster_core::traits::{Record, RecordProvider};

use crate::MemoryStore;

/// File format magic bytes
const MAGIC: &[u8; 4] = b"RSTR";
/// Current file format version
const VERSION: u8 = 1;
/// magic + version + count
const HEADER_LEN: usize = 4 + 1 + 8;

/// File-backed record store.
///
/// # File Format
///
/// ```text
/// magic (4 bytes): "RSTR"
/// version (1 byte): 1
/// count (8 bytes, LE): number of records
/// records (variable): JSON array
/// ```
///
/// Writes are serialized and each one is persisted before it returns. If
/// persisting fails the in-memory change is rolled back and the error is
/// returned, so memory never runs ahead of the file.
pub struct FileStore<R: Record> {
    path: PathBuf,
    memory: MemoryStore<R>,
    write_lock: Mutex<()>,
}

impl<R> FileStore<R>
where
    R: Record + Serialize + DeserializeOwned,
{
    /// Opens the store at `path`, loading it if the file exists.
    ///
    /// The file is created on the first write.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            memory: MemoryStore::new(),
            write_lock: Mutex::new(()),
        };

        if fs::try_exists(&store.path).await? {
            store.load().await?;
        }

        Ok(store)
    }

    #[instrument(skip(self), fields(path = ?self.path))]
    async fn load(&self) -> Result<()> {
        let contents = fs::read(&self.path).await?;

        if contents.len() < HEADER_LEN {
            return Err(RosterError::Storage("record file too short".into()));
        }
        if &contents[0..4] != MAGIC {
            return Err(RosterError::Storage("invalid magic bytes".into()));
        }
        let version = contents[4];
        if version != VERSION {
            return Err(RosterError::VersionMismatch {
                expected: VERSION,
                actual: version,
            });
        }

        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&contents[5..HEADER_LEN]);
        let count = u64::from_le_bytes(count_bytes);

        let records: Vec<R> = serde_json::from_slice(&contents[HEADER_LEN..])?;
        if records.len() as u64 != count {
            return Err(RosterError::Storage(format!(
                "record count mismatch: header says {}, found {}",
                count,
                records.len()
            )));
        }

        let loaded = self.memory.import(records);
        info!(count = loaded, "Loaded records from file");
        Ok(())
    }

    /// Writes every record to the file (temp file, then rename).
    #[instrument(skip(self), fields(path = ?self.path))]
    async fn save(&self) -> Result<()> {
        let records = self.memory.all_records();
        let serialized = serde_json::to_vec(&records)?;

        let mut contents = Vec::with_capacity(HEADER_LEN + serialized.len());
        contents.extend_from_slice(MAGIC);
        contents.push(VERSION);
        contents.extend_from_slice(&(records.len() as u64).to_le_bytes());
        contents.extend_from_slice(&serialized);

        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&contents).await?;
        file.sync_all().await?;
        fs::rename(&temp_path, &self.path).await?;

        debug!(count = records.len(), "Saved records to file");
        Ok(())
    }

    /// Persists, undoing the in-memory change on failure.
    async fn commit(&self, undo: impl FnOnce(&MemoryStore<R>)) -> Result<()> {
        if let Err(e) = self.save().await {
            warn!(error = %e, "Persisting records failed; rolling back");
            undo(&self.memory);
            return Err(RosterError::Storage(format!("failed to persist records: {}", e)));
        }
        Ok(())
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }
}

impl<R: Record> fmt::Debug for FileStore<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .field("memory", &self.memory)
            .finish()
    }
}

#[async_trait]
impl<R> RecordProvider<R> for FileStore<R>
where
    R: Record + Serialize + DeserializeOwned,
{
    async fn create(&self, record: &R) -> Result<R::Key> {
        let _guard = self.write_lock.lock().await;
        let key = self.memory.create(record).await?;
        let undo_key = key.clone();
        self.commit(move |memory| {
            memory.take(&undo_key);
        })
        .await?;
        Ok(key)
    }

    async fn read(&self, key: &R::Key) -> Result<R> {
        self.memory.read(key).await
    }

    async fn update(&self, record: &R) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let previous = self.memory.read(&record.key()).await?;
        self.memory.update(record).await?;
        self.commit(move |memory| {
            memory.put(previous);
        })
        .await
    }

    async fn delete(&self, key: &R::Key) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let previous = self.memory.read(key).await?;
        self.memory.delete(key).await?;
        self.commit(move |memory| {
            memory.put(previous);
        })
        .await
    }
}
