//! In-memory store for tests and dry runs

use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::Mutex;

use super::StorageSink;
use crate::error::StorageError;
use crate::record::Record;

/// A row held by [`MemoryStore`]
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: i64,
    pub hash: String,
    pub record: Record,
}

#[derive(Debug, Default)]
struct Rows {
    next_id: i64,
    rows: Vec<StoredRecord>,
    hashes: HashSet<String>,
}

/// Mutex-guarded store with auto-increment ids and a unique content hash
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Rows>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `records`, ids assigned in order
    pub async fn with_records(records: impl IntoIterator<Item = Record>) -> Result<Self, StorageError> {
        let store = Self::new();
        for record in records {
            store.insert(&record).await?;
        }
        Ok(store)
    }

    /// Snapshot of every stored row, in insertion order
    pub async fn rows(&self) -> Vec<StoredRecord> {
        self.inner.lock().await.rows.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl StorageSink for MemoryStore {
    async fn latest_timestamp(&self, source_id: &str) -> Result<Option<i64>, StorageError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .rows
            .iter()
            .filter(|row| row.record.source_id == source_id)
            .map(|row| row.record.timestamp)
            .max())
    }

    async fn insert(&self, record: &Record) -> Result<i64, StorageError> {
        let hash = record.content_hash();
        let mut inner = self.inner.lock().await;

        if inner.hashes.contains(&hash) {
            return Err(StorageError::Duplicate { hash });
        }

        inner.next_id += 1;
        let id = inner.next_id;
        inner.hashes.insert(hash.clone());
        inner.rows.push(StoredRecord {
            id,
            hash,
            record: record.clone(),
        });
        Ok(id)
    }
}
