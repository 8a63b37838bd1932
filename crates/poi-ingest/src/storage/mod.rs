//! Persistence boundary for ingested records
//!
//! The worker only needs two operations from storage, so backends implement
//! [`StorageSink`] and the worker holds it behind an `Arc<dyn StorageSink>`.
//! Backends own insert serialization: several workers may share one sink.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::Record;

pub use memory::{MemoryStore, StoredRecord};
pub use sqlite::SqliteStore;

/// Storage operations consumed by the ingestion worker
#[async_trait]
pub trait StorageSink: Send + Sync {
    /// Highest stored timestamp for `source_id`, `None` when nothing is stored
    async fn latest_timestamp(&self, source_id: &str) -> Result<Option<i64>, StorageError>;

    /// Persist `record` and return its surrogate id.
    ///
    /// Either the record is durably stored or nothing is; a record whose
    /// content hash is already present yields [`StorageError::Duplicate`].
    async fn insert(&self, record: &Record) -> Result<i64, StorageError>;
}
