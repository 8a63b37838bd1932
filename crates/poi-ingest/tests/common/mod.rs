//! Shared fixtures for ingestion integration tests
//!
//! - [`CountingPacer`] records pacing calls without waiting
//! - [`FlakyStore`] wraps a [`MemoryStore`], counts calls and can fail on a chosen insert
//! - [`write_peer_file`] drops an encoded peer file into a temp directory

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use poi_ingest::decoder::encode_records;
use poi_ingest::pacing::Pacer;
use poi_ingest::storage::{MemoryStore, StorageSink};
use poi_ingest::{Record, StorageError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

pub const SOURCE: &str = "555-0100";
pub const OTHER_SOURCE: &str = "555-0199";

pub fn record(source: &str, timestamp: i64) -> Record {
    Record {
        source_id: source.to_string(),
        subscriber_id: "sub-1".to_string(),
        latitude: 59.3293,
        longitude: 18.0686,
        timestamp,
        timezone: "Europe/Stockholm".to_string(),
        title: format!("poi at {timestamp}"),
        description: String::new(),
        category: "cafe".to_string(),
        photo: String::new(),
    }
}

pub fn write_peer_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

pub fn encode(records: &[Record]) -> Vec<u8> {
    encode_records(records)
}

/// Pacer that only counts
#[derive(Debug, Default)]
pub struct CountingPacer {
    calls: AtomicUsize,
}

impl CountingPacer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Pacer for CountingPacer {
    async fn pace(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Memory store that can be told to fail the n-th insert (1-based) or every
/// threshold lookup
#[derive(Debug, Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    fail_on_insert: Option<usize>,
    fail_latest: bool,
    pub threshold_queries: AtomicUsize,
    pub insert_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn failing_on_insert(inner: MemoryStore, n: usize) -> Self {
        Self {
            inner,
            fail_on_insert: Some(n),
            ..Default::default()
        }
    }

    pub fn failing_latest(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_latest: true,
            ..Default::default()
        }
    }

    pub fn threshold_queries(&self) -> usize {
        self.threshold_queries.load(Ordering::SeqCst)
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageSink for FlakyStore {
    async fn latest_timestamp(&self, source_id: &str) -> Result<Option<i64>, StorageError> {
        self.threshold_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_latest {
            return Err(StorageError::Unavailable("database is locked".to_string()));
        }
        self.inner.latest_timestamp(source_id).await
    }

    async fn insert(&self, record: &Record) -> Result<i64, StorageError> {
        let call = self.insert_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_insert == Some(call) {
            return Err(StorageError::Unavailable("connection reset".to_string()));
        }
        self.inner.insert(record).await
    }
}
