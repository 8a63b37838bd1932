//! Run-scoped "newer wins" filter
//!
//! The threshold is read once per run, from the identity of the first record
//! that reaches the filter, and then applied to every record in the file
//! whatever its own source. Storage indexes by source, so a per-source
//! threshold may have been the intent; records from other sources are logged
//! so the difference stays visible.

use tracing::debug;

use crate::error::StorageError;
use crate::storage::StorageSink;

/// Decides whether a decoded record is newer than what is stored
#[derive(Debug, Default)]
pub struct NoveltyFilter {
    threshold: Option<Threshold>,
}

#[derive(Debug)]
struct Threshold {
    source_id: String,
    timestamp: i64,
}

impl NoveltyFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when `timestamp` is strictly greater than the run threshold.
    ///
    /// The first call queries `store` for `source_id`'s latest timestamp
    /// (absent counts as 0); later calls never touch storage.
    pub async fn is_novel(
        &mut self,
        store: &dyn StorageSink,
        source_id: &str,
        timestamp: i64,
    ) -> Result<bool, StorageError> {
        let threshold = match self.threshold {
            Some(ref threshold) => {
                if threshold.source_id != source_id {
                    debug!(
                        source_id,
                        threshold_source = %threshold.source_id,
                        threshold = threshold.timestamp,
                        "Judging record against another source's threshold"
                    );
                }
                threshold.timestamp
            },
            None => {
                let latest = store.latest_timestamp(source_id).await?.unwrap_or(0);
                debug!(source_id, threshold = latest, "Novelty threshold fixed for run");
                self.threshold = Some(Threshold {
                    source_id: source_id.to_string(),
                    timestamp: latest,
                });
                latest
            },
        };

        Ok(timestamp > threshold)
    }

    /// Threshold in effect, `None` before the first record
    pub fn threshold(&self) -> Option<i64> {
        self.threshold.as_ref().map(|t| t.timestamp)
    }
}
