//! Deliberate delays between processing steps
//!
//! Ingestion runs on shared hardware next to the map UI, so the worker
//! throttles itself rather than draining a file as fast as storage allows.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Default pause between records
pub const DEFAULT_PACE_INTERVAL: Duration = Duration::from_millis(300);

/// Source of pacing delays for the ingestion loop
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Wait one pacing interval. Never fails; an interrupted wait counts as elapsed.
    async fn pace(&self);
}

/// Fixed-interval pacer backed by the tokio timer
#[derive(Debug, Clone)]
pub struct IntervalPacer {
    interval: Duration,
    cancel: CancellationToken,
    cancel_reported: Arc<AtomicBool>,
}

impl IntervalPacer {
    pub fn new(interval: Duration) -> Self {
        Self::with_cancellation(interval, CancellationToken::new())
    }

    /// Interrupt waits through `cancel`.
    ///
    /// Cancellation only cuts the current wait short; it does not stop the run.
    pub fn with_cancellation(interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            interval,
            cancel,
            cancel_reported: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// `true` only for the first interrupted wait; clones share the flag
    fn first_cancellation(&self) -> bool {
        !self.cancel_reported.swap(true, Ordering::Relaxed)
    }
}

impl Default for IntervalPacer {
    fn default() -> Self {
        Self::new(DEFAULT_PACE_INTERVAL)
    }
}

#[async_trait]
impl Pacer for IntervalPacer {
    async fn pace(&self) {
        if self.interval.is_zero() {
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(self.interval) => {}
            _ = self.cancel.cancelled() => {
                if self.first_cancellation() {
                    warn!(
                        interval_ms = self.interval.as_millis() as u64,
                        "Pacing wait interrupted by cancellation, continuing without delays"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_pace_waits_full_interval() {
        let pacer = IntervalPacer::default();
        let started = Instant::now();
        pacer.pace().await;
        assert!(started.elapsed() >= DEFAULT_PACE_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_cuts_wait_short_without_failing() {
        let cancel = CancellationToken::new();
        let pacer = IntervalPacer::with_cancellation(Duration::from_secs(60), cancel.clone());

        let started = Instant::now();
        let waiter = tokio::spawn({
            let pacer = pacer.clone();
            async move { pacer.pace().await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        waiter.await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_reported_once() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let pacer = IntervalPacer::with_cancellation(Duration::from_secs(60), cancel);
        let clone = pacer.clone();

        let started = Instant::now();
        for _ in 0..3 {
            pacer.pace().await;
            clone.pace().await;
        }
        assert!(started.elapsed() < Duration::from_secs(60));

        assert!(!pacer.first_cancellation());
        assert!(!clone.first_cancellation());
    }

    #[test]
    fn test_first_cancellation_flag() {
        let pacer = IntervalPacer::default();
        assert!(pacer.first_cancellation());
        assert!(!pacer.first_cancellation());
    }

    #[tokio::test]
    async fn test_zero_interval_returns_immediately() {
        let pacer = IntervalPacer::new(Duration::ZERO);
        pacer.pace().await;
        assert!(pacer.interval().is_zero());
    }
}
