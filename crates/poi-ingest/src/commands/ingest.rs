//! `poi-ingest ingest` command implementation
//!
//! Runs one worker per file on its own tokio task against a shared store.

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::config::IngestConfig;
use crate::storage::{SqliteStore, StorageSink};
use crate::worker::{IngestionReport, IngestionWorker, WorkerState};

/// Ingest `files` into the SQLite store named by `config`
pub async fn run(files: Vec<PathBuf>, config: IngestConfig) -> anyhow::Result<Vec<IngestionReport>> {
    let store = Arc::new(
        SqliteStore::connect(&config.database_url)
            .await
            .with_context(|| format!("Failed to open store at {}", config.database_url))?,
    );

    let reports = ingest_files(store.clone(), files, &config).await?;
    store.close().await;
    Ok(reports)
}

/// Run one worker per file concurrently and collect their reports
pub async fn ingest_files(
    store: Arc<dyn StorageSink>,
    files: Vec<PathBuf>,
    config: &IngestConfig,
) -> anyhow::Result<Vec<IngestionReport>> {
    let mut tasks = JoinSet::new();
    for path in files {
        let worker = IngestionWorker::from_config(store.clone(), path, config)?;
        tasks.spawn(async move { worker.run().await });
    }

    let mut reports = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(report) => reports.push(report),
            Err(err) => error!(error = %err, "Ingestion task failed"),
        }
    }

    let completed = reports
        .iter()
        .filter(|r| r.state() == WorkerState::Completed)
        .count();
    info!(
        files = reports.len(),
        completed,
        inserted = reports.iter().map(|r| r.inserted).sum::<u64>(),
        skipped = reports.iter().map(|r| r.skipped).sum::<u64>(),
        "Ingestion finished"
    );

    Ok(reports)
}
