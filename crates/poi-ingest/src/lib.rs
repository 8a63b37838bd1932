//! POI Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Ingests point-of-interest files received from peers: decode the
//! length-delimited records, keep the ones newer than what is stored, and
//! remove the file once it has been consumed.
//!
//! # Example
//!
//! ```no_run
//! use poi_ingest::storage::{SqliteStore, StorageSink};
//! use poi_ingest::IngestionWorker;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store: Arc<dyn StorageSink> = Arc::new(SqliteStore::connect("sqlite://poi.db").await?);
//!     let report = IngestionWorker::new(store, "./inbox/peer-0001.bin")?.run().await;
//!     println!("inserted {} records", report.inserted);
//!     Ok(())
//! }
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;
pub mod config;
pub mod decoder;
pub mod error;
pub mod novelty;
pub mod pacing;
pub mod record;
pub mod storage;
pub mod worker;

// Re-export commonly used types
pub use config::IngestConfig;
pub use decoder::RecordDecoder;
pub use error::{DecodeError, IngestError, Result, StorageError};
pub use record::Record;
pub use worker::{IngestionReport, IngestionWorker, RunOutcome, WorkerState};

/// POI Ingest - load peer point-of-interest files into the local store
#[derive(Parser, Debug)]
#[command(name = "poi-ingest")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// SQLite database URL (overrides POI_DATABASE_URL)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Pause between records in milliseconds (overrides POI_PACE_INTERVAL_MS)
    #[arg(long, global = true)]
    pub pace_ms: Option<u64>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest peer files into the store, deleting each once consumed
    Ingest {
        /// Files to ingest, one worker each
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the records of a peer file as JSON lines without storing or deleting it
    Inspect {
        /// File to decode
        file: PathBuf,
    },

    /// Encode JSON-lines records into a peer file
    Pack {
        /// JSON-lines input, one record per line
        #[arg(short, long)]
        input: PathBuf,

        /// Length-delimited output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

impl Cli {
    /// Environment configuration with command-line overrides applied
    pub fn ingest_config(&self) -> Result<IngestConfig> {
        let mut config = IngestConfig::from_env()?;

        if let Some(ref url) = self.database_url {
            config.database_url = url.clone();
        }
        if let Some(ms) = self.pace_ms {
            config.pace_interval_ms = ms;
        }

        config.validate()?;
        Ok(config)
    }
}
