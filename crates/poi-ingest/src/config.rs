//! Configuration for ingestion runs
//!
//! Values come from defaults, then `POI_*` environment variables, then
//! whatever the command line overrides.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::decoder::DEFAULT_MAX_FRAME_LENGTH;
use crate::error::{IngestError, Result};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default store location when `POI_DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://poi.db";

/// Default pause between records, in milliseconds.
pub const DEFAULT_PACE_INTERVAL_MS: u64 = 300;

/// Largest frame limit accepted from configuration (64 MiB).
pub const MAX_FRAME_LENGTH_CEILING: usize = 64 * 1024 * 1024;

/// Ingestion configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// SQLite connection URL
    pub database_url: String,

    /// Pacing interval in milliseconds; 0 disables pacing
    pub pace_interval_ms: u64,

    /// Largest payload a single frame may declare
    pub max_frame_length: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            pace_interval_ms: DEFAULT_PACE_INTERVAL_MS,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

impl IngestConfig {
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder::default()
    }

    /// Load config from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("POI_DATABASE_URL") {
            config.database_url = url;
        }

        if let Some(ms) = lookup("POI_PACE_INTERVAL_MS") {
            config.pace_interval_ms = ms.trim().parse().map_err(|_| {
                IngestError::configuration(format!("POI_PACE_INTERVAL_MS is not a number: {ms}"))
            })?;
        }

        if let Some(len) = lookup("POI_MAX_FRAME_LENGTH") {
            config.max_frame_length = len.trim().parse().map_err(|_| {
                IngestError::configuration(format!("POI_MAX_FRAME_LENGTH is not a number: {len}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(IngestError::configuration("database URL cannot be empty"));
        }
        if self.max_frame_length == 0 {
            return Err(IngestError::configuration("max frame length must be positive"));
        }
        if self.max_frame_length > MAX_FRAME_LENGTH_CEILING {
            return Err(IngestError::configuration(format!(
                "max frame length {} exceeds {} bytes",
                self.max_frame_length, MAX_FRAME_LENGTH_CEILING
            )));
        }
        Ok(())
    }

    pub fn pace_interval(&self) -> Duration {
        Duration::from_millis(self.pace_interval_ms)
    }
}

/// Builder for [`IngestConfig`]
#[derive(Debug, Default)]
pub struct IngestConfigBuilder {
    database_url: Option<String>,
    pace_interval_ms: Option<u64>,
    max_frame_length: Option<usize>,
}

impl IngestConfigBuilder {
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn pace_interval_ms(mut self, ms: u64) -> Self {
        self.pace_interval_ms = Some(ms);
        self
    }

    pub fn max_frame_length(mut self, len: usize) -> Self {
        self.max_frame_length = Some(len);
        self
    }

    pub fn build(self) -> Result<IngestConfig> {
        let defaults = IngestConfig::default();
        let config = IngestConfig {
            database_url: self.database_url.unwrap_or(defaults.database_url),
            pace_interval_ms: self.pace_interval_ms.unwrap_or(defaults.pace_interval_ms),
            max_frame_length: self.max_frame_length.unwrap_or(defaults.max_frame_length),
        };
        config.validate()?;
        Ok(config)
    }
}
