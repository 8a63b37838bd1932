//! `poi-ingest pack` command implementation
//!
//! Builds a peer file from JSON lines, mostly for preparing fixtures.

use anyhow::Context;
use std::path::Path;
use tracing::info;

use crate::decoder::encode_records;
use crate::record::Record;

/// Encode the records in `input` into `output`, returning how many were written
pub async fn run(input: &Path, output: &Path) -> anyhow::Result<usize> {
    let text = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let records = parse_json_lines(&text)?;

    tokio::fs::write(output, encode_records(&records))
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(records = records.len(), output = %output.display(), "Packed records");
    Ok(records.len())
}

/// Parse one record per non-blank line; missing fields take their defaults
pub fn parse_json_lines(text: &str) -> anyhow::Result<Vec<Record>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid record on line {}", i + 1))
        })
        .collect()
}
