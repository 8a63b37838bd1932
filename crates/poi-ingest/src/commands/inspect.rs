//! `poi-ingest inspect` command implementation
//!
//! Decodes a peer file and prints its records as JSON lines. The file is
//! neither stored nor deleted.

use anyhow::Context;
use std::io::Write;
use std::path::Path;
use tokio::fs::File;

use crate::decoder::RecordDecoder;

/// Print every record in `path` to stdout
pub async fn run(path: &Path, max_frame_length: usize) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    inspect_to(path, max_frame_length, &mut out).await?;
    Ok(())
}

/// Write every record in `path` to `out`, one JSON object per line.
///
/// Records before a corrupt frame are still written; the decode error is
/// returned afterwards.
pub async fn inspect_to<W: Write>(
    path: &Path,
    max_frame_length: usize,
    out: &mut W,
) -> anyhow::Result<usize> {
    let file = File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut decoder = RecordDecoder::with_max_frame_length(file, max_frame_length);

    let mut count = 0;
    while let Some(record) = decoder
        .next_record()
        .await
        .with_context(|| format!("{} is corrupt after {count} records", path.display()))?
    {
        serde_json::to_writer(&mut *out, &record)?;
        writeln!(out)?;
        count += 1;
    }

    Ok(count)
}
