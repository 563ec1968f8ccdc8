//! Export and import of raw snapshots.
//!
//! Both commands move the stored record byte for byte. Import validates the
//! framing and checksum before anything is written.

use super::{CliResult, Target};
use bytes::Bytes;
use snapsql_codec::SnapshotSummary;
use snapsql_storage::KvStore;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Copies the stored snapshot to `output_path`.
pub async fn export_to(target: &Target, output_path: &Path) -> CliResult<usize> {
    let (store, config) = target.existing()?;
    let handle = store.open().await?;
    let bytes = store
        .get(&handle, &config.record_key)
        .await
        .ok_or("Store holds no snapshot")?;

    let mut file = fs::File::create(output_path)?;
    file.write_all(&bytes)?;
    file.sync_all()?;

    info!(path = %output_path.display(), bytes = bytes.len(), "snapshot exported");
    Ok(bytes.len())
}

/// Replaces the stored snapshot with the contents of `input_path`.
///
/// The store is created if it does not exist yet.
pub async fn import_from(target: &Target, input_path: &Path) -> CliResult<SnapshotSummary> {
    let data = fs::read(input_path)?;
    let summary = snapsql_codec::inspect(&data)?;

    let config = target.config()?;
    let store = KvStore::new(target.backend(), config.store_spec());
    let handle = store.open().await?;
    store
        .put(&handle, &config.record_key, Bytes::from(data))
        .await?;

    info!(path = %input_path.display(), bytes = summary.size, "snapshot imported");
    Ok(summary)
}

/// Runs the export command.
pub async fn export(target: &Target, output_path: &Path) -> CliResult<()> {
    let size = export_to(target, output_path).await?;
    println!("✓ Snapshot exported");
    println!("  Path: {}", output_path.display());
    println!("  Size: {} bytes", size);
    Ok(())
}

/// Runs the import command.
pub async fn import(target: &Target, input_path: &Path) -> CliResult<()> {
    let summary = import_from(target, input_path).await?;
    println!("✓ Snapshot imported into {}", target.describe());
    println!("  Tables: {}", summary.tables.len());
    println!("  Rows:   {}", summary.total_rows());
    println!("  Size:   {} bytes", summary.size);
    Ok(())
}
