//! Inspect command implementation.

use super::{CliResult, Target};
use serde::Serialize;
use snapsql_codec::SnapshotSummary;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store location.
    pub store: String,
    /// Store schema version from the manifest.
    pub store_version: u32,
    /// Record namespace.
    pub namespace: String,
    /// Record key.
    pub key: String,
    /// Snapshot contents, if a record exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SnapshotSummary>,
}

/// Reads the durable record without bootstrapping a database.
pub async fn collect(target: &Target) -> CliResult<InspectResult> {
    let (store, config) = target.existing()?;
    let handle = store.open().await?;

    let snapshot = match store.get(&handle, &config.record_key).await {
        Some(bytes) => Some(snapsql_codec::inspect(&bytes)?),
        None => None,
    };

    Ok(InspectResult {
        store: target.describe(),
        store_version: config.store_version,
        namespace: config.namespace,
        key: config.record_key,
        snapshot,
    })
}

/// Runs the inspect command.
pub async fn run(target: &Target, format: &str) -> CliResult<()> {
    let result = collect(target).await?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("SnapSQL Store Inspection");
    println!("========================");
    println!();
    println!("Store:     {}", result.store);
    println!("Version:   {}", result.store_version);
    println!("Record:    {}/{}", result.namespace, result.key);
    println!();

    let Some(snapshot) = &result.snapshot else {
        println!("No snapshot stored.");
        return;
    };

    println!("Snapshot:");
    println!("  Format:       v{}", snapshot.format_version);
    println!("  Size:         {} bytes", format_size(snapshot.size as u64));
    println!("  Checksum:     {}", snapshot.checksum);
    println!("  User version: {}", snapshot.user_version);
    println!();
    println!("Schema:");
    println!("  Tables:   {}", snapshot.tables.len());
    println!("  Indexes:  {}", snapshot.indexes);
    println!("  Views:    {}", snapshot.views);
    println!("  Triggers: {}", snapshot.triggers);

    if !snapshot.tables.is_empty() {
        println!();
        println!("Tables:");
        for table in &snapshot.tables {
            println!("  {} ({} rows)", table.name, table.rows);
        }
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{}", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
