//! Offline snapshot summaries.

use crate::body::{ObjectKind, SnapshotBody};
use crate::error::CodecResult;
use crate::format;
use serde::Serialize;

/// Row count for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    /// Table name.
    pub name: String,
    /// Number of rows stored.
    pub rows: usize,
}

/// What a snapshot contains, without opening a database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    /// Snapshot format version.
    pub format_version: u16,
    /// `PRAGMA user_version` at encode time.
    pub user_version: i64,
    /// Tables in creation order.
    pub tables: Vec<TableSummary>,
    /// Number of explicit indexes.
    pub indexes: usize,
    /// Number of views.
    pub views: usize,
    /// Number of triggers.
    pub triggers: usize,
    /// Total encoded size in bytes.
    pub size: usize,
    /// SHA-256 trailer as lowercase hex.
    pub checksum: String,
}

impl SnapshotSummary {
    /// Sum of rows over all tables.
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

/// Validates `data` as a snapshot and summarizes it.
///
/// # Errors
///
/// Returns a corruption error if the framing, checksum or body is invalid.
pub fn inspect(data: &[u8]) -> CodecResult<SnapshotSummary> {
    let frame = format::unframe(data)?;
    let body = SnapshotBody::from_cbor(frame.body)?;

    Ok(SnapshotSummary {
        format_version: frame.version,
        user_version: body.user_version,
        tables: body
            .tables
            .iter()
            .map(|t| TableSummary {
                name: t.name.clone(),
                rows: t.rows.len(),
            })
            .collect(),
        indexes: body.count(ObjectKind::Index),
        views: body.count(ObjectKind::View),
        triggers: body.count(ObjectKind::Trigger),
        size: data.len(),
        checksum: format::hex(frame.checksum),
    })
}
