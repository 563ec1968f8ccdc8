//! Rebuilds a database from a snapshot.

use crate::body::{ObjectKind, SnapshotBody, TableData};
use crate::error::{CodecError, CodecResult};
use crate::format;
use crate::quote_ident;
use crate::snapshot::Snapshot;
use crate::value::SqlValue;
use rusqlite::{Connection, Transaction};

/// Decodes a snapshot into a fresh in-memory connection.
///
/// Tables are created and filled first; indexes, views and triggers follow
/// in their original order so triggers never fire during the restore.
///
/// # Errors
///
/// Returns a corruption error (see [`CodecError::is_corruption`]) if the
/// bytes are not an intact snapshot, or an engine error if replaying the
/// schema fails.
pub fn decode(snapshot: &Snapshot) -> CodecResult<Connection> {
    let frame = format::unframe(snapshot.as_bytes())?;
    let body = SnapshotBody::from_cbor(frame.body)?;

    let mut conn = Connection::open_in_memory()?;
    restore(&mut conn, &body)?;

    tracing::trace!(
        tables = body.tables.len(),
        objects = body.objects.len(),
        "decoded snapshot"
    );
    Ok(conn)
}

fn restore(conn: &mut Connection, body: &SnapshotBody) -> CodecResult<()> {
    let tx = conn.transaction()?;
    tx.execute_batch("PRAGMA defer_foreign_keys = ON")?;

    for object in body.objects.iter().filter(|o| o.kind == ObjectKind::Table) {
        tx.execute_batch(&object.sql)?;
    }

    for table in &body.tables {
        insert_rows(&tx, table)?;
    }

    if !body.sequences.is_empty() {
        tx.execute("DELETE FROM sqlite_sequence", [])?;
        let mut stmt = tx.prepare("INSERT INTO sqlite_sequence (name, seq) VALUES (?1, ?2)")?;
        for entry in &body.sequences {
            stmt.execute(rusqlite::params![entry.name, entry.seq])?;
        }
    }

    for object in body.objects.iter().filter(|o| o.kind != ObjectKind::Table) {
        tx.execute_batch(&object.sql)?;
    }

    tx.commit()?;
    conn.pragma_update(None, "user_version", body.user_version)?;
    Ok(())
}

fn insert_rows(tx: &Transaction<'_>, table: &TableData) -> CodecResult<()> {
    if table.rows.is_empty() {
        return Ok(());
    }

    let mut targets: Vec<String> = table.columns.iter().map(|c| quote_ident(c)).collect();
    if table.rowid {
        // The table may have a column named `rowid`; `_rowid_`/`oid` were the
        // fallback on encode, so probe the same order here.
        targets.insert(0, rowid_target(table));
    }

    let placeholders: Vec<String> = (1..=targets.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(&table.name),
        targets.join(", "),
        placeholders.join(", ")
    );
    let mut stmt = tx.prepare(&sql)?;

    for row in &table.rows {
        if row.len() != targets.len() {
            return Err(CodecError::decoding_failed(format!(
                "row width {} does not match {} columns in '{}'",
                row.len(),
                targets.len(),
                table.name
            )));
        }
        let values = row
            .iter()
            .cloned()
            .map(SqlValue::from_cbor)
            .collect::<CodecResult<Vec<_>>>()?;
        stmt.execute(rusqlite::params_from_iter(values.iter()))?;
    }
    Ok(())
}

fn rowid_target(table: &TableData) -> String {
    ["rowid", "_rowid_", "oid"]
        .into_iter()
        .find(|alias| !table.columns.iter().any(|c| c.eq_ignore_ascii_case(alias)))
        .unwrap_or("rowid")
        .to_string()
}
