//! Reads a live connection into a snapshot.

use crate::body::{ObjectKind, SchemaObject, SequenceEntry, SnapshotBody, TableData};
use crate::error::{CodecError, CodecResult};
use crate::format;
use crate::quote_ident;
use crate::snapshot::Snapshot;
use crate::value::SqlValue;
use rusqlite::Connection;

const ROWID_ALIASES: [&str; 3] = ["rowid", "_rowid_", "oid"];

/// Encodes the complete `main` database of `conn` into a snapshot.
///
/// The connection must not be inside a transaction: an uncommitted
/// transaction would make the image disagree with what other readers see.
///
/// # Errors
///
/// Returns an error if the engine fails while reading or if the schema
/// contains virtual tables.
pub fn encode(conn: &Connection) -> CodecResult<Snapshot> {
    if !conn.is_autocommit() {
        return Err(CodecError::OpenTransaction);
    }

    let body = read_body(conn)?;
    let payload = body.to_cbor()?;

    tracing::trace!(
        tables = body.tables.len(),
        objects = body.objects.len(),
        body_bytes = payload.len(),
        "encoded snapshot"
    );
    Ok(Snapshot::from_bytes(format::frame(&payload)))
}

fn read_body(conn: &Connection) -> CodecResult<SnapshotBody> {
    let user_version: i64 = conn.pragma_query_value(None, "user_version", |r| r.get(0))?;
    let objects = read_schema(conn)?;

    let mut tables = Vec::new();
    for object in objects.iter().filter(|o| o.kind == ObjectKind::Table) {
        tables.push(read_table(conn, object)?);
    }

    Ok(SnapshotBody {
        user_version,
        objects,
        tables,
        sequences: read_sequences(conn)?,
    })
}

fn read_schema(conn: &Connection) -> CodecResult<Vec<SchemaObject>> {
    // Internal objects and automatic indexes are recreated by the engine.
    let mut stmt = conn.prepare(
        r"SELECT type, name, tbl_name, sql FROM sqlite_master
          WHERE sql IS NOT NULL AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
          ORDER BY rowid",
    )?;
    let mut rows = stmt.query([])?;

    let mut objects = Vec::new();
    while let Some(row) = rows.next()? {
        let kind: String = row.get(0)?;
        let name: String = row.get(1)?;
        let sql: String = row.get(3)?;

        if is_virtual(&sql) {
            return Err(CodecError::unsupported(format!("virtual table '{name}'")));
        }

        objects.push(SchemaObject {
            kind: ObjectKind::parse(&kind)?,
            name,
            table: row.get(2)?,
            sql,
        });
    }
    Ok(objects)
}

fn is_virtual(sql: &str) -> bool {
    let head: String = sql
        .split_whitespace()
        .take(3)
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase();
    head == "CREATE VIRTUAL TABLE"
}

struct ColumnInfo {
    name: String,
    decl_type: String,
    pk: i64,
    hidden: i64,
}

fn table_columns(conn: &Connection, table: &str) -> CodecResult<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_xinfo({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get("name")?,
                decl_type: row.get::<_, Option<String>>("type")?.unwrap_or_default(),
                pk: row.get("pk")?,
                hidden: row.get("hidden")?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Picks a name that reaches the real rowid, or `None` for tables without one.
fn rowid_alias(conn: &Connection, table: &str, columns: &[ColumnInfo]) -> Option<&'static str> {
    let alias = ROWID_ALIASES.into_iter().find(|alias| {
        !columns
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case(alias))
    })?;

    // WITHOUT ROWID tables reject the alias at prepare time.
    conn.prepare(&format!("SELECT {alias} FROM {} LIMIT 0", quote_ident(table)))
        .ok()
        .map(|_| alias)
}

/// True when a single `INTEGER PRIMARY KEY` column already stores the rowid.
///
/// `INTEGER PRIMARY KEY DESC` is not an alias; SQLite backs that key with
/// an automatic index, which a real alias never has.
fn has_rowid_column(
    conn: &Connection,
    table: &str,
    columns: &[ColumnInfo],
) -> CodecResult<bool> {
    let mut pk = columns.iter().filter(|c| c.pk > 0);
    let single_integer = match (pk.next(), pk.next()) {
        (Some(col), None) => col.decl_type.eq_ignore_ascii_case("INTEGER"),
        _ => false,
    };
    if !single_integer {
        return Ok(false);
    }

    let mut stmt = conn.prepare(&format!("PRAGMA index_list({})", quote_ident(table)))?;
    let origins = stmt
        .query_map([], |row| row.get::<_, String>("origin"))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(!origins.iter().any(|origin| origin == "pk"))
}

fn read_table(conn: &Connection, object: &SchemaObject) -> CodecResult<TableData> {
    let all_columns = table_columns(conn, &object.name)?;
    let alias = rowid_alias(conn, &object.name, &all_columns);
    let store_rowid = alias.is_some() && !has_rowid_column(conn, &object.name, &all_columns)?;

    let columns: Vec<String> = all_columns
        .iter()
        .filter(|c| c.hidden == 0)
        .map(|c| c.name.clone())
        .collect();

    let mut select: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    if let (true, Some(alias)) = (store_rowid, alias) {
        select.insert(0, alias.to_string());
    }

    let mut sql = format!(
        "SELECT {} FROM {}",
        select.join(", "),
        quote_ident(&object.name)
    );
    if let Some(alias) = alias {
        sql.push_str(&format!(" ORDER BY {alias}"));
    }

    let mut stmt = conn.prepare(&sql)?;
    let width = stmt.column_count();
    let mut rows = stmt.query([])?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(width);
        for i in 0..width {
            let value: SqlValue = row.get(i)?;
            cells.push(value.to_cbor());
        }
        out.push(cells);
    }

    Ok(TableData {
        name: object.name.clone(),
        columns,
        rowid: store_rowid,
        rows: out,
    })
}

fn read_sequences(conn: &Connection) -> CodecResult<Vec<SequenceEntry>> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'sqlite_sequence')",
        [],
        |r| r.get(0),
    )?;
    if !exists {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare("SELECT name, seq FROM sqlite_sequence ORDER BY rowid")?;
    let entries = stmt
        .query_map([], |row| {
            Ok(SequenceEntry {
                name: row.get(0)?,
                seq: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}
