//! # SnapSQL Codec
//!
//! Whole-database snapshots for an in-memory SQLite connection.
//!
//! A snapshot is a complete, self-contained image of every schema object
//! and row in the `main` database:
//!
//! - Identical database contents produce identical snapshot bytes
//! - Decoding a snapshot yields a connection whose queries return exactly
//!   what the source connection returned at encode time
//! - A snapshot is either complete or not produced at all
//!
//! ## Wire Format
//!
//! ```text
//! "SQSN" | format version (u16 LE) | CBOR body | SHA-256 of everything before it
//! ```
//!
//! The CBOR body records `PRAGMA user_version`, schema objects in creation
//! order, table rows (with rowids where the table has them) and the
//! `sqlite_sequence` counters used by `AUTOINCREMENT`.
//!
//! ## Usage
//!
//! ```
//! use rusqlite::Connection;
//!
//! let conn = Connection::open_in_memory().unwrap();
//! conn.execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (7);").unwrap();
//!
//! let snapshot = snapsql_codec::encode(&conn).unwrap();
//! let restored = snapsql_codec::decode(&snapshot).unwrap();
//!
//! let x: i64 = restored.query_row("SELECT x FROM t", [], |r| r.get(0)).unwrap();
//! assert_eq!(x, 7);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod body;
mod decoder;
mod encoder;
mod error;
mod format;
mod inspect;
mod snapshot;
mod value;

pub use body::ObjectKind;
pub use decoder::decode;
pub use encoder::encode;
pub use error::{CodecError, CodecResult};
pub use format::{FORMAT_VERSION, SNAPSHOT_MAGIC};
pub use inspect::{inspect, SnapshotSummary, TableSummary};
pub use snapshot::Snapshot;
pub use value::SqlValue;

/// Quotes an SQL identifier with double quotes.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
