//! The CBOR body carried inside a snapshot frame.

use crate::error::{CodecError, CodecResult};
use serde::{Deserialize, Serialize};

/// Kind of a schema object recorded in `sqlite_master`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// A table.
    Table,
    /// An explicit index.
    Index,
    /// A view.
    View,
    /// A trigger.
    Trigger,
}

impl ObjectKind {
    pub(crate) fn parse(kind: &str) -> CodecResult<Self> {
        match kind {
            "table" => Ok(ObjectKind::Table),
            "index" => Ok(ObjectKind::Index),
            "view" => Ok(ObjectKind::View),
            "trigger" => Ok(ObjectKind::Trigger),
            other => Err(CodecError::unsupported(format!(
                "schema object type '{other}'"
            ))),
        }
    }
}

/// One schema entry, replayed verbatim on decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SchemaObject {
    pub kind: ObjectKind,
    pub name: String,
    pub table: String,
    pub sql: String,
}

/// Rows of one table.
///
/// When `rowid` is set the first cell of every row is the rowid and the
/// remaining cells line up with `columns`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct TableData {
    pub name: String,
    pub columns: Vec<String>,
    pub rowid: bool,
    pub rows: Vec<Vec<ciborium::Value>>,
}

/// An `AUTOINCREMENT` high-water mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SequenceEntry {
    pub name: String,
    pub seq: i64,
}

/// Everything needed to rebuild a database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SnapshotBody {
    pub user_version: i64,
    pub objects: Vec<SchemaObject>,
    pub tables: Vec<TableData>,
    pub sequences: Vec<SequenceEntry>,
}

impl SnapshotBody {
    pub fn to_cbor(&self) -> CodecResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
        Ok(buf)
    }

    pub fn from_cbor(bytes: &[u8]) -> CodecResult<Self> {
        ciborium::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
    }

    pub fn count(&self, kind: ObjectKind) -> usize {
        self.objects.iter().filter(|o| o.kind == kind).count()
    }
}
