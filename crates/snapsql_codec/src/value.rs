//! Dynamic SQL value type.

use crate::error::{CodecError, CodecResult};
use rusqlite::types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use std::fmt;

/// CBOR tag wrapping the bytes of a [`SqlValue::RawText`] cell.
pub(crate) const RAW_TEXT_TAG: u64 = 0x5351;

/// A single SQLite value, one per storage class.
///
/// Rows inside a snapshot are sequences of these. SQLite does not check
/// that TEXT is valid UTF-8, so text that is not lands in
/// [`SqlValue::RawText`] and keeps the TEXT storage class. Floats keep their
/// exact bit pattern through the CBOR body.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// 64-bit signed integer.
    Integer(i64),
    /// IEEE 754 double.
    Real(f64),
    /// UTF-8 text.
    Text(String),
    /// TEXT whose bytes are not valid UTF-8.
    RawText(Vec<u8>),
    /// Raw bytes.
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Returns true for NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Returns the integer if this is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the text if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Converts to the CBOR representation stored in snapshot bodies.
    pub(crate) fn to_cbor(&self) -> ciborium::Value {
        match self {
            SqlValue::Null => ciborium::Value::Null,
            SqlValue::Integer(n) => ciborium::Value::Integer((*n).into()),
            SqlValue::Real(f) => ciborium::Value::Float(*f),
            SqlValue::Text(s) => ciborium::Value::Text(s.clone()),
            SqlValue::RawText(b) => ciborium::Value::Tag(
                RAW_TEXT_TAG,
                Box::new(ciborium::Value::Bytes(b.clone())),
            ),
            SqlValue::Blob(b) => ciborium::Value::Bytes(b.clone()),
        }
    }

    /// Converts back from a snapshot body value.
    pub(crate) fn from_cbor(value: ciborium::Value) -> CodecResult<Self> {
        match value {
            ciborium::Value::Null => Ok(SqlValue::Null),
            ciborium::Value::Integer(n) => i64::try_from(n)
                .map(SqlValue::Integer)
                .map_err(|_| CodecError::decoding_failed("integer out of i64 range")),
            ciborium::Value::Float(f) => Ok(SqlValue::Real(f)),
            ciborium::Value::Text(s) => Ok(SqlValue::Text(s)),
            ciborium::Value::Bytes(b) => Ok(SqlValue::Blob(b)),
            ciborium::Value::Tag(RAW_TEXT_TAG, inner) => match *inner {
                ciborium::Value::Bytes(b) => Ok(SqlValue::RawText(b)),
                other => Err(CodecError::decoding_failed(format!(
                    "raw text cell holds {other:?}"
                ))),
            },
            other => Err(CodecError::decoding_failed(format!(
                "unexpected cell value: {other:?}"
            ))),
        }
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(match self {
            SqlValue::Null => ValueRef::Null,
            SqlValue::Integer(n) => ValueRef::Integer(*n),
            SqlValue::Real(f) => ValueRef::Real(*f),
            SqlValue::Text(s) => ValueRef::Text(s.as_bytes()),
            SqlValue::RawText(b) => ValueRef::Text(b),
            SqlValue::Blob(b) => ValueRef::Blob(b),
        }))
    }
}

impl FromSql for SqlValue {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(n) => SqlValue::Integer(n),
            ValueRef::Real(f) => SqlValue::Real(f),
            ValueRef::Text(t) => match std::str::from_utf8(t) {
                Ok(s) => SqlValue::Text(s.to_owned()),
                Err(_) => SqlValue::RawText(t.to_vec()),
            },
            ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
        })
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Integer(n) => write!(f, "{n}"),
            SqlValue::Real(x) => write!(f, "{x}"),
            SqlValue::Text(s) => f.write_str(s),
            SqlValue::RawText(b) => f.write_str(&String::from_utf8_lossy(b)),
            SqlValue::Blob(b) => write!(f, "x'{}'", crate::format::hex(b)),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        SqlValue::Integer(n)
    }
}

impl From<f64> for SqlValue {
    fn from(x: f64) -> Self {
        SqlValue::Real(x)
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(b: Vec<u8>) -> Self {
        SqlValue::Blob(b)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn cbor_conversion_keeps_storage_class() {
        let values = vec![
            SqlValue::Null,
            SqlValue::Integer(i64::MIN),
            SqlValue::Integer(i64::MAX),
            SqlValue::Real(0.1),
            SqlValue::Real(-0.0),
            SqlValue::Text("héllo".into()),
            SqlValue::RawText(vec![0xff, b'a', 0xc3]),
            SqlValue::Blob(vec![0, 1, 255]),
        ];
        for v in values {
            let back = SqlValue::from_cbor(v.to_cbor()).unwrap();
            match (&v, &back) {
                (SqlValue::Real(a), SqlValue::Real(b)) => assert_eq!(a.to_bits(), b.to_bits()),
                _ => assert_eq!(v, back),
            }
        }
    }

    #[test]
    fn oversized_integer_rejected() {
        let big = ciborium::Value::Integer(u64::MAX.into());
        assert!(SqlValue::from_cbor(big).is_err());
    }

    #[test]
    fn raw_text_tag_must_wrap_bytes() {
        let bad = ciborium::Value::Tag(RAW_TEXT_TAG, Box::new(ciborium::Value::Text("x".into())));
        assert!(SqlValue::from_cbor(bad).is_err());
    }

    #[test]
    fn non_utf8_text_stays_text() {
        let conn = Connection::open_in_memory().unwrap();
        let v: SqlValue = conn
            .query_row("SELECT CAST(x'ff61' AS TEXT)", [], |r| r.get(0))
            .unwrap();
        assert_eq!(v, SqlValue::RawText(vec![0xff, 0x61]));

        let (kind, bytes): (String, Vec<u8>) = conn
            .query_row("SELECT typeof(?1), CAST(?1 AS BLOB)", [&v], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(kind, "text");
        assert_eq!(bytes, vec![0xff, 0x61]);
        assert_eq!(v.to_string(), "\u{fffd}a");
    }

    #[test]
    fn non_scalar_rejected() {
        let arr = ciborium::Value::Array(vec![]);
        assert!(SqlValue::from_cbor(arr).is_err());
    }

    #[test]
    fn binds_and_reads_through_sqlite() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (v)", []).unwrap();
        let inputs = [
            SqlValue::Null,
            SqlValue::Integer(42),
            SqlValue::Real(2.5),
            SqlValue::Text("text".into()),
            SqlValue::Blob(vec![9, 8, 7]),
        ];
        for v in &inputs {
            conn.execute("INSERT INTO t (v) VALUES (?1)", [v]).unwrap();
        }

        let mut stmt = conn.prepare("SELECT v FROM t ORDER BY rowid").unwrap();
        let read: Vec<SqlValue> = stmt
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(read, inputs);
    }

    #[test]
    fn display_forms() {
        assert_eq!(SqlValue::Null.to_string(), "NULL");
        assert_eq!(SqlValue::Integer(-3).to_string(), "-3");
        assert_eq!(SqlValue::Blob(vec![0xde, 0xad]).to_string(), "x'dead'");
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
    }
}
