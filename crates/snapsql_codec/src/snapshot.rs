//! Opaque snapshot bytes.

use bytes::Bytes;
use std::fmt;

/// A complete serialized image of a database.
///
/// Cloning is cheap; the bytes are reference counted. A `Snapshot` built
/// with [`Snapshot::from_bytes`] is not validated until it is decoded or
/// inspected.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Snapshot {
    bytes: Bytes,
}

impl Snapshot {
    /// Wraps raw bytes, typically read back from a store.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Borrows the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns a shared handle to the bytes.
    pub fn to_bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    /// Consumes the snapshot, returning its bytes.
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Encoded length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if there are no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tail = self.bytes.len().saturating_sub(4);
        f.debug_struct("Snapshot")
            .field("len", &self.bytes.len())
            .field("tail", &crate::format::hex(&self.bytes[tail..]))
            .finish()
    }
}

impl From<Snapshot> for Bytes {
    fn from(snapshot: Snapshot) -> Self {
        snapshot.bytes
    }
}

impl AsRef<[u8]> for Snapshot {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
