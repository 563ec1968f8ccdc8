//! Store manifest for the file backend.

use crate::error::{StorageError, StorageResult};

/// Magic bytes for the manifest file.
pub const MANIFEST_MAGIC: [u8; 4] = *b"SQKV";

/// Current manifest encoding version.
pub const MANIFEST_VERSION: u16 = 1;

/// Structural metadata of a file-backed store.
///
/// The manifest stores:
/// - Store version (bumped by upgrades)
/// - Namespaces created so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreManifest {
    /// Store version.
    pub version: u32,
    /// Namespaces, in creation order.
    pub namespaces: Vec<String>,
}

impl StoreManifest {
    /// Returns true if the namespace has been created.
    #[must_use]
    pub fn has_namespace(&self, name: &str) -> bool {
        self.namespaces.iter().any(|n| n == name)
    }

    /// Adds a namespace unless it already exists.
    pub fn add_namespace(&mut self, name: &str) -> bool {
        if self.has_namespace(name) {
            return false;
        }
        self.namespaces.push(name.to_string());
        true
    }

    /// Encodes the manifest to bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        buf.extend_from_slice(&MANIFEST_MAGIC);
        buf.extend_from_slice(&MANIFEST_VERSION.to_le_bytes());
        buf.extend_from_slice(&self.version.to_le_bytes());

        let count = u32::try_from(self.namespaces.len()).unwrap_or(u32::MAX);
        buf.extend_from_slice(&count.to_le_bytes());

        for name in &self.namespaces {
            let name_bytes = name.as_bytes();
            let name_len = u16::try_from(name_bytes.len()).unwrap_or(u16::MAX);
            buf.extend_from_slice(&name_len.to_le_bytes());
            buf.extend_from_slice(&name_bytes[..usize::from(name_len)]);
        }

        buf
    }

    /// Decodes a manifest from bytes.
    pub fn decode(data: &[u8]) -> StorageResult<Self> {
        let mut reader = Reader { data, cursor: 0 };

        if reader.take(4)? != MANIFEST_MAGIC {
            return Err(StorageError::corrupted("invalid manifest magic"));
        }

        let encoding = u16::from_le_bytes(reader.array()?);
        if encoding > MANIFEST_VERSION {
            return Err(StorageError::corrupted(format!(
                "unsupported manifest encoding: {encoding}"
            )));
        }

        let version = u32::from_le_bytes(reader.array()?);
        let count = u32::from_le_bytes(reader.array()?) as usize;

        let mut namespaces = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            let len = usize::from(u16::from_le_bytes(reader.array()?));
            let name = std::str::from_utf8(reader.take(len)?)
                .map_err(|_| StorageError::corrupted("invalid namespace name"))?;
            namespaces.push(name.to_string());
        }

        Ok(Self {
            version,
            namespaces,
        })
    }
}

struct Reader<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> StorageResult<&'a [u8]> {
        let end = self.cursor.saturating_add(len);
        if end > self.data.len() {
            return Err(StorageError::corrupted("manifest too short"));
        }
        let slice = &self.data[self.cursor..end];
        self.cursor = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> StorageResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode() {
        let mut manifest = StoreManifest {
            version: 2,
            namespaces: Vec::new(),
        };
        assert!(manifest.add_namespace("sqlite-files"));
        assert!(manifest.add_namespace("meta"));
        assert!(!manifest.add_namespace("meta"));

        let decoded = StoreManifest::decode(&manifest.encode()).unwrap();
        assert_eq!(decoded, manifest);
    }

    #[test]
    fn bad_magic_rejected() {
        let mut bytes = StoreManifest::default().encode();
        bytes[0] = b'X';
        assert!(matches!(
            StoreManifest::decode(&bytes),
            Err(StorageError::Corrupted(_))
        ));
    }

    #[test]
    fn truncated_rejected() {
        let manifest = StoreManifest {
            version: 1,
            namespaces: vec!["files".into()],
        };
        let bytes = manifest.encode();
        let result = StoreManifest::decode(&bytes[..bytes.len() - 2]);
        assert!(matches!(result, Err(StorageError::Corrupted(_))));
    }
}
