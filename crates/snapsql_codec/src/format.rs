//! Snapshot framing: magic, version and checksum trailer.

use crate::error::{CodecError, CodecResult};
use sha2::{Digest, Sha256};

/// Magic bytes at the start of every snapshot.
pub const SNAPSHOT_MAGIC: [u8; 4] = *b"SQSN";

/// Current snapshot format version.
pub const FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = 6;
const CHECKSUM_LEN: usize = 32;

/// Wraps a CBOR body in header and checksum.
pub(crate) fn frame(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + body.len() + CHECKSUM_LEN);
    out.extend_from_slice(&SNAPSHOT_MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(body);

    let digest = Sha256::digest(&out);
    out.extend_from_slice(&digest);
    out
}

/// Validated view of a framed snapshot.
pub(crate) struct Frame<'a> {
    pub version: u16,
    pub body: &'a [u8],
    pub checksum: &'a [u8],
}

/// Checks magic, version and checksum, returning the body.
pub(crate) fn unframe(data: &[u8]) -> CodecResult<Frame<'_>> {
    if data.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(CodecError::invalid_format(format!(
            "snapshot too short: {} bytes",
            data.len()
        )));
    }

    if data[..4] != SNAPSHOT_MAGIC {
        return Err(CodecError::invalid_format("invalid snapshot magic"));
    }

    let version = u16::from_le_bytes([data[4], data[5]]);
    if version == 0 {
        return Err(CodecError::invalid_format("snapshot version 0"));
    }
    if version > FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }

    let (content, checksum) = data.split_at(data.len() - CHECKSUM_LEN);
    if Sha256::digest(content).as_slice() != checksum {
        return Err(CodecError::ChecksumMismatch);
    }

    Ok(Frame {
        version,
        body: &content[HEADER_LEN..],
        checksum,
    })
}

/// Lowercase hex of a byte slice.
pub(crate) fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}
