//! Transfer metadata codec.
//!
//! Symbol id 0 of every session carries one `TransferMetadata` payload: the
//! receiver cannot name, size, or verify the file without it. The sender
//! retransmits it periodically, so a receiver that missed (or rejected) one
//! copy simply waits for the next.
//!
//! The layout is hand-rolled length-prefixed binary rather than a serde
//! format: the fields are fixed by the wire protocol and the whole string
//! must fit inside a single payload block, padding included.
//!
//! Layout: `filenameLen u8 | filename | mimeLen u8 | mime | fileSize u32 BE |
//! digest 32B | K u32 BE | mode u8`. The `mode` byte was absent in early
//! streams and defaults to 0 when missing. Trailing zero padding (the payload
//! is padded to the session block size) is ignored.

use crate::{
    errors::{ProtocolError, Result},
    header::ChannelHint,
};

/// Maximum encoded length of the filename and MIME strings.
const MAX_STRING_LEN: usize = 255;

/// Length of a SHA-256 digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// Session metadata describing the file in flight.
///
/// # Invariants
///
/// - `source_blocks` is K, the *source* block count. The packet header's
///   `k` field carries K′ (source + parity); the decoder needs both to
///   rebuild the parity map.
/// - `digest` is the SHA-256 of the original (unpadded) file bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferMetadata {
    /// Original filename, UTF-8, at most 255 bytes encoded
    pub filename: String,
    /// MIME type, UTF-8, at most 255 bytes encoded
    pub mime: String,
    /// Original file size in bytes (before zero padding)
    pub file_size: u32,
    /// SHA-256 digest of the original file bytes
    pub digest: [u8; DIGEST_LEN],
    /// Number of source blocks K
    pub source_blocks: u32,
    /// Channel-mode hint the sender was configured with
    pub mode: ChannelHint,
}

impl TransferMetadata {
    /// Serialize into the length-prefixed wire layout.
    ///
    /// Strings longer than 255 bytes are truncated at a character boundary.
    /// The result is NOT padded to the block size; the encoder pads when it
    /// builds the metadata packet.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let filename = truncate_utf8(&self.filename, MAX_STRING_LEN);
        let mime = truncate_utf8(&self.mime, MAX_STRING_LEN);

        let mut out = Vec::with_capacity(2 + filename.len() + mime.len() + 4 + DIGEST_LEN + 5);
        out.push(filename.len() as u8);
        out.extend_from_slice(filename.as_bytes());
        out.push(mime.len() as u8);
        out.extend_from_slice(mime.as_bytes());
        out.extend_from_slice(&self.file_size.to_be_bytes());
        out.extend_from_slice(&self.digest);
        out.extend_from_slice(&self.source_blocks.to_be_bytes());
        out.push(self.mode.to_bits());
        out
    }

    /// Parse a metadata payload.
    ///
    /// Trailing padding after the last field is ignored. A missing `mode`
    /// byte defaults to [`ChannelHint::Mono`] for compatibility with streams
    /// that predate the field.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::MetadataTruncated` if a declared length overruns
    ///   the payload
    /// - `ProtocolError::MetadataUtf8` if a string field is not UTF-8
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor { bytes, pos: 0 };

        let filename = cursor.read_string("filename")?;
        let mime = cursor.read_string("mime")?;
        let file_size = u32::from_be_bytes(cursor.read_array("file_size")?);
        let digest = cursor.read_array::<DIGEST_LEN>("digest")?;
        let source_blocks = u32::from_be_bytes(cursor.read_array("source_blocks")?);

        // Optional trailing mode byte; absent in v0 payloads.
        let mode = match cursor.read_u8() {
            Some(bits) => ChannelHint::from_bits(bits),
            None => ChannelHint::Mono,
        };

        Ok(Self { filename, mime, file_size, digest, source_blocks, mode })
    }
}

/// Byte-cursor over a metadata payload.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn read_u8(&mut self) -> Option<u8> {
        let byte = *self.bytes.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    fn read_slice(&mut self, len: usize, field: &'static str) -> Result<&[u8]> {
        let end = self.pos + len;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(ProtocolError::MetadataTruncated { field })?;
        self.pos = end;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N]> {
        let slice = self.read_slice(N, field)?;
        let mut arr = [0u8; N];
        arr.copy_from_slice(slice);
        Ok(arr)
    }

    fn read_string(&mut self, field: &'static str) -> Result<String> {
        let len = self.read_u8().ok_or(ProtocolError::MetadataTruncated { field })? as usize;
        let slice = self.read_slice(len, field)?;
        String::from_utf8(slice.to_vec()).map_err(|_| ProtocolError::MetadataUtf8 { field })
    }
}

/// Truncate a string to at most `max` bytes without splitting a character.
fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
