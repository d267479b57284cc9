//! Error types for the beamcast wire format.
//!
//! Framing errors are deliberately coarse: a receiver on a lossy visual
//! channel cannot ask for a retransmit, so every parse failure has the same
//! disposition (drop the packet, count it, wait for the stream to come
//! around again). The variants exist so hosts can report *why* frames are
//! being dropped, not to drive recovery logic.

use thiserror::Error;

/// Errors that can occur while parsing packets or metadata payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer is shorter than the structure it claims to contain
    #[error("truncated packet: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes required to parse
        expected: usize,
        /// Bytes actually available
        actual: usize,
    },

    /// Unsupported protocol version byte
    #[error("invalid protocol version: {0:#04x}")]
    InvalidProtocol(u8),

    /// A declared metadata field length overruns the payload
    #[error("metadata field `{field}` overruns the payload")]
    MetadataTruncated {
        /// Field whose declared length did not fit
        field: &'static str,
    },

    /// A metadata string field is not valid UTF-8
    #[error("metadata field `{field}` is not valid UTF-8")]
    MetadataUtf8 {
        /// Field that failed UTF-8 validation
        field: &'static str,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ProtocolError>;
