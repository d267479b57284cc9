//! Error types for the codec core.
//!
//! The decoder absorbs almost everything: parse failures, duplicates, and
//! malformed metadata are counted and swallowed inside `receive`, because a
//! one-way channel offers no way to act on them. What remains surfaced here
//! is the small set of conditions a host must handle: rejecting a file
//! before streaming starts, and asking for a reconstruction that does not
//! exist yet.

use thiserror::Error;

/// Errors raised when staging a file for transmission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncoderError {
    /// File length does not fit the wire format's u32 size field
    #[error("file too large: {size} bytes exceeds the {max}-byte limit")]
    FileTooLarge {
        /// Actual file length in bytes
        size: u64,
        /// Maximum representable length
        max: u64,
    },

    /// Block size outside the supported 16..=65535 range
    #[error("block size {0} is outside the supported range (16..=65535)")]
    InvalidBlockSize(u16),

    /// Encoded metadata does not fit in a single payload block
    #[error("metadata payload ({size} bytes) does not fit one {capacity}-byte block")]
    MetadataTooLarge {
        /// Encoded metadata length
        size: usize,
        /// Payload capacity (the configured block size)
        capacity: usize,
    },
}

/// Errors raised when reading results out of the decoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecoderError {
    /// Reconstruction requested before all source blocks were decoded
    #[error("transfer incomplete: {solved} of {total} source blocks decoded")]
    Incomplete {
        /// Source blocks decoded so far
        solved: u32,
        /// Source blocks required
        total: u32,
    },

    /// No metadata packet has been accepted yet
    #[error("no metadata received for this session")]
    MetadataMissing,
}
