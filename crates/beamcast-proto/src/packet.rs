//! Packet type combining header and payload.
//!
//! A `Packet` is the transport unit handed to the visual channel: a 16-byte
//! raw binary header followed by exactly one block of payload. The carrier
//! treats it as an opaque byte string.
//!
//! This is a pure data holder. The coded payload content is produced and
//! consumed by the codec in `beamcast-core`.

use bytes::{BufMut, Bytes};

use crate::{
    errors::{ProtocolError, Result},
    header::PacketHeader,
};

/// Complete wire packet (header + one payload block).
///
/// Layout on the wire: `[PacketHeader: 16 bytes] + [payload: block_size bytes]`.
///
/// # Invariants
///
/// - Data packets carry exactly `header.block_size()` payload bytes. This is
///   enforced by [`Packet::decode`]; [`Packet::new`] asserts it in debug
///   builds because the encoder is the only producer.
/// - Metadata packets are padded to `block_size` on the wire, but a shorter
///   payload still decodes. The metadata parser ignores trailing padding, so
///   a carrier that strips it loses nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Packet header (16 bytes)
    pub header: PacketHeader,

    /// Raw payload bytes (one coded block, or the padded metadata string)
    pub payload: Bytes,
}

impl Packet {
    /// Create a new packet from a header and payload.
    #[must_use]
    pub fn new(header: PacketHeader, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();

        debug_assert!(
            payload.len() == header.block_size() as usize,
            "payload length {} must match advertised block size {}",
            payload.len(),
            header.block_size()
        );

        Self { header, payload }
    }

    /// Total wire size of this packet in bytes.
    #[must_use]
    pub fn wire_size(&self) -> usize {
        PacketHeader::SIZE + self.payload.len()
    }

    /// Encode the packet into a buffer.
    ///
    /// Writes `[header (16 bytes)] + [payload]`. Nothing can fail: the
    /// header is fixed-size and the payload is copied verbatim.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_slice(&self.header.to_bytes());
        dst.put_slice(&self.payload);
    }

    /// Encode the packet into a fresh byte vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        let mut wire = Vec::with_capacity(self.wire_size());
        self.encode(&mut wire);
        wire
    }

    /// Decode a packet from wire format.
    ///
    /// Reads the header, then exactly `block_size` payload bytes. Trailing
    /// data beyond the payload is ignored (a carrier may pad frames to its
    /// own symbol capacity).
    ///
    /// # Errors
    ///
    /// - `ProtocolError` if header parsing fails (short buffer or version
    ///   mismatch)
    /// - `ProtocolError::Truncated` if a data payload is shorter than the
    ///   advertised block size
    ///
    /// A metadata packet with a short payload is accepted: its parser skips
    /// trailing zero padding anyway, so requiring the padding on the wire
    /// would reject nothing but valid frames.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = PacketHeader::from_bytes(bytes)?;

        let block_size = header.block_size() as usize;
        let available = bytes.len() - PacketHeader::SIZE;

        let take = if header.is_metadata() {
            available.min(block_size)
        } else if available < block_size {
            return Err(ProtocolError::Truncated {
                expected: PacketHeader::SIZE + block_size,
                actual: bytes.len(),
            });
        } else {
            block_size
        };

        let payload = Bytes::copy_from_slice(&bytes[PacketHeader::SIZE..PacketHeader::SIZE + take]);

        Ok(Self { header: *header, payload })
    }
}
