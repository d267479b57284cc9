//! Packet header implementation with zero-copy parsing.
//!
//! The `PacketHeader` is a fixed 16-byte structure serialized as raw binary
//! (Big Endian). Every packet is self-describing: a receiver that tunes in
//! mid-stream can bind the session from any single header without negotiating
//! anything with the sender.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{ProtocolError, Result};

/// Channel-mode hint carried in the header flags (bits 1-2).
///
/// The visual layer uses this to pick its demultiplexing strategy (how many
/// colour planes a captured frame carries). The codec core stores and
/// forwards the hint but never dispatches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelHint {
    /// Single-plane monochrome symbols
    #[default]
    Mono,
    /// Three parallel colour planes per frame
    Rgb,
    /// High-density colour encoding
    Dense,
    /// Reserved for future channel modes
    Reserved,
}

impl ChannelHint {
    /// Decode a hint from its two-bit representation. Values above 3 are
    /// masked down, so any byte decodes.
    #[must_use]
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::Mono,
            1 => Self::Rgb,
            2 => Self::Dense,
            _ => Self::Reserved,
        }
    }

    /// Two-bit wire representation of this hint.
    #[must_use]
    pub fn to_bits(self) -> u8 {
        match self {
            Self::Mono => 0,
            Self::Rgb => 1,
            Self::Dense => 2,
            Self::Reserved => 3,
        }
    }
}

/// Fixed 16-byte packet header (Big Endian network byte order).
///
/// All multi-byte integers are stored in Big Endian format. Fields are stored
/// as raw byte arrays to avoid alignment issues with the packed layout.
///
/// # Invariants
///
/// - The `k` field always advertises the *intermediate* block count
///   (source plus parity), never the bare source count. Encoder and decoder
///   must agree on this or neighbour reconstruction desynchronises.
/// - `block_size` is the exact payload length that follows the header for
///   data packets. Metadata payloads are zero-padded to the same length on
///   the wire.
///
/// The `#[repr(C, packed)]` layout with zerocopy traits ensures this struct
/// can be safely cast from untrusted bytes: every 16-byte pattern is a valid
/// bit pattern, so parsing cannot hit undefined behavior. Semantic checks
/// (version) happen after the cast.
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct PacketHeader {
    version: u8,           // 0x01
    session_id: [u8; 4],   // u32 random session identifier
    k: [u8; 4],            // u32 intermediate-block count K'
    symbol_id: [u8; 4],    // u32 coded-symbol id
    block_size: [u8; 2],   // u16 payload length in bytes
    flags: u8,             // bit0 metadata, bits 1-2 channel hint
}

impl PacketHeader {
    /// Size of the serialized header (16 bytes).
    pub const SIZE: usize = 16;

    /// Current protocol version.
    pub const VERSION: u8 = 0x01;

    /// Flag bit marking a metadata packet.
    const FLAG_METADATA: u8 = 0b0000_0001;

    /// Bit positions of the channel-mode hint.
    const HINT_SHIFT: u8 = 1;
    const HINT_MASK: u8 = 0b0000_0110;

    /// Create a header for a data symbol of the given session.
    #[must_use]
    pub fn new(session_id: u32, k_prime: u32, symbol_id: u32, block_size: u16) -> Self {
        Self {
            version: Self::VERSION,
            session_id: session_id.to_be_bytes(),
            k: k_prime.to_be_bytes(),
            symbol_id: symbol_id.to_be_bytes(),
            block_size: block_size.to_be_bytes(),
            flags: 0,
        }
    }

    /// Parse a header from wire bytes (zero-copy, safe).
    ///
    /// Casts the buffer prefix directly to a `PacketHeader` reference using
    /// zerocopy's compile-time layout verification. No data is copied.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Truncated` if the buffer holds fewer than 16 bytes
    /// - `ProtocolError::InvalidProtocol` on a version mismatch
    ///
    /// Any other byte pattern parses. A camera pipeline produces garbage
    /// frames routinely, so validation stops at the cheapest checks that
    /// guarantee the remaining fields are safe to interpret.
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        let header = Self::ref_from_prefix(bytes)
            .map_err(|_| ProtocolError::Truncated { expected: Self::SIZE, actual: bytes.len() })?
            .0;

        if header.version != Self::VERSION {
            return Err(ProtocolError::InvalidProtocol(header.version));
        }

        Ok(header)
    }

    /// Serialize the header to its 16 wire bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let bytes = IntoBytes::as_bytes(self);
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(bytes);
        arr
    }

    /// Protocol version byte (currently 0x01).
    #[must_use]
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Random u32 identifying the transfer session.
    #[must_use]
    pub fn session_id(&self) -> u32 {
        u32::from_be_bytes(self.session_id)
    }

    /// Intermediate-block count (source + parity) advertised by the encoder.
    #[must_use]
    pub fn k_prime(&self) -> u32 {
        u32::from_be_bytes(self.k)
    }

    /// Coded-symbol id. Id 0 is reserved for metadata packets.
    #[must_use]
    pub fn symbol_id(&self) -> u32 {
        u32::from_be_bytes(self.symbol_id)
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn block_size(&self) -> u16 {
        u16::from_be_bytes(self.block_size)
    }

    /// Whether this packet carries the session metadata payload.
    #[must_use]
    pub fn is_metadata(&self) -> bool {
        self.flags & Self::FLAG_METADATA != 0
    }

    /// Channel-mode hint for the visual layer.
    #[must_use]
    pub fn hint(&self) -> ChannelHint {
        ChannelHint::from_bits((self.flags & Self::HINT_MASK) >> Self::HINT_SHIFT)
    }

    /// Raw flags byte, including reserved bits.
    #[must_use]
    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// Mark or unmark this packet as a metadata packet.
    pub fn set_metadata(&mut self, metadata: bool) {
        if metadata {
            self.flags |= Self::FLAG_METADATA;
        } else {
            self.flags &= !Self::FLAG_METADATA;
        }
    }

    /// Set the channel-mode hint bits.
    pub fn set_hint(&mut self, hint: ChannelHint) {
        self.flags = (self.flags & !Self::HINT_MASK) | (hint.to_bits() << Self::HINT_SHIFT);
    }

    /// Update the symbol id.
    pub fn set_symbol_id(&mut self, symbol_id: u32) {
        self.symbol_id = symbol_id.to_be_bytes();
    }
}

// Manual Debug implementation (can't derive due to packed repr)
impl std::fmt::Debug for PacketHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketHeader")
            .field("version", &self.version())
            .field("session_id", &format!("{:#010x}", self.session_id()))
            .field("k_prime", &self.k_prime())
            .field("symbol_id", &self.symbol_id())
            .field("block_size", &self.block_size())
            .field("is_metadata", &self.is_metadata())
            .field("hint", &self.hint())
            .finish()
    }
}

// Manual PartialEq implementation (can't derive due to packed repr)
impl PartialEq for PacketHeader {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PacketHeader {}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    impl Arbitrary for PacketHeader {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with((): Self::Parameters) -> Self::Strategy {
            (any::<u32>(), any::<u32>(), any::<u32>(), any::<u16>(), any::<bool>(), 0u8..4)
                .prop_map(|(session_id, k_prime, symbol_id, block_size, metadata, hint)| {
                    let mut header = Self::new(session_id, k_prime, symbol_id, block_size);
                    header.set_metadata(metadata);
                    header.set_hint(ChannelHint::from_bits(hint));
                    header
                })
                .boxed()
        }
    }

    #[test]
    fn header_size() {
        assert_eq!(std::mem::size_of::<PacketHeader>(), PacketHeader::SIZE);
        assert_eq!(PacketHeader::SIZE, 16);
    }

    #[test]
    fn field_offsets_match_wire_layout() {
        let mut header = PacketHeader::new(0xAABB_CCDD, 0x0102_0304, 0x1122_3344, 0x5566);
        header.set_metadata(true);
        header.set_hint(ChannelHint::Rgb);

        let bytes = header.to_bytes();
        assert_eq!(bytes[0], 0x01);
        assert_eq!(&bytes[1..5], &[0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(&bytes[5..9], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&bytes[9..13], &[0x11, 0x22, 0x33, 0x44]);
        assert_eq!(&bytes[13..15], &[0x55, 0x66]);
        assert_eq!(bytes[15], 0b0000_0011);
    }

    proptest! {
        #[test]
        fn header_round_trip(header in any::<PacketHeader>()) {
            let bytes = header.to_bytes();
            let parsed = PacketHeader::from_bytes(&bytes).expect("should parse");
            prop_assert_eq!(&header, parsed);
        }

        #[test]
        fn hint_survives_flag_updates(header in any::<PacketHeader>(), hint in 0u8..4) {
            let hint = ChannelHint::from_bits(hint);
            let mut updated = header;
            updated.set_hint(hint);
            updated.set_metadata(true);
            prop_assert_eq!(updated.hint(), hint);
            prop_assert!(updated.is_metadata());
        }
    }

    #[test]
    fn reject_short_buffer() {
        let short_buf = [0u8; 10];
        let result = PacketHeader::from_bytes(&short_buf);
        assert_eq!(result, Err(ProtocolError::Truncated { expected: 16, actual: 10 }));
    }

    #[test]
    fn reject_invalid_version() {
        let mut buf = [0u8; 16];
        buf[0] = 0x7F;

        let result = PacketHeader::from_bytes(&buf);
        assert_eq!(result, Err(ProtocolError::InvalidProtocol(0x7F)));
    }
}
