//! Fountain encoder and sender-side symbol schedule.
//!
//! The encoder stages a file once, then serves `emit` calls forever. Every
//! packet is derived from the symbol id alone, so the host can drive it at
//! whatever frame rate the display sustains, restart anywhere, or interleave
//! ids in any order. Emission cannot fail and never mutates state.

use bytes::Bytes;
use tracing::debug;

use beamcast_proto::{ChannelHint, Packet, PacketHeader, TransferMetadata};

use crate::{
    block,
    error::EncoderError,
    precode,
    symbol::{self, METADATA_SYMBOL_ID},
};

/// Smallest supported payload block size in bytes.
pub const MIN_BLOCK_SIZE: u16 = 16;

/// Largest file length the wire format can describe.
pub const MAX_FILE_SIZE: u64 = u32::MAX as u64;

/// Default interval (in frames) between metadata retransmissions.
pub const DEFAULT_METADATA_INTERVAL: u32 = 10;

/// Staged file transfer, ready to stream.
///
/// # Invariants
///
/// - Output is deterministic: a fixed `(sessionId, file, blockSize)` yields
///   a reproducible packet for every symbol id.
/// - `blocks` holds the full intermediate set, source blocks followed by
///   parity blocks, and is immutable after construction.
#[derive(Debug)]
pub struct Encoder {
    session_id: u32,
    block_size: u16,
    k: u32,
    blocks: Vec<Vec<u8>>,
    metadata_payload: Bytes,
    hint: ChannelHint,
}

impl Encoder {
    /// Stage a file for transmission under a random session id.
    ///
    /// `digest` is the SHA-256 of `file`, computed by the host when the file
    /// is picked (the encoder never hashes; it only forwards the digest in
    /// metadata packets).
    ///
    /// # Errors
    ///
    /// - `EncoderError::InvalidBlockSize` if `block_size` < 16
    /// - `EncoderError::FileTooLarge` if the length does not fit u32
    /// - `EncoderError::MetadataTooLarge` if the encoded metadata does not
    ///   fit one payload block
    pub fn new(
        file: &[u8],
        filename: &str,
        mime: &str,
        digest: [u8; 32],
        block_size: u16,
        hint: ChannelHint,
    ) -> Result<Self, EncoderError> {
        let session_id: u32 = rand::random();
        Self::with_session_id(session_id, file, filename, mime, digest, block_size, hint)
    }

    /// Stage a file under a caller-chosen session id.
    ///
    /// Exists for deterministic tests and for hosts that manage their own
    /// session identifiers; semantics are otherwise identical to
    /// [`Encoder::new`].
    pub fn with_session_id(
        session_id: u32,
        file: &[u8],
        filename: &str,
        mime: &str,
        digest: [u8; 32],
        block_size: u16,
        hint: ChannelHint,
    ) -> Result<Self, EncoderError> {
        if block_size < MIN_BLOCK_SIZE {
            return Err(EncoderError::InvalidBlockSize(block_size));
        }
        if file.len() as u64 > MAX_FILE_SIZE {
            return Err(EncoderError::FileTooLarge { size: file.len() as u64, max: MAX_FILE_SIZE });
        }

        let mut blocks = block::split(file, block_size as usize);
        let k = blocks.len() as u32;

        let map = precode::parity_map(k);
        let parity = precode::derive_parity_blocks(&map, &blocks, block_size as usize);
        blocks.extend(parity);

        let metadata = TransferMetadata {
            filename: filename.to_string(),
            mime: mime.to_string(),
            file_size: file.len() as u32,
            digest,
            source_blocks: k,
            mode: hint,
        };

        let mut payload = metadata.encode();
        if payload.len() > block_size as usize {
            return Err(EncoderError::MetadataTooLarge {
                size: payload.len(),
                capacity: block_size as usize,
            });
        }
        payload.resize(block_size as usize, 0);

        debug!(
            session_id = format_args!("{session_id:#010x}"),
            k,
            k_prime = blocks.len(),
            block_size,
            "staged file for transmission"
        );

        Ok(Self {
            session_id,
            block_size,
            k,
            blocks,
            metadata_payload: Bytes::from(payload),
            hint,
        })
    }

    /// Number of source blocks K.
    #[must_use]
    pub fn k(&self) -> u32 {
        self.k
    }

    /// Intermediate-block count K′ (source + parity).
    #[must_use]
    pub fn k_prime(&self) -> u32 {
        self.blocks.len() as u32
    }

    /// Session identifier stamped on every packet.
    #[must_use]
    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    /// Configured payload block size in bytes.
    #[must_use]
    pub fn block_size(&self) -> u16 {
        self.block_size
    }

    /// Emit the packet for one symbol id.
    ///
    /// Id 0 yields the metadata packet (payload zero-padded to the block
    /// size); any other id yields the XOR of that symbol's neighbour blocks.
    /// Emission is pure: the same id always produces the same packet.
    #[must_use]
    pub fn emit(&self, symbol_id: u32) -> Packet {
        let mut header =
            PacketHeader::new(self.session_id, self.k_prime(), symbol_id, self.block_size);
        header.set_hint(self.hint);

        if symbol_id == METADATA_SYMBOL_ID {
            header.set_metadata(true);
            return Packet::new(header, self.metadata_payload.clone());
        }

        let mut payload = vec![0u8; self.block_size as usize];
        for index in symbol::neighbours(self.session_id, symbol_id, self.k_prime()) {
            block::xor_into(&mut payload, &self.blocks[index as usize]);
        }
        Packet::new(header, payload)
    }
}

/// Sender-side id sequence: which symbol to display on each frame.
///
/// Interleaves the metadata symbol every `metadata_interval` frames so a
/// receiver joining mid-stream is never far from learning the file's
/// identity. The default schedule cycles the data counter back to 1 after
/// passing K′, replaying the systematic band; [`SymbolSchedule::endless`]
/// keeps counting upward into the fountain id range instead, which trades
/// the guaranteed-complete replay for coded symbols that can repair any
/// loss pattern.
#[derive(Debug, Clone)]
pub struct SymbolSchedule {
    k_prime: u32,
    metadata_interval: u32,
    wrap: bool,
    frame: u64,
    next_data: u32,
}

impl SymbolSchedule {
    /// Cycling schedule: metadata every 10 frames, data ids 1..=K′ repeated.
    #[must_use]
    pub fn new(k_prime: u32) -> Self {
        Self {
            k_prime,
            metadata_interval: DEFAULT_METADATA_INTERVAL,
            wrap: true,
            frame: 0,
            next_data: 1,
        }
    }

    /// Non-wrapping schedule: data ids keep counting past K′ into the
    /// fountain range.
    #[must_use]
    pub fn endless(k_prime: u32) -> Self {
        Self { wrap: false, ..Self::new(k_prime) }
    }

    /// Override the metadata retransmission interval. Zero disables
    /// metadata interleaving entirely.
    #[must_use]
    pub fn with_metadata_interval(mut self, interval: u32) -> Self {
        self.metadata_interval = interval;
        self
    }
}

impl Iterator for SymbolSchedule {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let id = if self.metadata_interval > 0
            && self.frame % u64::from(self.metadata_interval) == 0
        {
            METADATA_SYMBOL_ID
        } else {
            let id = self.next_data;
            self.next_data = if self.wrap && id >= self.k_prime {
                1
            } else {
                // Skip 0 on u32 overflow; id 0 is the metadata symbol.
                id.checked_add(1).unwrap_or(1)
            };
            id
        };

        self.frame += 1;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_encoder() -> Encoder {
        let file: Vec<u8> = (0..450u32).map(|i| ((7 * i + 13) % 256) as u8).collect();
        Encoder::with_session_id(
            0x1234_5678,
            &file,
            "roundtrip.bin",
            "application/octet-stream",
            [0xAB; 32],
            200,
            ChannelHint::Mono,
        )
        .expect("valid encoder")
    }

    #[test]
    fn block_accounting_matches_the_file() {
        let encoder = sample_encoder();
        assert_eq!(encoder.k(), 3);
        assert!(encoder.k_prime() > encoder.k());
        assert_eq!(encoder.block_size(), 200);
    }

    #[test]
    fn emission_is_deterministic() {
        let encoder = sample_encoder();
        for id in 0..20 {
            assert_eq!(encoder.emit(id), encoder.emit(id));
        }
    }

    #[test]
    fn systematic_symbols_carry_blocks_verbatim() {
        let file: Vec<u8> = (0..450u32).map(|i| ((7 * i + 13) % 256) as u8).collect();
        let encoder = sample_encoder();

        // Symbol 1 is source block 0: the first 200 file bytes.
        let packet = encoder.emit(1);
        assert_eq!(&packet.payload[..], &file[..200]);
        assert!(!packet.header.is_metadata());
        assert_eq!(packet.header.symbol_id(), 1);
    }

    #[test]
    fn metadata_packet_is_flagged_and_padded() {
        let encoder = sample_encoder();
        let packet = encoder.emit(0);

        assert!(packet.header.is_metadata());
        assert_eq!(packet.payload.len(), 200);

        let metadata =
            beamcast_proto::TransferMetadata::decode(&packet.payload).expect("should parse");
        assert_eq!(metadata.filename, "roundtrip.bin");
        assert_eq!(metadata.file_size, 450);
        assert_eq!(metadata.source_blocks, 3);
    }

    #[test]
    fn reject_undersized_block() {
        let result = Encoder::with_session_id(
            1,
            &[0u8; 64],
            "x",
            "application/octet-stream",
            [0; 32],
            8,
            ChannelHint::Mono,
        );
        assert_eq!(result.unwrap_err(), EncoderError::InvalidBlockSize(8));
    }

    #[test]
    fn reject_metadata_overflow() {
        // 255-byte filename cannot fit a 64-byte block with the fixed fields.
        let result = Encoder::with_session_id(
            1,
            &[0u8; 64],
            &"n".repeat(255),
            "application/octet-stream",
            [0; 32],
            64,
            ChannelHint::Mono,
        );
        assert!(matches!(result.unwrap_err(), EncoderError::MetadataTooLarge { .. }));
    }

    #[test]
    fn cycling_schedule_interleaves_metadata_and_wraps() {
        let schedule = SymbolSchedule::new(5);
        let ids: Vec<u32> = schedule.take(22).collect();

        assert_eq!(ids[0], 0);
        assert_eq!(&ids[1..10], &[1, 2, 3, 4, 5, 1, 2, 3, 4]);
        assert_eq!(ids[10], 0);
        assert_eq!(&ids[11..20], &[5, 1, 2, 3, 4, 5, 1, 2, 3]);
        assert_eq!(ids[20], 0);
    }

    #[test]
    fn endless_schedule_reaches_the_fountain_range() {
        let schedule = SymbolSchedule::endless(5).with_metadata_interval(0);
        let ids: Vec<u32> = schedule.take(12).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }
}
