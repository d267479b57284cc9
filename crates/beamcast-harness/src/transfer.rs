//! End-to-end transfer drive loop.
//!
//! Mirrors how a real host wires the codec to a channel: pump the sender's
//! symbol schedule for a batch of frames, let the channel mangle the batch,
//! then feed whatever survives to the decoder one frame at a time. The
//! `NewSession` outcome is handled the way every host must: reset, then
//! re-feed the triggering frame.

use beamcast_core::{Decoder, Encoder, Receive};
use beamcast_proto::ChannelHint;
use sha2::{Digest, Sha256};

use crate::channel::LossyChannel;

/// A test file with its precomputed digest.
#[derive(Debug, Clone)]
pub struct StagedFile {
    /// Original file bytes
    pub bytes: Vec<u8>,
    /// SHA-256 of `bytes`
    pub digest: [u8; 32],
}

/// The deterministic byte pattern used across the end-to-end scenarios.
#[must_use]
pub fn pattern_file(len: u32) -> StagedFile {
    let bytes: Vec<u8> = (0..len).map(|i| ((7 * i + 13) % 256) as u8).collect();
    let digest: [u8; 32] = Sha256::digest(&bytes).into();
    StagedFile { bytes, digest }
}

/// Stage a file under a fixed session id and block size.
#[must_use]
#[allow(clippy::panic, reason = "staging failures are errors in the test setup itself")]
pub fn stage(file: &StagedFile, filename: &str, session_id: u32, block_size: u16) -> Encoder {
    Encoder::with_session_id(
        session_id,
        &file.bytes,
        filename,
        "application/octet-stream",
        file.digest,
        block_size,
        ChannelHint::Mono,
    )
    .unwrap_or_else(|err| panic!("staging {filename} failed: {err}"))
}

/// Outcome of one [`drive`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReport {
    /// Frames the sender emitted
    pub frames_sent: usize,
    /// Frames that survived the channel (including duplicates)
    pub frames_delivered: usize,
    /// Whether every source block was decoded
    pub complete: bool,
    /// Whether the reconstruction matched the sender's digest
    pub verified: bool,
}

/// Pump `frames` scheduled symbols through a channel into a decoder.
pub fn drive(
    encoder: &Encoder,
    decoder: &mut Decoder,
    schedule: impl Iterator<Item = u32>,
    channel: &mut LossyChannel,
    frames: usize,
) -> TransferReport {
    let batch: Vec<Vec<u8>> =
        schedule.take(frames).map(|id| encoder.emit(id).to_vec()).collect();
    let frames_sent = batch.len();

    let delivered = channel.transmit(batch);
    let frames_delivered = delivered.len();

    for frame in &delivered {
        if decoder.receive(frame) == Receive::NewSession {
            decoder.reset();
            decoder.receive(frame);
        }
    }

    TransferReport {
        frames_sent,
        frames_delivered,
        complete: decoder.is_complete(),
        verified: decoder.verify(),
    }
}

#[cfg(test)]
mod tests {
    use beamcast_core::SymbolSchedule;

    use super::*;
    use crate::channel::{ChannelConfig, LossyChannel};

    #[test]
    fn lossless_drive_completes_one_cycle() {
        let file = pattern_file(450);
        let encoder = stage(&file, "roundtrip.bin", 0x1111_2222, 200);
        let mut decoder = Decoder::new();
        let mut channel = LossyChannel::new(ChannelConfig::lossless(), 0);

        let schedule = SymbolSchedule::new(encoder.k_prime());
        let frames = encoder.k_prime() as usize + 2;
        let report = drive(&encoder, &mut decoder, schedule, &mut channel, frames);

        assert!(report.complete);
        assert!(report.verified);
        assert_eq!(report.frames_sent, report.frames_delivered);
    }
}
