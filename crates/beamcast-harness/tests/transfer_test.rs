//! End-to-end transfer scenarios.
//!
//! Each test is one concrete story a field deployment has to survive:
//! clean reception, heavy loss with reordering, a sender restarting
//! mid-transfer, a camera stuck on one frame, and a stream with holes that
//! only the parity pre-code can close.

use beamcast_core::{Decoder, Receive, SymbolSchedule};
use beamcast_harness::{ChannelConfig, LossyChannel, drive, pattern_file, stage};

#[test]
fn tiny_file_lossless() {
    let file = pattern_file(450);
    let encoder = stage(&file, "roundtrip.bin", 0xCAFE_0001, 200);

    assert_eq!(encoder.k(), 3);
    assert!(encoder.k_prime() > encoder.k(), "pre-code must add parity blocks");

    // Metadata plus the systematic band, in order: completes in K′ + 1
    // received packets.
    let mut decoder = Decoder::new();
    let mut received = 0;
    for id in 0..=encoder.k_prime() {
        assert_eq!(decoder.receive(&encoder.emit(id).to_vec()), Receive::Accepted);
        received += 1;
        if decoder.is_complete() {
            break;
        }
    }

    assert!(received <= encoder.k_prime() + 1);
    assert!(decoder.is_complete());
    assert!(decoder.verify());
    assert_eq!(decoder.reconstruct().expect("complete"), file.bytes);

    let metadata = decoder.metadata().expect("metadata accepted");
    assert_eq!(metadata.filename, "roundtrip.bin");
    assert_eq!(metadata.mime, "application/octet-stream");
    assert_eq!(metadata.file_size, 450);
}

#[test]
fn tiny_file_twenty_percent_loss_random_order() {
    let file = pattern_file(450);
    let encoder = stage(&file, "roundtrip.bin", 0xCAFE_0002, 200);
    let k_prime = encoder.k_prime();

    // Two full passes over the stream; drop every 5th frame; shuffle.
    let frames: Vec<Vec<u8>> = SymbolSchedule::endless(k_prime)
        .take(2 * k_prime as usize + 4)
        .map(|id| encoder.emit(id).to_vec())
        .collect();
    let surviving: Vec<Vec<u8>> = frames
        .into_iter()
        .enumerate()
        .filter(|(i, _)| (i + 1) % 5 != 0)
        .map(|(_, frame)| frame)
        .collect();

    let mut shuffled = LossyChannel::new(
        ChannelConfig { loss_rate: 0.0, duplicate_rate: 0.0, shuffle: true },
        0xDECAF,
    );
    let delivered = shuffled.transmit(surviving);

    let mut decoder = Decoder::new();
    for frame in &delivered {
        assert_ne!(decoder.receive(frame), Receive::NewSession);
    }

    assert!(decoder.is_complete());
    assert!(decoder.verify());
    assert_eq!(decoder.reconstruct().expect("complete"), file.bytes);
}

#[test]
fn chaotic_channel_with_duplicates_still_converges() {
    let file = pattern_file(5000);
    let encoder = stage(&file, "photo.jpg", 0xCAFE_0003, 200);
    let k_prime = encoder.k_prime();

    let mut decoder = Decoder::new();
    let mut channel = LossyChannel::new(ChannelConfig::chaotic(0.25, 0.10), 42);

    // Keep pumping batches until the decoder converges; four batches of
    // K′ frames is far more redundancy than 25 % loss can eat.
    let mut schedule = SymbolSchedule::endless(k_prime);
    let mut report = None;
    for _ in 0..4 {
        let r = drive(&encoder, &mut decoder, &mut schedule, &mut channel, k_prime as usize + 8);
        report = Some(r);
        if r.complete {
            break;
        }
    }

    let report = report.expect("at least one batch");
    assert!(report.complete, "decoder stalled: {report:?}");
    assert!(report.verified);
}

#[test]
fn sender_restart_triggers_new_session() {
    let file = pattern_file(450);
    let encoder_a = stage(&file, "roundtrip.bin", 0xAAAA_0001, 200);
    let encoder_b = stage(&file, "roundtrip.bin", 0xBBBB_0002, 200);

    let mut decoder = Decoder::new();
    for id in 1..=5 {
        assert_eq!(decoder.receive(&encoder_a.emit(id).to_vec()), Receive::Accepted);
    }
    assert_eq!(decoder.session_id(), Some(0xAAAA_0001));
    assert_eq!(decoder.unique_symbol_count(), 5);

    // The sixth frame comes from a restarted sender.
    let foreign = encoder_b.emit(1).to_vec();
    assert_eq!(decoder.receive(&foreign), Receive::NewSession);

    // Host contract: reset, then re-feed the triggering frame.
    decoder.reset();
    assert_eq!(decoder.receive(&foreign), Receive::Accepted);

    assert_eq!(decoder.session_id(), Some(0xBBBB_0002));
    assert_eq!(decoder.unique_symbol_count(), 1, "no trace of session A may remain");

    // The new session still completes normally.
    for id in 0..=encoder_b.k_prime() {
        decoder.receive(&encoder_b.emit(id).to_vec());
    }
    assert!(decoder.is_complete());
    assert!(decoder.verify());
}

#[test]
fn duplicate_storm_changes_nothing() {
    let file = pattern_file(450);
    let encoder = stage(&file, "roundtrip.bin", 0xCAFE_0005, 200);

    let mut decoder = Decoder::new();
    let frame = encoder.emit(7).to_vec();

    assert_eq!(decoder.receive(&frame), Receive::Accepted);
    for _ in 0..999 {
        assert_eq!(decoder.receive(&frame), Receive::Duplicate);
    }

    assert_eq!(decoder.unique_symbol_count(), 1);
    assert_eq!(decoder.stats().duplicates, 999);
    assert_eq!(decoder.stats().packets, 1000);
}

#[test]
fn parity_band_closes_systematic_holes() {
    // 16 source blocks. Feed the metadata, every parity symbol, and all but
    // two systematic source symbols: belief propagation plus parity
    // recovery must reconstruct the two holes.
    let file = pattern_file(16 * 200);
    let encoder = stage(&file, "grid.bin", 0xCAFE_0006, 200);
    let k = encoder.k();
    let k_prime = encoder.k_prime();
    assert_eq!(k, 16);

    let mut decoder = Decoder::new();
    decoder.receive(&encoder.emit(0).to_vec());
    for id in k + 1..=k_prime {
        decoder.receive(&encoder.emit(id).to_vec());
    }
    for id in 1..=k - 2 {
        decoder.receive(&encoder.emit(id).to_vec());
    }

    assert!(decoder.is_complete());
    assert!(decoder.verify());
    assert_eq!(decoder.reconstruct().expect("complete"), file.bytes);
}
