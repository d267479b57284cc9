//! Fuzz target for the decoder receive pipeline
//!
//! Feeds arbitrary frame sequences through Decoder::receive, mixing raw
//! garbage with structurally valid packets built from arbitrary field
//! values.
//!
//! # Invariants
//!
//! - receive never panics, whatever the input
//! - decoded block slots are write-once (checked inside the decoder)
//! - unique_symbol_count never exceeds the number of accepted frames
//! - progress stays within [0.0, 1.0]
//! - a NewSession outcome leaves the decoder usable after reset

#![no_main]

use arbitrary::Arbitrary;
use beamcast_core::{Decoder, Receive};
use beamcast_proto::{Packet, PacketHeader};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum FrameInput {
    /// Raw bytes straight into the parser
    Raw(Vec<u8>),
    /// A structurally valid packet with arbitrary field values
    Built {
        session_id: u32,
        k_prime: u32,
        symbol_id: u32,
        metadata: bool,
        payload: Vec<u8>,
    },
}

fuzz_target!(|frames: Vec<FrameInput>| {
    let mut decoder = Decoder::new();
    let mut accepted = 0usize;

    for frame in frames {
        let wire = match frame {
            FrameInput::Raw(bytes) => bytes,
            FrameInput::Built { session_id, k_prime, symbol_id, metadata, payload } => {
                // Bound the payload so the advertised block size matches it.
                let payload = &payload[..payload.len().min(u16::MAX as usize)];
                let mut header =
                    PacketHeader::new(session_id, k_prime, symbol_id, payload.len() as u16);
                header.set_metadata(metadata);
                Packet::new(header, payload.to_vec()).to_vec()
            },
        };

        match decoder.receive(&wire) {
            Receive::Accepted => accepted += 1,
            Receive::NewSession => {
                decoder.reset();
                decoder.receive(&wire);
            },
            Receive::Duplicate | Receive::Rejected => {},
        }

        let progress = decoder.progress();
        assert!((0.0..=1.0).contains(&progress), "progress {progress} out of range");
    }

    assert!(decoder.unique_symbol_count() <= accepted + 1);
});
