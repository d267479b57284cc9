//! Fuzz target for Packet::decode
//!
//! This fuzzer tests packet decoding with arbitrary byte sequences to find:
//! - Parser crashes or panics
//! - Integer overflows in size calculations
//! - Buffer over-reads
//! - Malformed headers that bypass validation
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use beamcast_proto::Packet;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Attempt to decode arbitrary bytes as a packet
    // This should never panic, only return Err for invalid data
    let _ = Packet::decode(data);
});
