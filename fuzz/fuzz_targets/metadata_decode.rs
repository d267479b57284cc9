//! Fuzz target for TransferMetadata::decode
//!
//! The metadata payload is length-prefixed binary with variable-length
//! string fields, which is exactly the shape of parser that suffers from
//! off-by-one and overrun bugs. Arbitrary inputs must either parse or fail
//! cleanly; a round-trip of anything that parses must be stable.

#![no_main]

use beamcast_proto::TransferMetadata;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(metadata) = TransferMetadata::decode(data) else {
        return;
    };

    // Whatever parsed must survive a re-encode/re-decode unchanged.
    let reencoded = metadata.encode();
    let reparsed = TransferMetadata::decode(&reencoded).expect("re-encoded metadata must parse");
    assert_eq!(metadata, reparsed);
});
