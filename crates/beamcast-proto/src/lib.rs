//! Wire format for the beamcast one-way visual transport.
//!
//! Beamcast streams a file across an air gap as a sequence of self-contained
//! packets, each rendered as one visual symbol (a barcode frame). The channel
//! is unidirectional and lossy: packets arrive in any order, duplicated or
//! not at all, and the sender never learns which ones made it.
//!
//! Every packet is a fixed 16-byte big-endian header followed by one coded
//! block of payload. The header carries everything a receiver needs to join a
//! transfer mid-stream: the session id, the intermediate-block count, the
//! symbol id, and the block size. No state is shared between packets.
//!
//! This crate defines the framing only. The codec that fills the payloads
//! (fountain encoding, belief-propagation decoding) lives in `beamcast-core`.

pub mod errors;
pub mod header;
pub mod metadata;
pub mod packet;

pub use errors::{ProtocolError, Result};
pub use header::{ChannelHint, PacketHeader};
pub use metadata::TransferMetadata;
pub use packet::Packet;
