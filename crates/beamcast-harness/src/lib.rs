//! Deterministic simulation harness for beamcast transfers.
//!
//! Reproduces the conditions of the real visual channel (frame loss,
//! duplication, reordering) from a fixed seed, so every test failure can be
//! replayed exactly. The channel works at the packet level: the transport
//! contract promises nothing beyond "some subset of your frames arrives,
//! in some order", and that is precisely what [`LossyChannel`] delivers.

pub mod channel;
pub mod transfer;

pub use channel::{ChannelConfig, LossyChannel};
pub use transfer::{StagedFile, TransferReport, drive, pattern_file, stage};
