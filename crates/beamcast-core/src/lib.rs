//! Rateless fountain codec core for the beamcast visual transport.
//!
//! A sender displays an endless stream of coded packets; a receiver watches
//! for as long as it takes and reconstructs the file from whatever subset it
//! managed to capture. There is no back-channel, so the codec is built
//! entirely around redundancy:
//!
//! - The file is sliced into K source blocks, and a deterministic pre-code
//!   derives M parity blocks from overlapping groups of them ([`precode`]).
//! - Each coded symbol XORs a small set of these K′ = K + M intermediate
//!   blocks. The set is derived from the symbol id alone ([`symbol`]), so
//!   any captured packet is self-describing.
//! - The decoder peels degree-1 constraints and cascades (belief
//!   propagation), falling back on the parity equations to fill holes the
//!   peeling process cannot reach ([`decoder`]).
//!
//! The core is sans-IO and single-threaded: the host calls
//! [`Encoder::emit`] once per display tick and [`Decoder::receive`] once per
//! captured frame. Scheduling, capture, and rendering are host concerns.

pub mod block;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod precode;
pub mod rng;
pub mod symbol;

pub use decoder::{Decoder, DecoderStats, Receive};
pub use encoder::{Encoder, SymbolSchedule};
pub use error::{DecoderError, EncoderError};
