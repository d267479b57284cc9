//! Symbol neighbour derivation.
//!
//! A coded symbol's payload is the XOR of the intermediate blocks at a set
//! of indices, and that set is a pure function of `(sessionId, symbolId,
//! K′)`. Nothing else crosses the channel: the receiver replays the same
//! derivation from the packet header alone, in any order, with any subset
//! of the stream.
//!
//! Ids 1..=K′ form the systematic band (each carries one intermediate block
//! verbatim), so a loss-free session completes in exactly K′ data packets.
//! Higher ids are fountain symbols with a fixed two-point degree
//! distribution: mostly degree 3 for mixing, with a 15 % fraction of
//! degree-1 symbols to keep the peeling process seeded.

use crate::rng::XorShift128;

/// Symbol id reserved for the session metadata packet.
pub const METADATA_SYMBOL_ID: u32 = 0;

/// Fraction of fountain symbols emitted at degree 1.
///
/// Protocol-coupled tuning constant: both ends derive neighbour sets from
/// it, so changing it desynchronises every deployed receiver.
pub const DEGREE_ONE_FRACTION: f64 = 0.15;

/// Degree of the remaining fountain symbols (capped at K′ − 1).
///
/// Protocol-coupled, like [`DEGREE_ONE_FRACTION`].
pub const FOUNTAIN_DEGREE: u32 = 3;

/// Derive the neighbour indices of a data symbol.
///
/// `symbol_id` must not be [`METADATA_SYMBOL_ID`]; metadata packets carry no
/// XOR constraint. The returned indices address the intermediate block set
/// `0..k_prime`.
#[must_use]
pub fn neighbours(session_id: u32, symbol_id: u32, k_prime: u32) -> Vec<u32> {
    debug_assert_ne!(symbol_id, METADATA_SYMBOL_ID);
    debug_assert!(k_prime >= 1);

    // Seeded unconditionally so the systematic and fountain paths stay
    // uniform; the systematic branch simply takes no draw.
    let mut rng = XorShift128::new(session_id ^ symbol_id);

    if symbol_id <= k_prime {
        return vec![(symbol_id - 1) % k_prime];
    }

    let p = f64::from(rng.next_u32()) / 4_294_967_296.0;
    if p < DEGREE_ONE_FRACTION {
        return vec![rng.next_bounded(k_prime)];
    }

    // min(3, K′−1) collapses to zero at K′ = 1; fall back to degree 1.
    let degree = FOUNTAIN_DEGREE.min(k_prime - 1).max(1);
    rng.pick_unique(degree as usize, k_prime)
}
