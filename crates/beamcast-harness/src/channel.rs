//! Seeded lossy-channel simulation.
//!
//! Wraps a batch of encoded frames in the failure modes of a real
//! screen-to-camera link: dropped frames, duplicated frames (a camera often
//! captures the same displayed symbol twice), and arbitrary reordering.
//! All randomness comes from a `ChaCha8Rng` seeded by the test, so runs are
//! reproducible.

use rand::{Rng, SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha8Rng;

/// Failure profile for a simulated channel.
#[derive(Debug, Clone, Copy)]
pub struct ChannelConfig {
    /// Probability that a frame is lost (0.0 = lossless, 1.0 = black hole)
    pub loss_rate: f64,
    /// Probability that a delivered frame is delivered twice
    pub duplicate_rate: f64,
    /// Whether delivered frames are shuffled before arrival
    pub shuffle: bool,
}

impl ChannelConfig {
    /// A channel that delivers every frame, once, in order.
    #[must_use]
    pub fn lossless() -> Self {
        Self { loss_rate: 0.0, duplicate_rate: 0.0, shuffle: false }
    }

    /// A channel with the given loss rate, duplication, and reordering.
    #[must_use]
    pub fn chaotic(loss_rate: f64, duplicate_rate: f64) -> Self {
        Self { loss_rate, duplicate_rate, shuffle: true }
    }
}

/// Deterministic packet-level channel simulator.
pub struct LossyChannel {
    config: ChannelConfig,
    rng: ChaCha8Rng,
}

impl LossyChannel {
    /// Create a channel with the given failure profile and seed.
    ///
    /// # Panics
    ///
    /// Panics if a rate is outside `[0.0, 1.0]`.
    #[must_use]
    pub fn new(config: ChannelConfig, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&config.loss_rate),
            "loss_rate must be within [0.0, 1.0], got {}",
            config.loss_rate
        );
        assert!(
            (0.0..=1.0).contains(&config.duplicate_rate),
            "duplicate_rate must be within [0.0, 1.0], got {}",
            config.duplicate_rate
        );

        Self { config, rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    /// Pass a batch of frames through the channel.
    ///
    /// Returns the frames that survive, duplicated and reordered according
    /// to the configured profile.
    pub fn transmit(&mut self, frames: impl IntoIterator<Item = Vec<u8>>) -> Vec<Vec<u8>> {
        let mut delivered = Vec::new();

        for frame in frames {
            if self.rng.gen_bool(self.config.loss_rate) {
                continue;
            }
            if self.rng.gen_bool(self.config.duplicate_rate) {
                delivered.push(frame.clone());
            }
            delivered.push(frame);
        }

        if self.config.shuffle {
            delivered.shuffle(&mut self.rng);
        }

        delivered
    }
}
