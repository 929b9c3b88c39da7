//! Deterministic PRNG for bonus-topic draws.
//!
//! Uses the SplitMix64 algorithm: fast, 8 bytes of state, and trivially
//! serializable, so a campaign can persist it next to its research state.

use serde::{Deserialize, Serialize};

/// SplitMix64 pseudo-random number generator owned by one campaign.
///
/// Identical seeds and identical call sequences yield identical draws on
/// every platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRng {
    state: u64,
}

impl DrawRng {
    /// Create a new RNG with the given seed.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Returns a uniformly distributed index in `0..bound`.
    ///
    /// Uses multiply-shift with rejection so small bounds carry no modulo
    /// bias. A `bound` of zero yields zero.
    pub fn next_below(&mut self, bound: usize) -> usize {
        if bound <= 1 {
            return 0;
        }
        let range = bound as u64;
        let threshold = range.wrapping_neg() % range;
        loop {
            let wide = u128::from(self.next_u64()) * u128::from(range);
            if (wide as u64) >= threshold {
                return (wide >> 64) as usize;
            }
        }
    }

    /// Get the internal state (for hashing/serialization).
    pub fn state(&self) -> u64 {
        self.state
    }
}
