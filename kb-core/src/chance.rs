//! Seeded chance stream for die rolls.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;

/// Per-episode chance context backed by a small seeded PRNG.
///
/// One context drives both the executed game's rolls and the synchronous
/// chance sampling inside search simulations.
pub struct TurnContext {
    rng: ChaCha8Rng,
}

impl TurnContext {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Sample one die outcome, 1..=6.
    pub fn roll_die(&mut self) -> u8 {
        self.rng.gen_range(1..=6)
    }
}
