use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;

use rand::RngCore;

use crate::constants::sampler::BATCH_SEED_OFFSET;
use crate::rng::DeterministicRng;

/// Hash built with std's `DefaultHasher`.
///
/// Values are stable within one build but may change between Rust releases,
/// so they must not feed anything that is persisted or seeds output.
pub fn stable_hash_with(f: impl FnOnce(&mut DefaultHasher)) -> u64 {
    let mut hasher = DefaultHasher::new();
    f(&mut hasher);
    hasher.finish()
}

/// Seed for the RNG of batch `batch_index`, derived only from the base seed and index.
///
/// Two SplitMix64 steps: one over the offset base seed, one over that output
/// mixed with the index. The result is fixed across platforms and toolchains.
pub fn derive_batch_seed(seed: u64, batch_index: usize) -> u64 {
    let base = DeterministicRng::new(seed ^ BATCH_SEED_OFFSET).next_u64();
    DeterministicRng::new(base ^ batch_index as u64).next_u64()
}
