use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;

/// Create a deterministic RNG from a seed.
pub fn create_rng(seed: u64) -> ChaCha12Rng {
    ChaCha12Rng::seed_from_u64(seed)
}

/// Derive the seed for one run of a sweep, so each run draws from its own stream
/// independently of the order runs are scheduled in.
pub fn derive_run_seed(base_seed: u64, run_index: usize) -> u64 {
    base_seed.wrapping_add((run_index as u64).wrapping_mul(crate::constants::RNG_DERIVATION_PRIME))
}
