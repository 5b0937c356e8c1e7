//! Dwell-time model.
//!
//! Both DNA species draw a mismatch distance from the same truncated geometric
//! law, but map it to a binding duration differently: junk dwell grows with the
//! distance, virus dwell grows with `11 - distance` and is rescaled.

use crate::constants::{
    DWELL_AMPLITUDE, DWELL_RATE, MAX_MISMATCH_DISTANCE, MISMATCH_WEIGHT_RATIO,
    MISMATCH_WEIGHT_SCALE,
};
use rand::Rng;

const N_DISTANCES: usize = MAX_MISMATCH_DISTANCE as usize;

/// Normalized probability of each mismatch distance `1..=10`.
pub fn mismatch_probabilities() -> [f64; N_DISTANCES] {
    let mut probs = [0.0; N_DISTANCES];
    for (i, p) in probs.iter_mut().enumerate() {
        *p = MISMATCH_WEIGHT_SCALE * MISMATCH_WEIGHT_RATIO.powi(i as i32);
    }
    let total: f64 = probs.iter().sum();
    for p in &mut probs {
        *p /= total;
    }
    probs
}

/// Draw a mismatch distance in `1..=10`.
pub fn sample_mismatch_distance<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    let probs = mismatch_probabilities();
    let u: f64 = rng.random();
    let mut cumulative = 0.0;
    for (i, p) in probs.iter().enumerate() {
        cumulative += p;
        if u < cumulative {
            return i as u32 + 1;
        }
    }
    // Rounding can leave the cumulative sum a hair below 1.0.
    MAX_MISMATCH_DISTANCE
}

/// Junk dwell time for a given mismatch distance.
pub fn junk_dwell_time(distance: u32) -> f64 {
    DWELL_AMPLITUDE * (DWELL_RATE * distance as f64).exp()
}

/// Virus dwell time for a given mismatch distance, before any scaling.
pub fn virus_dwell_time(distance: u32) -> f64 {
    let inverted = MAX_MISMATCH_DISTANCE + 1 - distance;
    DWELL_AMPLITUDE * (DWELL_RATE * inverted as f64).exp()
}

/// Sample the dwell time for one junk target.
pub fn sample_junk_bind_time<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    junk_dwell_time(sample_mismatch_distance(rng))
}

/// Sample independent dwell times for a whole virus population, each scaled by
/// `virus_time_scale`.
pub fn generate_virus_dwell_times<R: Rng + ?Sized>(
    count: usize,
    virus_time_scale: f64,
    rng: &mut R,
) -> Vec<f64> {
    (0..count)
        .map(|_| virus_dwell_time(sample_mismatch_distance(rng)) * virus_time_scale)
        .collect()
}
