/// The eight compass and diagonal headings an agent can take.
/// Diagonals are not normalized, so diagonal steps cover more ground.
pub const DIRECTIONS: [[f64; 2]; 8] = [
    [0.0, -1.0],
    [0.0, 1.0],
    [-1.0, 0.0],
    [1.0, 0.0],
    [-1.0, -1.0],
    [1.0, -1.0],
    [-1.0, 1.0],
    [1.0, 1.0],
];

/// Largest mismatch distance in the dwell-time model (distances run 1..=MAX).
pub const MAX_MISMATCH_DISTANCE: u32 = 10;

/// Leading weight of the truncated geometric mismatch law.
pub const MISMATCH_WEIGHT_SCALE: f64 = 0.75;

/// Per-step decay of the mismatch law.
pub const MISMATCH_WEIGHT_RATIO: f64 = 0.25;

/// Amplitude of the exponential dwell-time curve, in seconds.
pub const DWELL_AMPLITUDE: f64 = 0.0026;

/// Exponent rate of the dwell-time curve per unit of mismatch distance.
pub const DWELL_RATE: f64 = 0.9729;

/// Prime multiplier used to derive per-run RNG seeds for sweeps.
pub const RNG_DERIVATION_PRIME: u64 = 7919;
