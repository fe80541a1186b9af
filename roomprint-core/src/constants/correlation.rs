//! Correlation and Profile Constants
//!
//! Maturity thresholds, eviction caps and learning noise for the per-area and
//! per-room fingerprint profiles.

// ===== DUAL POOL =====

/// Weight of one user-confirmed (button) sample relative to one automatic sample.
///
/// Source: Product decision - explicit confirmation counts double
pub const BUTTON_WEIGHT_MULTIPLIER: u64 = 2;

/// Process noise for profile learning (dB² per sample).
///
/// Profiles are fed without timestamps, so this is applied once per sample.
/// Large enough that the auto pool keeps following slow environmental drift
/// (furniture moved, new appliances) after thousands of samples.
///
/// Source: Engineering judgment
pub const PROFILE_PROCESS_NOISE: f64 = 0.05;

/// Measurement noise for profile learning (dB²).
///
/// Source: Same spread as raw RSSI (σ ≈ 4 dB)
pub const PROFILE_MEASUREMENT_NOISE: f64 = 16.0;

// ===== MATURITY =====

/// Weighted samples before a scanner-pair delta inside an area profile is trusted.
///
/// Source: Engineering judgment
pub const PAIR_MATURITY_SAMPLES: u64 = 30;

/// Weighted samples before an absolute RSSI profile is trusted.
///
/// Absolute readings are a fallback signal and noisier by nature, so a lower
/// bar makes them useful sooner.
///
/// Source: Engineering judgment
pub const ABSOLUTE_MATURITY_SAMPLES: u64 = 20;

/// Weighted samples before a room-level pair delta is trusted.
///
/// Source: Engineering judgment
pub const ROOM_PAIR_MATURITY_SAMPLES: u64 = 20;

// ===== EVICTION =====

/// Maximum scanner correlations (and absolute profiles) kept per area profile.
///
/// Source: Memory bound for many devices × many areas
pub const MAX_AREA_CORRELATIONS: usize = 15;

/// Maximum scanner pairs kept per room profile.
///
/// Source: Memory bound, pairs grow quadratically with scanners
pub const MAX_ROOM_PAIRS: usize = 20;

// ===== SCORING =====

/// Score returned when no mature data overlaps the query.
///
/// Neither a penalty nor a bonus.
pub const NEUTRAL_MATCH_SCORE: f64 = 0.5;

/// z-score mapped to a confidence of 0.5 by `1 / (1 + (z / scale)²)`.
pub const Z_CONFIDENCE_SCALE: f64 = 2.0;
