//! Scalar Filter Constants
//!
//! Defaults for the one-dimensional Kalman filter and the adaptive EMA with
//! CUSUM changepoint detection. All values are in dB / dB² / seconds.

// ===== KALMAN 1D =====

/// Default process noise (dB² per second).
///
/// Random-walk drift of a stationary device's RSSI. Small, because a device
/// sitting in a room produces a stable mean and most of the spread is
/// measurement noise.
///
/// Source: Observed indoor BLE drift of well under 1 dB per minute
pub const KALMAN_PROCESS_NOISE: f64 = 0.01;

/// Default measurement noise (dB²).
///
/// Corresponds to a 4 dB standard deviation, typical for BLE advertisements
/// received through walls and bodies.
///
/// Source: Indoor BLE RSSI spread measurements (σ ≈ 3-6 dB)
pub const KALMAN_MEASUREMENT_NOISE: f64 = 16.0;

/// Smallest elapsed time applied to process noise (seconds).
///
/// Bursts of advertisements arriving within milliseconds should not collapse
/// the prediction step to nothing.
///
/// Source: Fastest common BLE advertising interval (100 ms)
pub const KALMAN_MIN_DT_SECONDS: f64 = 0.1;

/// Largest elapsed time applied to process noise (seconds).
///
/// Caps variance growth after long silences so an old estimate still carries
/// some weight when the device reappears.
///
/// Source: Engineering judgment
pub const KALMAN_MAX_DT_SECONDS: f64 = 30.0;

/// Variance applied by
/// [`reset_to_training_value`](crate::filters::Kalman1D::reset_to_training_value) (dB²).
///
/// Low enough that a user-confirmed value resists drift from later passive
/// samples.
///
/// Source: Engineering judgment
pub const TRAINING_RESET_VARIANCE: f64 = 2.0;

/// Sample count applied by `reset_to_training_value`.
///
/// Source: Engineering judgment
pub const TRAINING_RESET_SAMPLE_COUNT: u64 = 500;

/// Smallest variance used as a z-score denominator (dB²).
///
/// Source: Numerical safety margin
pub const Z_SCORE_VARIANCE_EPSILON: f64 = 1e-6;

// ===== ADAPTIVE MEASUREMENT NOISE =====

/// Lowest accepted reference power (dBm at 1 m).
pub const REF_POWER_MIN_DBM: f64 = -100.0;

/// Highest accepted reference power (dBm at 1 m).
pub const REF_POWER_MAX_DBM: f64 = 0.0;

/// Reference power substituted when the supplied one is out of range (dBm).
///
/// Source: Typical BLE tag calibrated power at 1 m
pub const REF_POWER_DEFAULT_DBM: f64 = -55.0;

/// Distance below the reference power where readings start to be distrusted (dB).
///
/// Source: Roughly 3 m of free-space path loss from the 1 m reference
pub const ADAPTIVE_OFFSET_DB: f64 = 10.0;

/// Noise multiplier base per 10 dB below the threshold.
///
/// Measurement noise doubles for every 10 dB a reading falls below the
/// threshold, reflecting the growing multipath share of weak signals.
///
/// Source: Engineering judgment
pub const ADAPTIVE_NOISE_SCALE: f64 = 2.0;

/// Floor on the noise multiplier for strong readings.
///
/// Source: Engineering judgment
pub const ADAPTIVE_MIN_NOISE_FACTOR: f64 = 0.5;

// ===== ADAPTIVE EMA + CUSUM =====

/// EMA smoothing factor.
///
/// Source: Equivalent window of roughly 9 samples
pub const EMA_ALPHA: f64 = 0.2;

/// Variance assumed before the EMA has seen any spread (dB²).
pub const EMA_INITIAL_VARIANCE: f64 = KALMAN_MEASUREMENT_NOISE;

/// Floor on the EMA variance (dB²).
///
/// Keeps z-normalisation finite when the input is perfectly constant.
pub const EMA_MIN_VARIANCE: f64 = 0.01;

/// CUSUM drift (allowance) in standard deviations.
///
/// Source: Page's CUSUM, k = δ/2 for a one-sigma shift
pub const CUSUM_DRIFT: f64 = 0.5;

/// CUSUM decision threshold in standard deviations.
///
/// Source: Page's CUSUM, h = 4-5 gives an in-control ARL of several hundred
pub const CUSUM_THRESHOLD: f64 = 5.0;

/// Number of recent changepoint timestamps retained by the EMA filter.
pub const CHANGEPOINT_HISTORY: usize = 8;
