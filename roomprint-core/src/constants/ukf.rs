//! Multi-Scanner UKF and Matrix Kernel Constants

// ===== NOISE MODEL =====

/// Random-walk process noise per scanner (dB² per second).
///
/// Larger than the scalar profile noise: the UKF tracks a live, possibly
/// moving device rather than a learned room mean.
///
/// Source: Walking-speed RSSI change of a few dB per second
pub const UKF_PROCESS_NOISE: f64 = 0.5;

/// Measurement noise per scanner reading (dB²).
///
/// Source: Indoor BLE RSSI spread (σ ≈ 4 dB)
pub const UKF_MEASUREMENT_NOISE: f64 = 16.0;

/// Variance of a scanner added without a reading (dB²).
pub const UKF_INITIAL_VARIANCE: f64 = 100.0;

/// State assigned to a scanner added without a reading (dBm).
///
/// Source: Typical edge-of-range BLE reading
pub const UKF_INITIAL_RSSI_DBM: f64 = -80.0;

/// Floor on every covariance diagonal entry (dB²).
///
/// Prevents the covariance from collapsing over unbounded runtimes.
pub const UKF_MIN_VARIANCE: f64 = 0.01;

/// Smallest elapsed time applied by timestamped updates (seconds).
pub const UKF_MIN_DT_SECONDS: f64 = 0.1;

/// Largest elapsed time applied by timestamped updates (seconds).
pub const UKF_MAX_DT_SECONDS: f64 = 30.0;

// ===== SIGMA POINTS =====

/// Sigma point spread (α).
///
/// Source: Van der Merwe scaled unscented transform
pub const UKF_ALPHA: f64 = 0.5;

/// Prior distribution knowledge (β), 2 is optimal for Gaussians.
pub const UKF_BETA: f64 = 2.0;

/// Secondary scaling (κ).
pub const UKF_KAPPA: f64 = 0.0;

// ===== FINGERPRINT MATCHING =====

/// Fewest shared scanners for a Mahalanobis comparison.
///
/// A single dimension carries no shape information, only level.
pub const MIN_FINGERPRINT_OVERLAP: usize = 2;

/// Floor on a profile's per-scanner variance in the joint covariance (dB²).
///
/// Source: Engineering judgment
pub const MIN_PROFILE_VARIANCE: f64 = 1.0;

// ===== MATRIX KERNEL =====

/// Diagonal regularisation added before Cholesky and inversion.
///
/// Source: Numerical safety margin for f64 covariance matrices
pub const MATRIX_REGULARIZATION: f64 = 1e-9;

/// Smallest pivot accepted by Gauss-Jordan inversion.
pub const MATRIX_PIVOT_EPSILON: f64 = 1e-12;

/// Largest accepted ‖A‖max × ‖A⁻¹‖max before an inverse is rejected.
///
/// Source: Leaves ~8 significant digits of an f64 result
pub const MATRIX_MAX_CONDITION: f64 = 1e8;
