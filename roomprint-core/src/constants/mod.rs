//! Constants for Roomprint Core
//!
//! This module provides centralized, documented defaults used throughout the
//! estimation engine. Every configuration struct takes its `Default` from here,
//! and every value can be overridden at construction time.
//!
//! ## Organization
//!
//! Constants are grouped by component:
//! - **Filters**: Kalman 1D, adaptive noise, EMA + CUSUM
//! - **Correlation**: dual-pool weighting, maturity, eviction, scoring
//! - **UKF**: multi-scanner noise model, sigma points, matrix kernel
//!
//! ## Units
//!
//! RSSI values are dBm, deltas are dB, variances are dB², times are seconds.

/// Scalar filter defaults.
pub mod filters;

/// Profile and correlation defaults.
pub mod correlation;

/// Multi-scanner filter and matrix kernel defaults.
pub mod ukf;

pub use filters::{
    KALMAN_PROCESS_NOISE, KALMAN_MEASUREMENT_NOISE, REF_POWER_DEFAULT_DBM,
    EMA_ALPHA, CUSUM_DRIFT, CUSUM_THRESHOLD,
};

pub use correlation::{
    BUTTON_WEIGHT_MULTIPLIER, PAIR_MATURITY_SAMPLES, ABSOLUTE_MATURITY_SAMPLES,
    ROOM_PAIR_MATURITY_SAMPLES, MAX_AREA_CORRELATIONS, MAX_ROOM_PAIRS,
    NEUTRAL_MATCH_SCORE,
};

pub use ukf::{
    UKF_PROCESS_NOISE, UKF_MEASUREMENT_NOISE, UKF_MIN_VARIANCE, MIN_FINGERPRINT_OVERLAP,
};
