//! One-Dimensional Kalman Filter for RSSI
//!
//! ## Model
//!
//! A stationary device's RSSI is modelled as a random walk observed through
//! heavy measurement noise:
//! ```text
//! x_k = x_{k-1} + w     w ~ N(0, q·dt)
//! z_k = x_k + v         v ~ N(0, r)
//! ```
//!
//! ### Predict
//! ```text
//! p' = p + q·dt         dt = clamp(now - last, MIN_DT, MAX_DT), 1 s if unknown
//! ```
//!
//! ### Correct
//! ```text
//! k = p' / (p' + r)
//! x = x + k·(z - x)
//! p = (1 - k)·p'
//! ```
//!
//! Advertisements arrive irregularly, so the process noise is scaled by the
//! elapsed time: after a long silence the filter trusts the next reading more.
//!
//! ## Adaptive Measurement Noise
//!
//! Weak readings are dominated by multipath and body shadowing. With a device's
//! reference power known, [`Kalman1D::update_adaptive`] inflates the
//! measurement noise for readings far below `ref_power - OFFSET`:
//! ```text
//! factor = max(MIN_FACTOR, SCALE^((threshold - z) / 10))
//! ```
//! The configured noise is never mutated; the factor applies to one update.
//!
//! ## Usage
//!
//! ```rust
//! use roomprint_core::filters::{Kalman1D, KalmanConfig};
//!
//! let mut filter = Kalman1D::new(KalmanConfig::default().with_measurement_noise(9.0));
//! for (i, rssi) in [-61.0, -65.0, -63.0, -60.0].iter().enumerate() {
//!     filter.update(*rssi, Some(i as f64));
//! }
//! assert!((filter.estimate() - -62.0).abs() < 2.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::constants::filters::{
    ADAPTIVE_MIN_NOISE_FACTOR, ADAPTIVE_NOISE_SCALE, ADAPTIVE_OFFSET_DB, KALMAN_MAX_DT_SECONDS,
    KALMAN_MEASUREMENT_NOISE, KALMAN_MIN_DT_SECONDS, KALMAN_PROCESS_NOISE, REF_POWER_DEFAULT_DBM,
    REF_POWER_MAX_DBM, REF_POWER_MIN_DBM, TRAINING_RESET_SAMPLE_COUNT, TRAINING_RESET_VARIANCE,
};
use crate::errors::{
    require_non_negative, require_positive, ConfigError, ConfigResult, RecordResult,
};
use crate::logging::log_warn;
use crate::record::{check_estimate, check_variance, require, PortableRecord};
use crate::scoring;
use crate::time::{clamped_dt, Timestamp};

/// Adaptive measurement noise parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveNoiseConfig {
    /// dB below the reference power where distrust starts
    pub offset_db: f64,
    /// Noise multiplier base per 10 dB below the threshold
    pub scale: f64,
    /// Floor on the multiplier for strong readings
    pub min_factor: f64,
    /// Reference power used when the supplied one is out of range (dBm)
    pub default_ref_power: f64,
}

impl Default for AdaptiveNoiseConfig {
    fn default() -> Self {
        Self {
            offset_db: ADAPTIVE_OFFSET_DB,
            scale: ADAPTIVE_NOISE_SCALE,
            min_factor: ADAPTIVE_MIN_NOISE_FACTOR,
            default_ref_power: REF_POWER_DEFAULT_DBM,
        }
    }
}

impl AdaptiveNoiseConfig {
    /// Check parameter domains
    pub fn validate(&self) -> ConfigResult<()> {
        require_non_negative("offset_db", self.offset_db)?;
        require_positive("scale", self.scale)?;
        require_positive("min_factor", self.min_factor)?;
        if !(REF_POWER_MIN_DBM..=REF_POWER_MAX_DBM).contains(&self.default_ref_power) {
            return Err(ConfigError::invalid(
                "default_ref_power",
                self.default_ref_power,
                "must lie in [-100, 0] dBm",
            ));
        }
        Ok(())
    }

    /// Measurement noise multiplier for `measurement` given `ref_power`
    ///
    /// Out-of-range or non-finite reference powers are replaced by
    /// `default_ref_power`.
    pub fn noise_factor(&self, measurement: f64, ref_power: f64) -> f64 {
        let ref_power = if ref_power.is_finite()
            && (REF_POWER_MIN_DBM..=REF_POWER_MAX_DBM).contains(&ref_power)
        {
            ref_power
        } else {
            log_warn!(
                "ref_power {} outside [{}, {}] dBm, using {}",
                ref_power,
                REF_POWER_MIN_DBM,
                REF_POWER_MAX_DBM,
                self.default_ref_power
            );
            self.default_ref_power
        };

        let threshold = ref_power - self.offset_db;
        let db_below = threshold - measurement;
        let factor = libm::pow(self.scale, db_below / 10.0);
        if factor.is_finite() {
            factor.max(self.min_factor)
        } else {
            self.min_factor
        }
    }
}

/// Kalman 1D configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KalmanConfig {
    /// Process noise q (dB² per second)
    pub process_noise: f64,
    /// Measurement noise r (dB²)
    pub measurement_noise: f64,
    /// Lower clamp for elapsed time (seconds)
    pub min_dt: f64,
    /// Upper clamp for elapsed time (seconds)
    pub max_dt: f64,
    /// Adaptive noise parameters
    pub adaptive: AdaptiveNoiseConfig,
}

impl Default for KalmanConfig {
    fn default() -> Self {
        Self {
            process_noise: KALMAN_PROCESS_NOISE,
            measurement_noise: KALMAN_MEASUREMENT_NOISE,
            min_dt: KALMAN_MIN_DT_SECONDS,
            max_dt: KALMAN_MAX_DT_SECONDS,
            adaptive: AdaptiveNoiseConfig::default(),
        }
    }
}

impl KalmanConfig {
    /// Set process noise (higher = follows changes faster)
    pub fn with_process_noise(mut self, noise: f64) -> Self {
        self.process_noise = noise;
        self
    }

    /// Set measurement noise variance
    pub fn with_measurement_noise(mut self, noise: f64) -> Self {
        self.measurement_noise = noise;
        self
    }

    /// Set elapsed-time clamp
    pub fn with_dt_bounds(mut self, min_dt: f64, max_dt: f64) -> Self {
        self.min_dt = min_dt;
        self.max_dt = max_dt;
        self
    }

    /// Set adaptive noise parameters
    pub fn with_adaptive(mut self, adaptive: AdaptiveNoiseConfig) -> Self {
        self.adaptive = adaptive;
        self
    }

    /// Check parameter domains
    pub fn validate(&self) -> ConfigResult<()> {
        require_non_negative("process_noise", self.process_noise)?;
        require_positive("measurement_noise", self.measurement_noise)?;
        require_positive("min_dt", self.min_dt)?;
        require_positive("max_dt", self.max_dt)?;
        if self.max_dt < self.min_dt {
            return Err(ConfigError::invalid("max_dt", self.max_dt, "must be >= min_dt"));
        }
        self.adaptive.validate()
    }
}

/// Snapshot of a scalar filter
///
/// `estimate` is only meaningful when `initialized` is set.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FilterState {
    /// Current estimate
    pub estimate: f64,
    /// Variance of the estimate, never negative
    pub variance: f64,
    /// Samples absorbed
    pub sample_count: u64,
    /// Timestamp of the first timestamped sample
    pub first_sample_time: Option<Timestamp>,
    /// Timestamp of the latest timestamped sample
    pub last_sample_time: Option<Timestamp>,
    /// Whether any sample (or a restore) has set the estimate
    pub initialized: bool,
}

impl FilterState {
    fn record_time(&mut self, timestamp: Option<Timestamp>) {
        if let Some(ts) = timestamp {
            if self.first_sample_time.is_none() {
                self.first_sample_time = Some(ts);
            }
            self.last_sample_time = Some(ts);
        }
    }
}

/// Persisted form of a [`Kalman1D`]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KalmanRecord {
    /// Estimate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate: Option<f64>,
    /// Variance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variance: Option<f64>,
    /// Sample count (`samples` in single-pool records)
    #[serde(default, alias = "samples", skip_serializing_if = "Option::is_none")]
    pub sample_count: Option<u64>,
    /// First observation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_sample_time: Option<Timestamp>,
    /// Last observation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sample_time: Option<Timestamp>,
}

/// Random-walk Kalman filter with time-aware process noise
#[derive(Debug, Clone, PartialEq)]
pub struct Kalman1D {
    config: KalmanConfig,
    state: FilterState,
}

impl Default for Kalman1D {
    fn default() -> Self {
        Self::new(KalmanConfig::default())
    }
}

impl Kalman1D {
    /// Create an uninitialised filter
    pub fn new(config: KalmanConfig) -> Self {
        Self {
            config,
            state: FilterState::default(),
        }
    }

    /// Incorporate a measurement and return the new estimate
    ///
    /// Non-finite measurements are ignored.
    pub fn update(&mut self, measurement: f64, timestamp: Option<Timestamp>) -> f64 {
        self.update_with_noise(measurement, self.config.measurement_noise, timestamp)
    }

    /// Incorporate a measurement with noise scaled by its distance below
    /// `ref_power - offset`
    ///
    /// `ref_power` outside [-100, 0] dBm is replaced by the configured default.
    pub fn update_adaptive(
        &mut self,
        measurement: f64,
        ref_power: f64,
        timestamp: Option<Timestamp>,
    ) -> f64 {
        let factor = self.config.adaptive.noise_factor(measurement, ref_power);
        self.update_with_noise(measurement, self.config.measurement_noise * factor, timestamp)
    }

    fn update_with_noise(
        &mut self,
        measurement: f64,
        measurement_noise: f64,
        timestamp: Option<Timestamp>,
    ) -> f64 {
        if !measurement.is_finite() {
            log_warn!("Ignoring non-finite measurement {}", measurement);
            return self.state.estimate;
        }

        let state = &mut self.state;

        if !state.initialized {
            state.estimate = measurement;
            state.variance = measurement_noise.max(0.0);
            state.sample_count += 1;
            state.initialized = true;
            state.record_time(timestamp);
            return state.estimate;
        }

        let dt = clamped_dt(
            state.last_sample_time,
            timestamp,
            self.config.min_dt,
            self.config.max_dt,
        );
        let predicted = state.variance.max(0.0) + self.config.process_noise * dt;

        let denominator = predicted + measurement_noise;
        let gain = if denominator > 0.0 { predicted / denominator } else { 0.0 };

        state.estimate += gain * (measurement - state.estimate);
        state.variance = ((1.0 - gain) * predicted).max(0.0);
        state.sample_count += 1;
        state.record_time(timestamp);

        state.estimate
    }

    /// Current estimate (0.0 before the first sample)
    pub fn estimate(&self) -> f64 {
        self.state.estimate
    }

    /// Current variance
    pub fn variance(&self) -> f64 {
        self.state.variance
    }

    /// Samples absorbed
    pub fn sample_count(&self) -> u64 {
        self.state.sample_count
    }

    /// Whether the estimate is meaningful
    pub fn is_initialized(&self) -> bool {
        self.state.initialized
    }

    /// Full state snapshot
    pub fn state(&self) -> &FilterState {
        &self.state
    }

    /// Configuration in use
    pub fn config(&self) -> &KalmanConfig {
        &self.config
    }

    /// |observed - estimate| / σ, 0 when uninitialised or variance ≤ 0
    pub fn z_score(&self, observed: f64) -> f64 {
        if !self.state.initialized {
            return 0.0;
        }
        scoring::z_score(observed, self.state.estimate, self.state.variance)
    }

    /// Return to the uninitialised state
    pub fn reset(&mut self) {
        self.state = FilterState::default();
    }

    /// Force the state, e.g. from storage
    ///
    /// Timestamps are left untouched. The filter counts as initialised only
    /// when `sample_count > 0`.
    pub fn restore(&mut self, estimate: f64, variance: f64, sample_count: u64) {
        self.state.estimate = estimate;
        self.state.variance = variance.max(0.0);
        self.state.sample_count = sample_count;
        self.state.initialized = sample_count > 0;
    }

    /// Override with an externally authoritative value
    ///
    /// Used for explicit user confirmation at training time: a low `variance`
    /// and high `sample_count` make the value resist drift from later passive
    /// samples. See [`TRAINING_RESET_VARIANCE`] and
    /// [`TRAINING_RESET_SAMPLE_COUNT`] for the usual choices.
    ///
    /// [`TRAINING_RESET_VARIANCE`]: crate::constants::filters::TRAINING_RESET_VARIANCE
    /// [`TRAINING_RESET_SAMPLE_COUNT`]: crate::constants::filters::TRAINING_RESET_SAMPLE_COUNT
    pub fn reset_to_value(&mut self, value: f64, variance: f64, sample_count: u64) {
        self.state.estimate = value;
        self.state.variance = variance.max(0.0);
        self.state.sample_count = sample_count;
        self.state.initialized = true;
    }

    /// Pin the filter to a user-confirmed value
    ///
    /// Like [`reset_to_value`](Self::reset_to_value) with a low variance and a
    /// high sample count, so later passive samples barely move it.
    pub fn reset_to_training_value(&mut self, value: f64) {
        self.reset_to_value(value, TRAINING_RESET_VARIANCE, TRAINING_RESET_SAMPLE_COUNT);
    }

    /// Reset the variance but keep the estimate and sample count
    ///
    /// Gives a new training session proportionate influence instead of being
    /// drowned out by the low variance of earlier sessions. Also forgets the
    /// last timestamp so the first sample of the session sees the default dt.
    /// Defaults to the measurement noise. No-op before the first sample.
    pub fn reset_variance_only(&mut self, target_variance: Option<f64>) {
        if !self.state.initialized {
            return;
        }
        let target = target_variance.unwrap_or(self.config.measurement_noise);
        self.state.variance = if target.is_finite() {
            target.max(0.0)
        } else {
            self.config.measurement_noise
        };
        self.state.last_sample_time = None;
    }
}

impl PortableRecord for Kalman1D {
    type Record = KalmanRecord;
    type Config = KalmanConfig;

    fn to_record(&self) -> KalmanRecord {
        KalmanRecord {
            estimate: Some(self.state.estimate),
            variance: Some(self.state.variance),
            sample_count: Some(self.state.sample_count),
            first_sample_time: self.state.first_sample_time,
            last_sample_time: self.state.last_sample_time,
        }
    }

    fn from_record(record: KalmanRecord, config: &KalmanConfig) -> RecordResult<Self> {
        let estimate = check_estimate("estimate", require("estimate", record.estimate)?)?;
        let variance = check_variance("variance", require("variance", record.variance)?)?;
        let sample_count = require("sample_count", record.sample_count)?;

        let mut filter = Kalman1D::new(*config);
        filter.restore(estimate, variance, sample_count);
        filter.state.first_sample_time = record.first_sample_time;
        filter.state.last_sample_time = record.last_sample_time;
        Ok(filter)
    }
}
