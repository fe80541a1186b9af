//! Adaptive EMA with CUSUM Changepoint Detection
//!
//! ## Smoothing
//!
//! Mean and spread are tracked with exponential moving averages:
//! ```text
//! d      = z - mean
//! mean   = mean + α·d
//! var    = (1 - α)·var + α·d²
//! ```
//! The variance is an approximation rather than a Welford update. It forgets
//! old spread at the same rate as the mean, so it re-adapts after a move.
//!
//! ## Changepoint Detection
//!
//! A two-sided CUSUM runs on z-normalised deviations (against the spread
//! *before* the current sample):
//! ```text
//! s = d / sqrt(var)
//! S⁺ = max(0, S⁺ + s - k)
//! S⁻ = max(0, S⁻ - s - k)
//! ```
//! The drift `k` absorbs stable noise; a changepoint fires when either side
//! exceeds `h`. Both accumulators then reset to zero and the event is counted.
//! The most recent changepoint timestamps are kept in a fixed-size ring.

use heapless::HistoryBuffer;
use serde::{Deserialize, Serialize};

use crate::constants::filters::{
    CHANGEPOINT_HISTORY, CUSUM_DRIFT, CUSUM_THRESHOLD, EMA_ALPHA, EMA_INITIAL_VARIANCE,
    EMA_MIN_VARIANCE,
};
use crate::errors::{require_non_negative, require_positive, ConfigError, ConfigResult};
use crate::filters::kalman::FilterState;
use crate::logging::{log_debug, log_warn};
use crate::scoring;
use crate::time::Timestamp;

/// Adaptive EMA configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmaConfig {
    /// Smoothing factor α in (0, 1]
    pub alpha: f64,
    /// Variance assigned on the first sample (dB²)
    pub initial_variance: f64,
    /// Floor on the tracked variance (dB²)
    pub min_variance: f64,
    /// CUSUM drift k, in standard deviations
    pub cusum_drift: f64,
    /// CUSUM trigger threshold h
    pub cusum_threshold: f64,
}

impl Default for EmaConfig {
    fn default() -> Self {
        Self {
            alpha: EMA_ALPHA,
            initial_variance: EMA_INITIAL_VARIANCE,
            min_variance: EMA_MIN_VARIANCE,
            cusum_drift: CUSUM_DRIFT,
            cusum_threshold: CUSUM_THRESHOLD,
        }
    }
}

impl EmaConfig {
    /// Set the smoothing factor
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set CUSUM drift and threshold
    pub fn with_cusum(mut self, drift: f64, threshold: f64) -> Self {
        self.cusum_drift = drift;
        self.cusum_threshold = threshold;
        self
    }

    /// Check parameter domains
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(ConfigError::invalid("alpha", self.alpha, "must lie in (0, 1]"));
        }
        require_positive("initial_variance", self.initial_variance)?;
        require_positive("min_variance", self.min_variance)?;
        require_non_negative("cusum_drift", self.cusum_drift)?;
        require_positive("cusum_threshold", self.cusum_threshold)
    }
}

/// Result of one EMA update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmaUpdate {
    /// Smoothed estimate after the sample
    pub estimate: f64,
    /// Whether this sample triggered a changepoint
    pub changepoint: bool,
}

/// EMA filter with two-sided CUSUM changepoint detection
#[derive(Debug, Clone)]
pub struct AdaptiveEma {
    config: EmaConfig,
    state: FilterState,
    cusum_pos: f64,
    cusum_neg: f64,
    changepoint_count: u64,
    last_changepoint: bool,
    last_changepoint_time: Option<Timestamp>,
    changepoint_times: HistoryBuffer<Timestamp, CHANGEPOINT_HISTORY>,
}

impl Default for AdaptiveEma {
    fn default() -> Self {
        Self::new(EmaConfig::default())
    }
}

impl AdaptiveEma {
    /// Create an uninitialised filter
    pub fn new(config: EmaConfig) -> Self {
        Self {
            config,
            state: FilterState::default(),
            cusum_pos: 0.0,
            cusum_neg: 0.0,
            changepoint_count: 0,
            last_changepoint: false,
            last_changepoint_time: None,
            changepoint_times: HistoryBuffer::new(),
        }
    }

    /// Incorporate a measurement and return the new estimate
    ///
    /// Whether it triggered a changepoint is available from
    /// [`last_update_was_changepoint`](Self::last_update_was_changepoint).
    pub fn update(&mut self, measurement: f64, timestamp: Option<Timestamp>) -> f64 {
        self.update_detect(measurement, timestamp).estimate
    }

    /// Incorporate a measurement and report the changepoint flag with it
    pub fn update_detect(&mut self, measurement: f64, timestamp: Option<Timestamp>) -> EmaUpdate {
        if !measurement.is_finite() {
            log_warn!("Ignoring non-finite measurement {}", measurement);
            self.last_changepoint = false;
            return EmaUpdate {
                estimate: self.state.estimate,
                changepoint: false,
            };
        }

        self.record_time(timestamp);
        self.state.sample_count += 1;

        if !self.state.initialized {
            self.state.estimate = measurement;
            self.state.variance = self.config.initial_variance;
            self.state.initialized = true;
            self.last_changepoint = false;
            return EmaUpdate {
                estimate: measurement,
                changepoint: false,
            };
        }

        let deviation = measurement - self.state.estimate;
        let std_dev = libm::sqrt(self.state.variance.max(self.config.min_variance));
        let normalized = deviation / std_dev;

        self.cusum_pos = (self.cusum_pos + normalized - self.config.cusum_drift).max(0.0);
        self.cusum_neg = (self.cusum_neg - normalized - self.config.cusum_drift).max(0.0);

        let changepoint = self.cusum_pos > self.config.cusum_threshold
            || self.cusum_neg > self.config.cusum_threshold;
        if changepoint {
            self.cusum_pos = 0.0;
            self.cusum_neg = 0.0;
            self.changepoint_count += 1;
            self.last_changepoint_time = timestamp;
            if let Some(ts) = timestamp {
                self.changepoint_times.write(ts);
            }
            log_debug!(
                "Changepoint #{} at estimate {} (measurement {})",
                self.changepoint_count,
                self.state.estimate,
                measurement
            );
        }
        self.last_changepoint = changepoint;

        let alpha = self.config.alpha;
        self.state.estimate += alpha * deviation;
        self.state.variance = ((1.0 - alpha) * self.state.variance + alpha * deviation * deviation)
            .max(self.config.min_variance);

        EmaUpdate {
            estimate: self.state.estimate,
            changepoint,
        }
    }

    fn record_time(&mut self, timestamp: Option<Timestamp>) {
        if let Some(ts) = timestamp {
            if self.state.first_sample_time.is_none() {
                self.state.first_sample_time = Some(ts);
            }
            self.state.last_sample_time = Some(ts);
        }
    }

    /// Smoothed mean (0.0 before the first sample)
    pub fn estimate(&self) -> f64 {
        self.state.estimate
    }

    /// Smoothed variance
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
    pub fn config(&self) -> &EmaConfig {
        &self.config
    }

    /// |observed - mean| / σ, 0 when uninitialised
    pub fn z_score(&self, observed: f64) -> f64 {
        if !self.state.initialized {
            return 0.0;
        }
        scoring::z_score(observed, self.state.estimate, self.state.variance)
    }

    /// Whether the most recent update triggered a changepoint
    pub fn last_update_was_changepoint(&self) -> bool {
        self.last_changepoint
    }

    /// Changepoints detected since creation or reset
    pub fn changepoint_count(&self) -> u64 {
        self.changepoint_count
    }

    /// Timestamp of the latest changepoint, if it was timestamped
    pub fn last_changepoint_time(&self) -> Option<Timestamp> {
        self.last_changepoint_time
    }

    /// Recent changepoint timestamps, oldest first
    pub fn recent_changepoints(&self) -> impl Iterator<Item = Timestamp> + '_ {
        self.changepoint_times.oldest_ordered().copied()
    }

    /// Current CUSUM accumulators `(S⁺, S⁻)`
    pub fn cusum(&self) -> (f64, f64) {
        (self.cusum_pos, self.cusum_neg)
    }

    /// Return to the uninitialised state
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_no_changepoint() {
        let mut ema = AdaptiveEma::default();
        let result = ema.update_detect(-70.0, Some(0.0));
        assert_eq!(result, EmaUpdate { estimate: -70.0, changepoint: false });
        assert_eq!(ema.variance(), EMA_INITIAL_VARIANCE);
        assert!(ema.is_initialized());
    }

    #[test]
    fn smoothing_follows_alpha() {
        let mut ema = AdaptiveEma::new(EmaConfig::default().with_alpha(0.5));
        ema.update(0.0, None);
        assert_eq!(ema.update(10.0, None), 5.0);
        // var = 0.5·16 + 0.5·100
        assert!((ema.variance() - 58.0).abs() < 1e-12);
    }

    #[test]
    fn stable_noise_no_false_alarms() {
        let mut ema = AdaptiveEma::default();
        // Alternating ±2 dB around -65 stays well inside the drift band
        for i in 0..500 {
            let offset = if i % 2 == 0 { 2.0 } else { -2.0 };
            ema.update(-65.0 + offset, Some(i as f64));
        }
        assert_eq!(ema.changepoint_count(), 0);
        assert!((ema.estimate() - -65.0).abs() < 1.0);
    }

    #[test]
    fn step_change_detected() {
        let mut ema = AdaptiveEma::default();
        for i in 0..50 {
            let offset = if i % 2 == 0 { 1.0 } else { -1.0 };
            ema.update(-80.0 + offset, Some(i as f64));
        }
        assert_eq!(ema.changepoint_count(), 0);

        let mut detected_at = None;
        for i in 50..80 {
            if ema.update_detect(-55.0, Some(i as f64)).changepoint {
                detected_at = Some(i as f64);
                break;
            }
        }

        let at = detected_at.expect("step change should be detected");
        assert!(ema.last_update_was_changepoint());
        assert_eq!(ema.changepoint_count(), 1);
        assert_eq!(ema.last_changepoint_time(), Some(at));
        assert_eq!(ema.recent_changepoints().collect::<Vec<_>>(), vec![at]);
        assert_eq!(ema.cusum(), (0.0, 0.0));
    }

    #[test]
    fn downward_step_detected() {
        let mut ema = AdaptiveEma::default();
        for _ in 0..30 {
            ema.update(-50.0, None);
        }
        let fired = (0..30).any(|_| ema.update_detect(-85.0, None).changepoint);
        assert!(fired);
        assert_eq!(ema.last_changepoint_time(), None);
        assert_eq!(ema.recent_changepoints().count(), 0);
    }

    #[test]
    fn non_finite_ignored_and_reset() {
        let mut ema = AdaptiveEma::default();
        ema.update(-60.0, None);
        let before = *ema.state();
        ema.update(f64::NAN, None);
        assert_eq!(*ema.state(), before);

        ema.reset();
        assert!(!ema.is_initialized());
        assert_eq!(ema.changepoint_count(), 0);
        assert_eq!(ema.z_score(-10.0), 0.0);
    }

    #[test]
    fn config_validation() {
        assert!(EmaConfig::default().validate().is_ok());
        assert!(EmaConfig::default().with_alpha(0.0).validate().is_err());
        assert!(EmaConfig::default().with_alpha(1.5).validate().is_err());
        assert!(EmaConfig::default().with_cusum(0.5, 0.0).validate().is_err());
    }
}
