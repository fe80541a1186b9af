//! Two-Pool Estimator
//!
//! ## Pools
//!
//! Every learned quantity is tracked by two independent [`Kalman1D`] filters:
//!
//! - **auto**: fed continuously by passive observation
//! - **button**: fed only by explicit user confirmation
//!
//! Neither pool ever sees the other's samples and neither is capped or frozen.
//! The auto pool follows genuine environmental drift (furniture moves, a door
//! that is usually open) while the button pool keeps what the user asserted.
//!
//! ## Fusion
//!
//! ```text
//! w_a = n_auto
//! w_b = n_button × BUTTON_WEIGHT_MULTIPLIER
//!
//! estimate = (w_a·x_a + w_b·x_b) / (w_a + w_b)
//! variance = (w_a·p_a + w_b·p_b) / (w_a + w_b)
//! samples  = w_a + w_b
//! ```
//!
//! An empty pool drops out; with both empty the auto pool's default (0.0)
//! is reported.
//!
//! ```rust
//! use roomprint_core::correlation::DualPoolEstimator;
//!
//! let mut pools = DualPoolEstimator::default();
//! for _ in 0..100 {
//!     pools.update(0.0, None);
//!     pools.update_button(30.0, None);
//! }
//! // Button confirmations count twice
//! assert!((pools.estimate() - 20.0).abs() < 1e-9);
//! assert_eq!(pools.sample_count(), 300);
//! ```

use serde::{Deserialize, Serialize};

use crate::constants::correlation::{
    BUTTON_WEIGHT_MULTIPLIER, PROFILE_MEASUREMENT_NOISE, PROFILE_PROCESS_NOISE,
};
use crate::errors::{ConfigError, ConfigResult, RecordError, RecordResult};
use crate::filters::{Kalman1D, KalmanConfig, KalmanRecord};
use crate::logging::log_info;
use crate::record::PortableRecord;
use crate::scoring;
use crate::time::Timestamp;

/// Two-pool estimator configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Kalman parameters shared by both pools
    pub kalman: KalmanConfig,
    /// Weight of one button sample relative to one auto sample
    pub button_weight: u64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            kalman: KalmanConfig::default()
                .with_process_noise(PROFILE_PROCESS_NOISE)
                .with_measurement_noise(PROFILE_MEASUREMENT_NOISE),
            button_weight: BUTTON_WEIGHT_MULTIPLIER,
        }
    }
}

impl EstimatorConfig {
    /// Set the pools' Kalman parameters
    pub fn with_kalman(mut self, kalman: KalmanConfig) -> Self {
        self.kalman = kalman;
        self
    }

    /// Set the button weight multiplier
    pub fn with_button_weight(mut self, weight: u64) -> Self {
        self.button_weight = weight;
        self
    }

    /// Check parameter domains
    pub fn validate(&self) -> ConfigResult<()> {
        if self.button_weight == 0 {
            return Err(ConfigError::invalid("button_weight", 0.0, "must be >= 1"));
        }
        self.kalman.validate()
    }
}

/// Persisted pools
///
/// Older single-pool records stored the Kalman fields at the top level. They
/// are read into the auto pool.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EstimatorRecord {
    /// Auto pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto: Option<KalmanRecord>,
    /// Button pool, empty when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<KalmanRecord>,
    /// Single-pool layout
    #[serde(flatten)]
    pub legacy: KalmanRecord,
}

impl EstimatorRecord {
    fn has_legacy_pool(&self) -> bool {
        self.legacy.estimate.is_some()
            || self.legacy.variance.is_some()
            || self.legacy.sample_count.is_some()
    }
}

/// Auto and button Kalman pools fused by weighted sample count
#[derive(Debug, Clone, PartialEq)]
pub struct DualPoolEstimator {
    auto: Kalman1D,
    button: Kalman1D,
    button_weight: u64,
}

impl Default for DualPoolEstimator {
    fn default() -> Self {
        Self::new(EstimatorConfig::default())
    }
}

impl DualPoolEstimator {
    /// Create with both pools empty
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            auto: Kalman1D::new(config.kalman),
            button: Kalman1D::new(config.kalman),
            button_weight: config.button_weight,
        }
    }

    /// Feed the auto pool, returning the fused estimate
    pub fn update(&mut self, value: f64, timestamp: Option<Timestamp>) -> f64 {
        self.auto.update(value, timestamp);
        self.estimate()
    }

    /// Feed the button pool, returning the fused estimate
    pub fn update_button(&mut self, value: f64, timestamp: Option<Timestamp>) -> f64 {
        self.button.update(value, timestamp);
        self.estimate()
    }

    fn weights(&self) -> (f64, f64) {
        let auto = self.auto.sample_count();
        let button = self.button.sample_count().saturating_mul(self.button_weight);
        (auto as f64, button as f64)
    }

    fn blend(&self, auto: f64, button: f64) -> f64 {
        let (w_a, w_b) = self.weights();
        if w_b == 0.0 {
            auto
        } else if w_a == 0.0 {
            button
        } else {
            (w_a * auto + w_b * button) / (w_a + w_b)
        }
    }

    /// Fused estimate
    pub fn estimate(&self) -> f64 {
        self.blend(self.auto.estimate(), self.button.estimate())
    }

    /// Fused variance
    pub fn variance(&self) -> f64 {
        self.blend(self.auto.variance(), self.button.variance())
    }

    /// Weighted sample count: auto + button × multiplier
    pub fn sample_count(&self) -> u64 {
        self.auto
            .sample_count()
            .saturating_add(self.button.sample_count().saturating_mul(self.button_weight))
    }

    /// |observed - estimate| / σ on the fused values, 0 when variance ≤ 0
    pub fn z_score(&self, observed: f64) -> f64 {
        scoring::z_score(observed, self.estimate(), self.variance())
    }

    /// Auto pool
    pub fn auto(&self) -> &Kalman1D {
        &self.auto
    }

    /// Button pool
    pub fn button(&self) -> &Kalman1D {
        &self.button
    }

    /// Whether the button pool holds any samples
    pub fn has_button_samples(&self) -> bool {
        self.button.sample_count() > 0
    }

    /// Forget user confirmations, keep passive learning
    pub fn reset_training(&mut self) {
        self.button.reset();
    }

    /// Reset both pools' variance so a new session has proportionate influence
    pub fn begin_training_session(&mut self) {
        self.auto.reset_variance_only(None);
        self.button.reset_variance_only(None);
    }
}

impl PortableRecord for DualPoolEstimator {
    type Record = EstimatorRecord;
    type Config = EstimatorConfig;

    fn to_record(&self) -> EstimatorRecord {
        EstimatorRecord {
            auto: Some(self.auto.to_record()),
            button: Some(self.button.to_record()),
            legacy: KalmanRecord::default(),
        }
    }

    fn from_record(record: EstimatorRecord, config: &EstimatorConfig) -> RecordResult<Self> {
        let legacy = record.has_legacy_pool();
        let auto = match record.auto {
            Some(auto) => Kalman1D::from_record(auto, &config.kalman)?,
            None if legacy => {
                log_info!("Migrating single-pool record into the auto pool");
                Kalman1D::from_record(record.legacy, &config.kalman)?
            }
            None => return Err(RecordError::MissingField { field: "auto" }),
        };
        let button = match record.button {
            Some(button) => Kalman1D::from_record(button, &config.kalman)?,
            None => Kalman1D::new(config.kalman),
        };

        Ok(Self {
            auto,
            button,
            button_weight: config.button_weight,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_pools_report_default() {
        let pools = DualPoolEstimator::default();
        assert_eq!(pools.estimate(), 0.0);
        assert_eq!(pools.variance(), 0.0);
        assert_eq!(pools.sample_count(), 0);
        assert_eq!(pools.z_score(-50.0), 0.0);
    }

    #[test]
    fn single_pool_falls_through() {
        let mut pools = DualPoolEstimator::default();
        pools.update_button(12.0, None);
        assert_eq!(pools.estimate(), 12.0);
        assert_eq!(pools.sample_count(), 2);
        assert!(pools.has_button_samples());

        let mut auto_only = DualPoolEstimator::default();
        auto_only.update(-4.0, None);
        assert_eq!(auto_only.estimate(), -4.0);
        assert_eq!(auto_only.variance(), PROFILE_MEASUREMENT_NOISE);
    }

    #[test]
    fn auto_dominates_with_volume() {
        let mut pools = DualPoolEstimator::default();
        for _ in 0..1000 {
            pools.update(0.0, None);
        }
        for _ in 0..50 {
            pools.update_button(30.0, None);
        }
        assert!(pools.estimate() < 10.0);
        assert_eq!(pools.sample_count(), 1100);
    }

    #[test]
    fn pools_never_mix() {
        let mut pools = DualPoolEstimator::default();
        for _ in 0..20 {
            pools.update(5.0, None);
        }
        pools.update_button(-5.0, None);
        assert_eq!(pools.auto().estimate(), 5.0);
        assert_eq!(pools.button().estimate(), -5.0);
    }

    #[test]
    fn reset_training_keeps_auto() {
        let mut pools = DualPoolEstimator::default();
        pools.update(3.0, None);
        pools.update_button(9.0, None);
        pools.reset_training();
        assert!(!pools.has_button_samples());
        assert_eq!(pools.estimate(), 3.0);
    }

    #[test]
    fn training_session_widens_variance() {
        let mut pools = DualPoolEstimator::default();
        for _ in 0..200 {
            pools.update(7.0, None);
        }
        let settled = pools.variance();
        pools.begin_training_session();
        assert!(pools.variance() > settled);
        assert_eq!(pools.estimate(), 7.0);
    }

    #[test]
    fn record_round_trip_is_exact() {
        let mut pools = DualPoolEstimator::default();
        for (i, v) in [1.3, 2.9, 0.4, 1.7].iter().enumerate() {
            pools.update(*v, Some(i as f64));
        }
        pools.update_button(-0.6, Some(9.5));

        let restored = DualPoolEstimator::from_portable_record(&pools.to_portable_record()).unwrap();
        assert_eq!(restored, pools);
    }

    #[test]
    fn legacy_record_migrates_to_auto() {
        let legacy = json!({ "estimate": 6.5, "variance": 1.25, "samples": 42 });
        let pools = DualPoolEstimator::from_portable_record(&legacy).unwrap();
        assert_eq!(pools.auto().estimate(), 6.5);
        assert_eq!(pools.auto().sample_count(), 42);
        assert!(!pools.has_button_samples());
        assert_eq!(pools.sample_count(), 42);
    }

    #[test]
    fn record_without_pools_fails() {
        assert_eq!(
            DualPoolEstimator::from_portable_record(&json!({})),
            Err(RecordError::MissingField { field: "auto" })
        );
    }

    #[test]
    fn config_validation() {
        assert!(EstimatorConfig::default().validate().is_ok());
        assert!(EstimatorConfig::default().with_button_weight(0).validate().is_err());
    }
}
