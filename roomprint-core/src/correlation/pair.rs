//! Scanner Pair Correlation
//!
//! Learns the RSSI delta between two scanners while a device sits in one
//! area. Deltas cancel most of the device-specific transmit power, which makes
//! them the primary signal for rooms without a scanner of their own.
//!
//! ## Maturity
//!
//! A correlation only contributes to scoring once its weighted sample count
//! reaches a threshold:
//!
//! | Owner | Threshold |
//! |-------|-----------|
//! | [`AreaProfile`](super::AreaProfile) pair | 30 |
//! | [`RoomProfile`](super::RoomProfile) pair | 20 |

use alloc::string::String;

use serde::{Deserialize, Serialize};

use crate::constants::correlation::PAIR_MATURITY_SAMPLES;
use crate::correlation::estimator::{DualPoolEstimator, EstimatorConfig, EstimatorRecord};
use crate::errors::{ConfigError, ConfigResult, RecordResult};
use crate::record::{require, PortableRecord};
use crate::time::Timestamp;

/// Per-entity configuration for pair correlations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairConfig {
    /// Pool parameters
    pub estimator: EstimatorConfig,
    /// Weighted samples needed before the pair is scored
    pub maturity_samples: u64,
}

impl Default for PairConfig {
    fn default() -> Self {
        Self {
            estimator: EstimatorConfig::default(),
            maturity_samples: PAIR_MATURITY_SAMPLES,
        }
    }
}

impl PairConfig {
    /// Check parameter domains
    pub fn validate(&self) -> ConfigResult<()> {
        if self.maturity_samples == 0 {
            return Err(ConfigError::invalid("maturity_samples", 0.0, "must be >= 1"));
        }
        self.estimator.validate()
    }
}

/// Persisted scanner-keyed pools, shared by pair and absolute profiles
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScannerRecord {
    /// Scanner id, or canonical pair key for room pairs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanner: Option<String>,
    /// Pools
    #[serde(flatten)]
    pub pools: EstimatorRecord,
}

/// Learned RSSI delta against one other scanner
#[derive(Debug, Clone, PartialEq)]
pub struct PairCorrelation {
    scanner: String,
    estimator: DualPoolEstimator,
    maturity_samples: u64,
}

impl PairCorrelation {
    /// Create an empty correlation for `scanner`
    pub fn new(scanner: impl Into<String>, config: PairConfig) -> Self {
        Self {
            scanner: scanner.into(),
            estimator: DualPoolEstimator::new(config.estimator),
            maturity_samples: config.maturity_samples,
        }
    }

    /// Scanner id (or pair key)
    pub fn scanner(&self) -> &str {
        &self.scanner
    }

    /// Feed a passively observed delta
    pub fn update(&mut self, delta: f64, timestamp: Option<Timestamp>) -> f64 {
        self.estimator.update(delta, timestamp)
    }

    /// Feed a user-confirmed delta
    pub fn update_button(&mut self, delta: f64, timestamp: Option<Timestamp>) -> f64 {
        self.estimator.update_button(delta, timestamp)
    }

    /// Expected delta
    pub fn estimate(&self) -> f64 {
        self.estimator.estimate()
    }

    /// Variance of the expected delta
    pub fn variance(&self) -> f64 {
        self.estimator.variance()
    }

    /// Weighted sample count
    pub fn sample_count(&self) -> u64 {
        self.estimator.sample_count()
    }

    /// Threshold for [`is_mature`](Self::is_mature)
    pub fn maturity_samples(&self) -> u64 {
        self.maturity_samples
    }

    /// Enough weighted samples to be scored
    pub fn is_mature(&self) -> bool {
        self.estimator.sample_count() >= self.maturity_samples
    }

    /// z-score of an observed delta, 0 when variance ≤ 0
    pub fn z_score(&self, observed_delta: f64) -> f64 {
        self.estimator.z_score(observed_delta)
    }

    /// Whether the user has confirmed this pair
    pub fn has_button_samples(&self) -> bool {
        self.estimator.has_button_samples()
    }

    /// Underlying pools
    pub fn estimator(&self) -> &DualPoolEstimator {
        &self.estimator
    }

    /// Forget user confirmations
    pub fn reset_training(&mut self) {
        self.estimator.reset_training();
    }

    /// Start a training session with widened variance
    pub fn begin_training_session(&mut self) {
        self.estimator.begin_training_session();
    }
}

impl PortableRecord for PairCorrelation {
    type Record = ScannerRecord;
    type Config = PairConfig;

    fn to_record(&self) -> ScannerRecord {
        ScannerRecord {
            scanner: Some(self.scanner.clone()),
            pools: self.estimator.to_record(),
        }
    }

    fn from_record(record: ScannerRecord, config: &PairConfig) -> RecordResult<Self> {
        let scanner = require("scanner", record.scanner)?;
        let estimator = DualPoolEstimator::from_record(record.pools, &config.estimator)?;
        Ok(Self {
            scanner,
            estimator,
            maturity_samples: config.maturity_samples,
        })
    }
}
