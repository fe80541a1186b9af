//! Absolute Signal Profile
//!
//! Learned absolute RSSI from one scanner while a device is in an area. Less
//! robust than pair deltas (transmit power and antenna orientation leak
//! straight in) but available from a single scanner, and the input to
//! multi-scanner fingerprint matching.

use alloc::string::String;

use serde::{Deserialize, Serialize};

use crate::constants::correlation::ABSOLUTE_MATURITY_SAMPLES;
use crate::correlation::estimator::{DualPoolEstimator, EstimatorConfig};
use crate::correlation::pair::ScannerRecord;
use crate::errors::{ConfigError, ConfigResult, RecordResult};
use crate::record::{require, PortableRecord};
use crate::time::Timestamp;

/// Per-entity configuration for absolute profiles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbsoluteConfig {
    /// Pool parameters
    pub estimator: EstimatorConfig,
    /// Weighted samples needed before the profile is scored
    pub maturity_samples: u64,
}

impl Default for AbsoluteConfig {
    fn default() -> Self {
        Self {
            estimator: EstimatorConfig::default(),
            maturity_samples: ABSOLUTE_MATURITY_SAMPLES,
        }
    }
}

impl AbsoluteConfig {
    /// Check parameter domains
    pub fn validate(&self) -> ConfigResult<()> {
        if self.maturity_samples == 0 {
            return Err(ConfigError::invalid("maturity_samples", 0.0, "must be >= 1"));
        }
        self.estimator.validate()
    }
}

/// Learned absolute RSSI from one scanner
#[derive(Debug, Clone, PartialEq)]
pub struct AbsoluteSignalProfile {
    scanner: String,
    estimator: DualPoolEstimator,
    maturity_samples: u64,
}

impl AbsoluteSignalProfile {
    /// Create an empty profile for `scanner`
    pub fn new(scanner: impl Into<String>, config: AbsoluteConfig) -> Self {
        Self {
            scanner: scanner.into(),
            estimator: DualPoolEstimator::new(config.estimator),
            maturity_samples: config.maturity_samples,
        }
    }

    /// Scanner id
    pub fn scanner(&self) -> &str {
        &self.scanner
    }

    /// Feed a passively observed RSSI
    pub fn update(&mut self, rssi: f64, timestamp: Option<Timestamp>) -> f64 {
        self.estimator.update(rssi, timestamp)
    }

    /// Feed a user-confirmed RSSI
    pub fn update_button(&mut self, rssi: f64, timestamp: Option<Timestamp>) -> f64 {
        self.estimator.update_button(rssi, timestamp)
    }

    /// Expected RSSI (dBm)
    pub fn expected_rssi(&self) -> f64 {
        self.estimator.estimate()
    }

    /// Variance of the expected RSSI (dB²)
    pub fn variance(&self) -> f64 {
        self.estimator.variance()
    }

    /// Weighted sample count
    pub fn sample_count(&self) -> u64 {
        self.estimator.sample_count()
    }

    /// Enough weighted samples to be scored
    pub fn is_mature(&self) -> bool {
        self.estimator.sample_count() >= self.maturity_samples
    }

    /// z-score of an observed RSSI, 0 when variance ≤ 0
    pub fn z_score(&self, observed_rssi: f64) -> f64 {
        self.estimator.z_score(observed_rssi)
    }

    /// Whether the user has confirmed this profile
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

impl PortableRecord for AbsoluteSignalProfile {
    type Record = ScannerRecord;
    type Config = AbsoluteConfig;

    fn to_record(&self) -> ScannerRecord {
        ScannerRecord {
            scanner: Some(self.scanner.clone()),
            pools: self.estimator.to_record(),
        }
    }

    fn from_record(record: ScannerRecord, config: &AbsoluteConfig) -> RecordResult<Self> {
        let scanner = require("scanner", record.scanner)?;
        let estimator = DualPoolEstimator::from_record(record.pools, &config.estimator)?;
        Ok(Self {
            scanner,
            estimator,
            maturity_samples: config.maturity_samples,
        })
    }
}
