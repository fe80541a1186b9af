//! Signal Filters
//!
//! Recursive estimators that turn noisy, irregularly timed RSSI samples into
//! stable estimates with calibrated uncertainty.
//!
//! ## Scalar Filters
//!
//! | Filter | Model | Strength |
//! |--------|-------|----------|
//! | [`Kalman1D`] | Random walk, time-scaled process noise | Calibrated variance, adaptive noise |
//! | [`AdaptiveEma`] | Exponential smoothing + CUSUM | Detects abrupt moves |
//!
//! Both implement [`ScalarFilter`]. A host that picks the filter at runtime
//! builds a [`SignalFilter`] from a tagged [`FilterConfig`]:
//!
//! ```rust
//! use roomprint_core::filters::{FilterConfig, FilterKind, ScalarFilter, SignalFilter};
//!
//! let kind: FilterKind = "adaptive_ema".parse().unwrap();
//! let mut filter = SignalFilter::from_config(&FilterConfig::default_for(kind)).unwrap();
//! filter.update(-70.0, Some(0.0));
//! assert_eq!(filter.kind(), FilterKind::AdaptiveEma);
//! assert_eq!(filter.estimate(), -70.0);
//! ```
//!
//! ## Vector Filter
//!
//! [`MultiScannerFilter`] tracks all scanners of one device jointly with an
//! Unscented Kalman Filter and matches the result against learned fingerprints.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, ConfigResult};
use crate::time::Timestamp;

pub mod ema;
pub mod kalman;
pub mod ukf;

pub use ema::{AdaptiveEma, EmaConfig, EmaUpdate};
pub use kalman::{AdaptiveNoiseConfig, FilterState, Kalman1D, KalmanConfig, KalmanRecord};
pub use ukf::{FingerprintMatch, MultiScannerFilter, UkfConfig};

/// Single-value recursive estimator
pub trait ScalarFilter {
    /// Variant tag
    fn kind(&self) -> FilterKind;

    /// Incorporate a measurement and return the new estimate
    fn update(&mut self, measurement: f64, timestamp: Option<Timestamp>) -> f64;

    /// Current estimate
    fn estimate(&self) -> f64;

    /// Current variance
    fn variance(&self) -> f64;

    /// Samples absorbed
    fn sample_count(&self) -> u64;

    /// Whether the estimate is meaningful
    fn is_initialized(&self) -> bool;

    /// Return to the uninitialised state
    fn reset(&mut self);

    /// |observed - estimate| / σ, 0 when uninitialised or variance ≤ 0
    fn z_score(&self, observed: f64) -> f64 {
        if !self.is_initialized() {
            return 0.0;
        }
        crate::scoring::z_score(observed, self.estimate(), self.variance())
    }
}

/// Filter variant tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// [`Kalman1D`]
    Kalman,
    /// [`AdaptiveEma`]
    AdaptiveEma,
}

impl FilterKind {
    /// Tag as used in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::Kalman => "kalman",
            FilterKind::AdaptiveEma => "adaptive_ema",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kalman" => Ok(FilterKind::Kalman),
            "adaptive_ema" => Ok(FilterKind::AdaptiveEma),
            _ => Err(ConfigError::UnknownFilterKind),
        }
    }
}

/// Tagged filter configuration
///
/// Serialises as `{"kind": "kalman", "process_noise": ..., ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterConfig {
    /// Kalman 1D parameters
    Kalman(KalmanConfig),
    /// Adaptive EMA parameters
    AdaptiveEma(EmaConfig),
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig::Kalman(KalmanConfig::default())
    }
}

impl FilterConfig {
    /// Documented defaults for a variant
    pub fn default_for(kind: FilterKind) -> Self {
        match kind {
            FilterKind::Kalman => FilterConfig::Kalman(KalmanConfig::default()),
            FilterKind::AdaptiveEma => FilterConfig::AdaptiveEma(EmaConfig::default()),
        }
    }

    /// Variant tag
    pub fn kind(&self) -> FilterKind {
        match self {
            FilterConfig::Kalman(_) => FilterKind::Kalman,
            FilterConfig::AdaptiveEma(_) => FilterKind::AdaptiveEma,
        }
    }

    /// Check parameter domains
    pub fn validate(&self) -> ConfigResult<()> {
        match self {
            FilterConfig::Kalman(config) => config.validate(),
            FilterConfig::AdaptiveEma(config) => config.validate(),
        }
    }
}

/// Runtime-selected scalar filter
#[derive(Debug, Clone)]
pub enum SignalFilter {
    /// Kalman 1D
    Kalman(Kalman1D),
    /// Adaptive EMA
    AdaptiveEma(AdaptiveEma),
}

impl SignalFilter {
    /// Validate `config` and build the matching filter
    pub fn from_config(config: &FilterConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(match config {
            FilterConfig::Kalman(c) => SignalFilter::Kalman(Kalman1D::new(*c)),
            FilterConfig::AdaptiveEma(c) => SignalFilter::AdaptiveEma(AdaptiveEma::new(*c)),
        })
    }

    /// Full state snapshot
    pub fn state(&self) -> &FilterState {
        match self {
            SignalFilter::Kalman(f) => f.state(),
            SignalFilter::AdaptiveEma(f) => f.state(),
        }
    }
}

impl ScalarFilter for Kalman1D {
    fn kind(&self) -> FilterKind {
        FilterKind::Kalman
    }

    fn update(&mut self, measurement: f64, timestamp: Option<Timestamp>) -> f64 {
        Kalman1D::update(self, measurement, timestamp)
    }

    fn estimate(&self) -> f64 {
        Kalman1D::estimate(self)
    }

    fn variance(&self) -> f64 {
        Kalman1D::variance(self)
    }

    fn sample_count(&self) -> u64 {
        Kalman1D::sample_count(self)
    }

    fn is_initialized(&self) -> bool {
        Kalman1D::is_initialized(self)
    }

    fn reset(&mut self) {
        Kalman1D::reset(self)
    }
}

impl ScalarFilter for AdaptiveEma {
    fn kind(&self) -> FilterKind {
        FilterKind::AdaptiveEma
    }

    fn update(&mut self, measurement: f64, timestamp: Option<Timestamp>) -> f64 {
        AdaptiveEma::update(self, measurement, timestamp)
    }

    fn estimate(&self) -> f64 {
        AdaptiveEma::estimate(self)
    }

    fn variance(&self) -> f64 {
        AdaptiveEma::variance(self)
    }

    fn sample_count(&self) -> u64 {
        AdaptiveEma::sample_count(self)
    }

    fn is_initialized(&self) -> bool {
        AdaptiveEma::is_initialized(self)
    }

    fn reset(&mut self) {
        AdaptiveEma::reset(self)
    }
}

macro_rules! dispatch {
    ($self:ident, $f:ident => $body:expr) => {
        match $self {
            SignalFilter::Kalman($f) => $body,
            SignalFilter::AdaptiveEma($f) => $body,
        }
    };
}

impl ScalarFilter for SignalFilter {
    fn kind(&self) -> FilterKind {
        dispatch!(self, f => ScalarFilter::kind(f))
    }

    fn update(&mut self, measurement: f64, timestamp: Option<Timestamp>) -> f64 {
        dispatch!(self, f => ScalarFilter::update(f, measurement, timestamp))
    }

    fn estimate(&self) -> f64 {
        dispatch!(self, f => ScalarFilter::estimate(f))
    }

    fn variance(&self) -> f64 {
        dispatch!(self, f => ScalarFilter::variance(f))
    }

    fn sample_count(&self) -> u64 {
        dispatch!(self, f => ScalarFilter::sample_count(f))
    }

    fn is_initialized(&self) -> bool {
        dispatch!(self, f => ScalarFilter::is_initialized(f))
    }

    fn reset(&mut self) {
        dispatch!(self, f => ScalarFilter::reset(f))
    }
}
