//! Learned Correlations and Room Profiles
//!
//! ## Layers
//!
//! ```text
//! DualPoolEstimator          auto + button Kalman pools, fused
//!   ├─ PairCorrelation       expected RSSI delta between two scanners
//!   └─ AbsoluteSignalProfile expected RSSI from one scanner
//!
//! AreaProfile                per device, per area: correlations against the
//!                            primary scanner + absolute profiles
//! RoomProfile                per area, shared by all devices: every scanner
//!                            pair seen together
//! ```
//!
//! ## Scoring
//!
//! Only mature entries contribute. Their z-scores are averaged weighted by
//! sample count and mapped to a confidence (see [`crate::scoring`]). When
//! nothing mature overlaps the live readings, scores are neutral (0.5).
//!
//! ## Bounded Memory
//!
//! Profiles cap their maps and keep the entries with the highest sample
//! counts. Ties are broken by key order.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::constants::correlation::{
    ABSOLUTE_MATURITY_SAMPLES, MAX_AREA_CORRELATIONS, MAX_ROOM_PAIRS, PAIR_MATURITY_SAMPLES,
    ROOM_PAIR_MATURITY_SAMPLES,
};
use crate::errors::{ConfigError, ConfigResult};
use crate::logging::log_debug;

pub mod absolute;
pub mod area;
pub mod estimator;
pub mod pair;
pub mod room;

pub use absolute::{AbsoluteConfig, AbsoluteSignalProfile};
pub use area::{AreaProfile, AreaRecord};
pub use estimator::{DualPoolEstimator, EstimatorConfig, EstimatorRecord};
pub use pair::{PairConfig, PairCorrelation, ScannerRecord};
pub use room::{pair_key, RoomProfile, RoomRecord};

/// Profile-level configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Pool parameters shared by every entry
    pub estimator: EstimatorConfig,
    /// Maturity of area pair correlations
    pub pair_maturity_samples: u64,
    /// Maturity of absolute profiles
    pub absolute_maturity_samples: u64,
    /// Maturity of room pair deltas
    pub room_pair_maturity_samples: u64,
    /// Cap on area correlations (and on absolute profiles)
    pub max_area_correlations: usize,
    /// Cap on room pairs
    pub max_room_pairs: usize,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            estimator: EstimatorConfig::default(),
            pair_maturity_samples: PAIR_MATURITY_SAMPLES,
            absolute_maturity_samples: ABSOLUTE_MATURITY_SAMPLES,
            room_pair_maturity_samples: ROOM_PAIR_MATURITY_SAMPLES,
            max_area_correlations: MAX_AREA_CORRELATIONS,
            max_room_pairs: MAX_ROOM_PAIRS,
        }
    }
}

impl CorrelationConfig {
    /// Set pool parameters
    pub fn with_estimator(mut self, estimator: EstimatorConfig) -> Self {
        self.estimator = estimator;
        self
    }

    /// Set all three maturity thresholds
    pub fn with_maturity(mut self, pair: u64, absolute: u64, room_pair: u64) -> Self {
        self.pair_maturity_samples = pair;
        self.absolute_maturity_samples = absolute;
        self.room_pair_maturity_samples = room_pair;
        self
    }

    /// Set both eviction caps
    pub fn with_caps(mut self, area_correlations: usize, room_pairs: usize) -> Self {
        self.max_area_correlations = area_correlations;
        self.max_room_pairs = room_pairs;
        self
    }

    /// Check parameter domains
    pub fn validate(&self) -> ConfigResult<()> {
        self.area_pair().validate()?;
        self.room_pair().validate()?;
        self.absolute().validate()?;
        if self.max_area_correlations == 0 {
            return Err(ConfigError::invalid("max_area_correlations", 0.0, "must be >= 1"));
        }
        if self.max_room_pairs == 0 {
            return Err(ConfigError::invalid("max_room_pairs", 0.0, "must be >= 1"));
        }
        Ok(())
    }

    /// Configuration for correlations inside an [`AreaProfile`]
    pub fn area_pair(&self) -> PairConfig {
        PairConfig {
            estimator: self.estimator,
            maturity_samples: self.pair_maturity_samples,
        }
    }

    /// Configuration for pairs inside a [`RoomProfile`]
    pub fn room_pair(&self) -> PairConfig {
        PairConfig {
            estimator: self.estimator,
            maturity_samples: self.room_pair_maturity_samples,
        }
    }

    /// Configuration for absolute profiles
    pub fn absolute(&self) -> AbsoluteConfig {
        AbsoluteConfig {
            estimator: self.estimator,
            maturity_samples: self.absolute_maturity_samples,
        }
    }
}

/// Drop the lowest-count entries until at most `capacity` remain
pub(crate) fn evict_to_capacity<V>(
    entries: &mut BTreeMap<String, V>,
    capacity: usize,
    sample_count: impl Fn(&V) -> u64,
) {
    if entries.len() <= capacity {
        return;
    }

    let mut ranked: Vec<(u64, String)> = entries
        .iter()
        .map(|(key, value)| (sample_count(value), key.clone()))
        .collect();
    // Stable: equal counts keep key order
    ranked.sort_by(|a, b| b.0.cmp(&a.0));

    for (count, key) in ranked.into_iter().skip(capacity) {
        log_debug!("Evicting {} ({} samples)", key, count);
        entries.remove(&key);
    }
}
