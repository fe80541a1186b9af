//! Per-Device Area Profile
//!
//! Everything learned about one device in one area:
//!
//! - **correlations**: expected delta between the device's primary scanner
//!   and each other scanner
//! - **absolute profiles**: expected absolute RSSI per scanner
//!
//! Both maps are capped. After an update, only the entries with the highest
//! sample counts survive, since reliability grows with sample count.
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use roomprint_core::AreaProfile;
//!
//! let mut profile = AreaProfile::new("kitchen");
//! let others: BTreeMap<String, f64> = [("hall".to_string(), -75.0)].into_iter().collect();
//! for _ in 0..30 {
//!     profile.update(-60.0, &others, Some("kitchen_scanner"));
//! }
//! let scores = profile.get_z_scores(-60.0, &others);
//! assert_eq!(scores.len(), 1);
//! assert_eq!(scores[0].0, "hall");
//! ```

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::correlation::absolute::AbsoluteSignalProfile;
use crate::correlation::pair::{PairCorrelation, ScannerRecord};
use crate::correlation::{evict_to_capacity, CorrelationConfig};
use crate::errors::RecordResult;
use crate::record::{require, PortableRecord};
use crate::scoring;
use crate::time::Timestamp;

/// Persisted area profile
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AreaRecord {
    /// Area id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_id: Option<String>,
    /// One entry per pair correlation
    #[serde(default)]
    pub correlations: Vec<ScannerRecord>,
    /// One entry per absolute profile
    #[serde(default)]
    pub absolute_profiles: Vec<ScannerRecord>,
}

/// Learned fingerprint of one device in one area
#[derive(Debug, Clone, PartialEq)]
pub struct AreaProfile {
    area_id: String,
    correlations: BTreeMap<String, PairCorrelation>,
    absolute_profiles: BTreeMap<String, AbsoluteSignalProfile>,
    config: CorrelationConfig,
}

impl AreaProfile {
    /// Empty profile with default configuration
    pub fn new(area_id: impl Into<String>) -> Self {
        Self::with_config(area_id, CorrelationConfig::default())
    }

    /// Empty profile with explicit configuration
    pub fn with_config(area_id: impl Into<String>, config: CorrelationConfig) -> Self {
        Self {
            area_id: area_id.into(),
            correlations: BTreeMap::new(),
            absolute_profiles: BTreeMap::new(),
            config,
        }
    }

    /// Area id
    pub fn area_id(&self) -> &str {
        &self.area_id
    }

    /// Learn from a passive observation
    ///
    /// `other_readings` maps scanner id to RSSI. Each contributes the delta
    /// `primary_rssi - reading` to its correlation and its absolute reading to
    /// its absolute profile. When `primary_scanner` is known, the primary
    /// reading is also learned as an absolute profile. Non-finite readings are
    /// skipped.
    pub fn update(
        &mut self,
        primary_rssi: f64,
        other_readings: &BTreeMap<String, f64>,
        primary_scanner: Option<&str>,
    ) {
        self.learn(primary_rssi, other_readings, primary_scanner, None, false);
    }

    /// Learn from a user-confirmed observation
    pub fn update_button(
        &mut self,
        primary_rssi: f64,
        other_readings: &BTreeMap<String, f64>,
        primary_scanner: Option<&str>,
    ) {
        self.learn(primary_rssi, other_readings, primary_scanner, None, true);
    }

    /// [`update`](Self::update) stamped with the observation time
    ///
    /// The time feeds each pool's dt and is kept in its record.
    pub fn update_at(
        &mut self,
        primary_rssi: f64,
        other_readings: &BTreeMap<String, f64>,
        primary_scanner: Option<&str>,
        timestamp: Option<Timestamp>,
    ) {
        self.learn(primary_rssi, other_readings, primary_scanner, timestamp, false);
    }

    /// [`update_button`](Self::update_button) stamped with the observation time
    pub fn update_button_at(
        &mut self,
        primary_rssi: f64,
        other_readings: &BTreeMap<String, f64>,
        primary_scanner: Option<&str>,
        timestamp: Option<Timestamp>,
    ) {
        self.learn(primary_rssi, other_readings, primary_scanner, timestamp, true);
    }

    fn learn(
        &mut self,
        primary_rssi: f64,
        other_readings: &BTreeMap<String, f64>,
        primary_scanner: Option<&str>,
        timestamp: Option<Timestamp>,
        button: bool,
    ) {
        if !primary_rssi.is_finite() {
            return;
        }

        let pair_config = self.config.area_pair();
        let absolute_config = self.config.absolute();

        for (scanner, &reading) in other_readings {
            if !reading.is_finite() || Some(scanner.as_str()) == primary_scanner {
                continue;
            }

            let delta = primary_rssi - reading;
            let pair = self
                .correlations
                .entry(scanner.clone())
                .or_insert_with(|| PairCorrelation::new(scanner.clone(), pair_config));
            let absolute = self
                .absolute_profiles
                .entry(scanner.clone())
                .or_insert_with(|| AbsoluteSignalProfile::new(scanner.clone(), absolute_config));

            if button {
                pair.update_button(delta, timestamp);
                absolute.update_button(reading, timestamp);
            } else {
                pair.update(delta, timestamp);
                absolute.update(reading, timestamp);
            }
        }

        if let Some(primary) = primary_scanner {
            let absolute = self
                .absolute_profiles
                .entry(primary.to_string())
                .or_insert_with(|| AbsoluteSignalProfile::new(primary, absolute_config));
            if button {
                absolute.update_button(primary_rssi, timestamp);
            } else {
                absolute.update(primary_rssi, timestamp);
            }
        }

        self.enforce_caps();
    }

    fn enforce_caps(&mut self) {
        let cap = self.config.max_area_correlations;
        evict_to_capacity(&mut self.correlations, cap, PairCorrelation::sample_count);
        evict_to_capacity(&mut self.absolute_profiles, cap, AbsoluteSignalProfile::sample_count);
    }

    /// Pair z-scores for every mature tracked scanner in `other_readings`
    ///
    /// Immature and unknown scanners are skipped.
    pub fn get_z_scores(
        &self,
        primary_rssi: f64,
        other_readings: &BTreeMap<String, f64>,
    ) -> Vec<(String, f64)> {
        self.get_weighted_z_scores(primary_rssi, other_readings)
            .into_iter()
            .map(|(scanner, z, _)| (scanner, z))
            .collect()
    }

    /// Like [`get_z_scores`](Self::get_z_scores) with each pair's sample count
    ///
    /// Empty when `primary_rssi` is not finite. Non-finite readings are skipped.
    pub fn get_weighted_z_scores(
        &self,
        primary_rssi: f64,
        other_readings: &BTreeMap<String, f64>,
    ) -> Vec<(String, f64, u64)> {
        if !primary_rssi.is_finite() {
            return Vec::new();
        }
        other_readings
            .iter()
            .filter_map(|(scanner, &reading)| {
                if !reading.is_finite() {
                    return None;
                }
                let pair = self.correlations.get(scanner)?;
                if !pair.is_mature() {
                    return None;
                }
                let z = pair.z_score(primary_rssi - reading);
                Some((scanner.clone(), z, pair.sample_count()))
            })
            .collect()
    }

    /// Absolute z-scores for every mature tracked scanner in `readings`
    ///
    /// Non-finite readings are skipped.
    pub fn get_absolute_z_scores(&self, readings: &BTreeMap<String, f64>) -> Vec<(String, f64, u64)> {
        readings
            .iter()
            .filter(|(_, reading)| reading.is_finite())
            .filter_map(|(scanner, &reading)| {
                let profile = self.absolute_profiles.get(scanner)?;
                if !profile.is_mature() {
                    return None;
                }
                Some((scanner.clone(), profile.z_score(reading), profile.sample_count()))
            })
            .collect()
    }

    /// Confidence in [0, 1] from the weighted pair z-scores
    ///
    /// 0.5 when no mature correlation overlaps the readings.
    pub fn match_score(&self, primary_rssi: f64, other_readings: &BTreeMap<String, f64>) -> f64 {
        scoring::match_confidence(
            self.get_weighted_z_scores(primary_rssi, other_readings)
                .into_iter()
                .map(|(_, z, n)| (z, n)),
        )
    }

    /// Whether any contained pool holds user confirmations
    pub fn has_button_training(&self) -> bool {
        self.correlations.values().any(PairCorrelation::has_button_samples)
            || self
                .absolute_profiles
                .values()
                .any(AbsoluteSignalProfile::has_button_samples)
    }

    /// Number of tracked correlations
    pub fn correlation_count(&self) -> usize {
        self.correlations.len()
    }

    /// Number of tracked absolute profiles
    pub fn absolute_profile_count(&self) -> usize {
        self.absolute_profiles.len()
    }

    /// Correlation against `scanner`
    pub fn correlation(&self, scanner: &str) -> Option<&PairCorrelation> {
        self.correlations.get(scanner)
    }

    /// Absolute profile for `scanner`
    pub fn absolute_profile(&self, scanner: &str) -> Option<&AbsoluteSignalProfile> {
        self.absolute_profiles.get(scanner)
    }

    /// All correlations, ordered by scanner id
    pub fn correlations(&self) -> impl Iterator<Item = &PairCorrelation> {
        self.correlations.values()
    }

    /// All absolute profiles, ordered by scanner id
    pub fn absolute_profiles(&self) -> impl Iterator<Item = &AbsoluteSignalProfile> {
        self.absolute_profiles.values()
    }

    /// Forget every user confirmation, keep passive learning
    pub fn reset_training(&mut self) {
        self.correlations.values_mut().for_each(PairCorrelation::reset_training);
        self.absolute_profiles
            .values_mut()
            .for_each(AbsoluteSignalProfile::reset_training);
    }

    /// Widen every pool's variance ahead of a training session
    pub fn begin_training_session(&mut self) {
        self.correlations
            .values_mut()
            .for_each(PairCorrelation::begin_training_session);
        self.absolute_profiles
            .values_mut()
            .for_each(AbsoluteSignalProfile::begin_training_session);
    }
}

impl PortableRecord for AreaProfile {
    type Record = AreaRecord;
    type Config = CorrelationConfig;

    fn to_record(&self) -> AreaRecord {
        AreaRecord {
            area_id: Some(self.area_id.clone()),
            correlations: self.correlations.values().map(PairCorrelation::to_record).collect(),
            absolute_profiles: self
                .absolute_profiles
                .values()
                .map(AbsoluteSignalProfile::to_record)
                .collect(),
        }
    }

    fn from_record(record: AreaRecord, config: &CorrelationConfig) -> RecordResult<Self> {
        let pair_config = config.area_pair();
        let absolute_config = config.absolute();

        let mut correlations = BTreeMap::new();
        for entry in record.correlations {
            let pair = PairCorrelation::from_record(entry, &pair_config)?;
            correlations.insert(pair.scanner().to_string(), pair);
        }

        let mut absolute_profiles = BTreeMap::new();
        for entry in record.absolute_profiles {
            let profile = AbsoluteSignalProfile::from_record(entry, &absolute_config)?;
            absolute_profiles.insert(profile.scanner().to_string(), profile);
        }

        let mut profile = Self {
            area_id: require("area_id", record.area_id)?,
            correlations,
            absolute_profiles,
            config: *config,
        };
        profile.enforce_caps();
        Ok(profile)
    }
}
