//! Device-Independent Room Profile
//!
//! Learns, per area, the RSSI delta of every scanner pair seen together.
//! Deltas between two fixed scanners depend on where the transmitter sits but
//! hardly on which device transmits, so one profile is shared by all devices.
//!
//! ## Pair Keys
//!
//! `(A, B)` and `(B, A)` are the same pair. The key joins both ids in
//! lexicographic order and the learned delta is always `r[lo] - r[hi]`:
//! ```text
//! readings {S2: -70, S1: -60}  →  key "S1|S2", delta -60 - (-70) = 10
//! ```
//!
//! ## Match Score
//!
//! ```text
//! z̄ = Σ(zᵢ·nᵢ) / Σnᵢ           over mature pairs present in the readings
//! score = 1 / (1 + (z̄ / 2)²)    0.5 when no mature pair overlaps
//! ```
//!
//! ## Eviction
//!
//! Capped at 20 pairs; the highest sample counts survive. Button-trained
//! pairs get no bonus beyond the weight their samples already carry.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::correlation::pair::{PairCorrelation, ScannerRecord};
use crate::correlation::{evict_to_capacity, CorrelationConfig};
use crate::errors::RecordResult;
use crate::record::{require, PortableRecord};
use crate::scoring;
use crate::time::Timestamp;

/// Canonical key for an unordered scanner pair
///
/// `None` when both ids are equal.
pub fn pair_key(a: &str, b: &str) -> Option<String> {
    match a.cmp(b) {
        core::cmp::Ordering::Less => Some(format!("{}|{}", a, b)),
        core::cmp::Ordering::Greater => Some(format!("{}|{}", b, a)),
        core::cmp::Ordering::Equal => None,
    }
}

/// Persisted room profile
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoomRecord {
    /// Area id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_id: Option<String>,
    /// One entry per pair, `scanner` holding the pair key
    #[serde(default)]
    pub scanner_pairs: Vec<ScannerRecord>,
}

/// Learned pairwise deltas for one area, shared across devices
#[derive(Debug, Clone, PartialEq)]
pub struct RoomProfile {
    area_id: String,
    scanner_pairs: BTreeMap<String, PairCorrelation>,
    config: CorrelationConfig,
}

impl RoomProfile {
    /// Empty profile with default configuration
    pub fn new(area_id: impl Into<String>) -> Self {
        Self::with_config(area_id, CorrelationConfig::default())
    }

    /// Empty profile with explicit configuration
    pub fn with_config(area_id: impl Into<String>, config: CorrelationConfig) -> Self {
        Self {
            area_id: area_id.into(),
            scanner_pairs: BTreeMap::new(),
            config,
        }
    }

    /// Area id
    pub fn area_id(&self) -> &str {
        &self.area_id
    }

    /// Learn every pair in a passive observation
    ///
    /// Fewer than two finite readings learn nothing.
    pub fn update(&mut self, readings: &BTreeMap<String, f64>) {
        self.learn(readings, None, false);
    }

    /// Learn every pair in a user-confirmed observation
    pub fn update_button(&mut self, readings: &BTreeMap<String, f64>) {
        self.learn(readings, None, true);
    }

    /// [`update`](Self::update) stamped with the observation time
    pub fn update_at(&mut self, readings: &BTreeMap<String, f64>, timestamp: Option<Timestamp>) {
        self.learn(readings, timestamp, false);
    }

    /// [`update_button`](Self::update_button) stamped with the observation time
    pub fn update_button_at(
        &mut self,
        readings: &BTreeMap<String, f64>,
        timestamp: Option<Timestamp>,
    ) {
        self.learn(readings, timestamp, true);
    }

    fn learn(
        &mut self,
        readings: &BTreeMap<String, f64>,
        timestamp: Option<Timestamp>,
        button: bool,
    ) {
        let config = self.config.room_pair();

        for (key, delta) in pair_deltas(readings) {
            let pair = self
                .scanner_pairs
                .entry(key)
                .or_insert_with_key(|key| PairCorrelation::new(key.clone(), config));
            if button {
                pair.update_button(delta, timestamp);
            } else {
                pair.update(delta, timestamp);
            }
        }

        evict_to_capacity(
            &mut self.scanner_pairs,
            self.config.max_room_pairs,
            PairCorrelation::sample_count,
        );
    }

    /// z-score and sample count for every mature pair present in `readings`
    pub fn get_weighted_z_scores(&self, readings: &BTreeMap<String, f64>) -> Vec<(String, f64, u64)> {
        pair_deltas(readings)
            .into_iter()
            .filter_map(|(key, delta)| {
                let pair = self.scanner_pairs.get(&key)?;
                if !pair.is_mature() {
                    return None;
                }
                let z = pair.z_score(delta);
                Some((key, z, pair.sample_count()))
            })
            .collect()
    }

    /// Confidence in [0, 1] that `readings` were taken in this room
    ///
    /// 0.5 when no mature pair overlaps the readings.
    pub fn get_match_score(&self, readings: &BTreeMap<String, f64>) -> f64 {
        scoring::match_confidence(
            self.get_weighted_z_scores(readings)
                .into_iter()
                .map(|(_, z, n)| (z, n)),
        )
    }

    /// Number of tracked pairs
    pub fn pair_count(&self) -> usize {
        self.scanner_pairs.len()
    }

    /// Pair between `a` and `b`, in either order
    pub fn pair(&self, a: &str, b: &str) -> Option<&PairCorrelation> {
        self.scanner_pairs.get(&pair_key(a, b)?)
    }

    /// All pairs, ordered by key
    pub fn pairs(&self) -> impl Iterator<Item = &PairCorrelation> {
        self.scanner_pairs.values()
    }

    /// Whether any pair holds user confirmations
    pub fn has_button_training(&self) -> bool {
        self.scanner_pairs.values().any(PairCorrelation::has_button_samples)
    }

    /// Forget every user confirmation, keep passive learning
    pub fn reset_training(&mut self) {
        self.scanner_pairs
            .values_mut()
            .for_each(PairCorrelation::reset_training);
    }

    /// Widen every pool's variance ahead of a training session
    pub fn begin_training_session(&mut self) {
        self.scanner_pairs
            .values_mut()
            .for_each(PairCorrelation::begin_training_session);
    }
}

/// Canonical key and `r[lo] - r[hi]` for every pair of finite readings
fn pair_deltas(readings: &BTreeMap<String, f64>) -> Vec<(String, f64)> {
    // BTreeMap iterates in key order, so `lo` always precedes `hi`
    let finite: Vec<(&String, f64)> = readings
        .iter()
        .filter(|(_, v)| v.is_finite())
        .map(|(k, v)| (k, *v))
        .collect();

    let mut deltas = Vec::new();
    for (i, &(lo, lo_rssi)) in finite.iter().enumerate() {
        for &(hi, hi_rssi) in &finite[i + 1..] {
            deltas.push((format!("{}|{}", lo, hi), lo_rssi - hi_rssi));
        }
    }
    deltas
}

impl PortableRecord for RoomProfile {
    type Record = RoomRecord;
    type Config = CorrelationConfig;

    fn to_record(&self) -> RoomRecord {
        RoomRecord {
            area_id: Some(self.area_id.clone()),
            scanner_pairs: self.scanner_pairs.values().map(PairCorrelation::to_record).collect(),
        }
    }

    fn from_record(record: RoomRecord, config: &CorrelationConfig) -> RecordResult<Self> {
        let pair_config = config.room_pair();

        let mut scanner_pairs = BTreeMap::new();
        for entry in record.scanner_pairs {
            let pair = PairCorrelation::from_record(entry, &pair_config)?;
            scanner_pairs.insert(pair.scanner().to_string(), pair);
        }

        let mut profile = Self {
            area_id: require("area_id", record.area_id)?,
            scanner_pairs,
            config: *config,
        };
        evict_to_capacity(
            &mut profile.scanner_pairs,
            config.max_room_pairs,
            PairCorrelation::sample_count,
        );
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn pair_key_is_order_independent() {
        assert_eq!(pair_key("b", "a"), pair_key("a", "b"));
        assert_eq!(pair_key("a", "b").as_deref(), Some("a|b"));
        assert_eq!(pair_key("a", "a"), None);
    }

    #[test]
    fn delta_uses_lexicographic_order() {
        let mut room = RoomProfile::new("lounge");
        room.update(&readings(&[("S2", -70.0), ("S1", -60.0)]));
        assert_eq!(room.pair_count(), 1);
        assert_eq!(room.pair("S2", "S1").unwrap().estimate(), 10.0);
        assert_eq!(room.pair("S1", "S2").unwrap().scanner(), "S1|S2");
    }

    #[test]
    fn single_reading_makes_no_pairs() {
        let mut room = RoomProfile::new("lounge");
        room.update(&readings(&[("S1", -60.0)]));
        room.update(&readings(&[("S1", -60.0), ("S2", f64::NAN)]));
        assert_eq!(room.pair_count(), 0);
    }

    #[test]
    fn three_scanners_make_three_pairs() {
        let mut room = RoomProfile::new("lounge");
        room.update(&readings(&[("A", -60.0), ("B", -65.0), ("C", -80.0)]));
        assert_eq!(room.pair_count(), 3);
        assert_eq!(room.pair("A", "C").unwrap().estimate(), 20.0);
        assert_eq!(room.pair("C", "B").unwrap().estimate(), 15.0);
    }

    #[test]
    fn match_score_scenario() {
        let mut room = RoomProfile::new("lounge");
        let trained = readings(&[("S1", -60.0), ("S2", -70.0)]);
        for _ in 0..50 {
            room.update(&trained);
        }

        let same = room.get_match_score(&trained);
        let different = room.get_match_score(&readings(&[("S1", -40.0), ("S2", -90.0)]));
        assert!(same > 0.7);
        assert!(different < same);
    }

    #[test]
    fn neutral_without_mature_overlap() {
        let mut room = RoomProfile::new("lounge");
        let trained = readings(&[("S1", -60.0), ("S2", -70.0)]);
        for _ in 0..19 {
            room.update(&trained);
        }
        assert_eq!(room.get_match_score(&trained), 0.5);

        room.update(&trained);
        assert!(room.get_match_score(&trained) > 0.5);
        assert_eq!(room.get_match_score(&readings(&[("S3", -50.0), ("S4", -50.0)])), 0.5);
    }

    #[test]
    fn non_finite_readings_never_score() {
        let mut room = RoomProfile::new("den");
        for _ in 0..20 {
            room.update(&readings(&[("a", -60.0), ("b", -75.0)]));
        }
        assert!(room.get_match_score(&readings(&[("a", -60.0), ("b", -40.0)])) < 0.01);
        assert_eq!(room.get_match_score(&readings(&[("a", f64::NAN), ("b", -40.0)])), 0.5);
        assert_eq!(room.get_match_score(&readings(&[("a", -60.0), ("b", f64::INFINITY)])), 0.5);
        assert!(room
            .get_weighted_z_scores(&readings(&[("a", f64::NEG_INFINITY), ("b", -75.0)]))
            .is_empty());
    }

    #[test]
    fn timestamps_reach_pair_pools() {
        let mut room = RoomProfile::new("den");
        room.update_at(&readings(&[("a", -60.0), ("b", -75.0)]), Some(10.0));
        room.update_at(&readings(&[("a", -61.0), ("b", -74.0)]), Some(25.0));
        room.update_button_at(&readings(&[("a", -60.0), ("b", -75.0)]), Some(40.0));

        let pools = room.pair("a", "b").unwrap().estimator();
        assert_eq!(pools.auto().state().first_sample_time, Some(10.0));
        assert_eq!(pools.auto().state().last_sample_time, Some(25.0));
        assert_eq!(pools.button().state().last_sample_time, Some(40.0));

        let restored = RoomProfile::from_portable_record(&room.to_portable_record()).unwrap();
        assert_eq!(restored, room);
    }

    #[test]
    fn eviction_caps_pairs() {
        let mut room = RoomProfile::new("lounge");
        // 7 scanners → 21 pairs, one over the cap
        let all = readings(&[
            ("a", -50.0),
            ("b", -55.0),
            ("c", -60.0),
            ("d", -65.0),
            ("e", -70.0),
            ("f", -75.0),
            ("g", -80.0),
        ]);
        for _ in 0..5 {
            room.update(&readings(&[("a", -50.0), ("b", -55.0)]));
        }
        room.update(&all);
        assert_eq!(room.pair_count(), 20);
        assert_eq!(room.pair("a", "b").unwrap().sample_count(), 6);
    }

    #[test]
    fn button_training_and_reset() {
        let mut room = RoomProfile::new("lounge");
        let trained = readings(&[("S1", -60.0), ("S2", -70.0)]);
        room.update(&trained);
        assert!(!room.has_button_training());
        room.update_button(&trained);
        assert!(room.has_button_training());
        room.reset_training();
        assert!(!room.has_button_training());
    }

    #[test]
    fn record_round_trip_is_exact() {
        let mut room = RoomProfile::new("lounge");
        for i in 0..25 {
            let jitter = (i % 3) as f64 * 1.1;
            room.update(&readings(&[("S1", -60.0 - jitter), ("S2", -70.0 + jitter), ("S3", -82.5)]));
        }
        room.update_button(&readings(&[("S1", -61.0), ("S3", -80.0)]));

        let restored = RoomProfile::from_portable_record(&room.to_portable_record()).unwrap();
        assert_eq!(restored, room);
        assert_eq!(restored.has_button_training(), room.has_button_training());
        for pair in room.pairs() {
            let key = pair.scanner();
            let (a, b) = key.split_once('|').unwrap();
            assert_eq!(restored.pair(a, b).unwrap().is_mature(), pair.is_mature());
        }
    }
}
