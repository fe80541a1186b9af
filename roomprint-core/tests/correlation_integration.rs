//! Integration tests for learned correlations and room profiles
//!
//! Covers:
//! - Maturity gating and its monotonicity
//! - Weighting of user confirmations against passive learning
//! - Bounded memory under many scanners
//! - Area and room discrimination in a simulated house

#![cfg(test)]

mod common;

use roomprint_core::correlation::{EstimatorConfig, PairCorrelation};
use roomprint_core::{AreaProfile, CorrelationConfig, DualPoolEstimator, ProfileStore, RoomProfile};

use common::generators::RssiGenerator;
use common::readings;
use common::scenarios::{room_pattern, strongest, trained_area, trained_room, ROOMS};

#[test]
fn maturity_never_reverts() {
    let mut generator = RssiGenerator::new(3, room_pattern("kitchen"), 3.0);
    let mut profile = AreaProfile::new("kitchen");

    let mut was_mature = false;
    for step in 0..60 {
        let mut sample = generator.sample();
        let primary = sample.remove("kitchen").unwrap();
        profile.update(primary, &sample, Some("kitchen"));

        let hall = profile.correlation("hall").unwrap();
        if was_mature {
            assert!(hall.is_mature(), "reverted to immature at step {}", step);
        }
        was_mature = hall.is_mature();
    }
    assert!(was_mature);
    assert_eq!(profile.correlation("hall").unwrap().sample_count(), 60);
}

#[test]
fn immature_profile_scores_neutral() {
    let profile = trained_area("hall", 10, 1);
    let sample = readings(&[("kitchen", -70.0), ("bedroom", -66.0)]);
    assert_eq!(profile.match_score(-50.0, &sample), 0.5);
    assert!(profile.get_z_scores(-50.0, &sample).is_empty());
}

#[test]
fn confirmations_count_double() {
    let mut estimator = DualPoolEstimator::default();
    for _ in 0..50 {
        estimator.update(0.0, None);
    }
    for _ in 0..25 {
        estimator.update_button(10.0, None);
    }

    // 50 passive vs 25 × 2 confirmed
    assert_within_tolerance!(estimator.estimate(), 5.0, 1e-9);
    assert_eq!(estimator.sample_count(), 100);

    estimator.reset_training();
    assert_eq!(estimator.estimate(), 0.0);
    assert_eq!(estimator.sample_count(), 50);
}

#[test]
fn heavier_button_weight_pulls_harder() {
    let heavy = EstimatorConfig::default().with_button_weight(4);
    let mut light = DualPoolEstimator::default();
    let mut strong = DualPoolEstimator::new(heavy);
    for _ in 0..40 {
        light.update(-10.0, None);
        strong.update(-10.0, None);
    }
    for _ in 0..10 {
        light.update_button(-2.0, None);
        strong.update_button(-2.0, None);
    }
    assert!(strong.estimate() > light.estimate());
    assert!(strong.estimate() < -2.0);
}

#[test]
fn confirmations_mature_a_pair_faster() {
    let config = CorrelationConfig::default().area_pair();
    let mut pair = PairCorrelation::new("hall", config);
    for _ in 0..15 {
        pair.update_button(16.0, None);
    }
    assert!(pair.is_mature());
    assert!(pair.has_button_samples());
}

#[test]
fn new_training_session_regains_influence() {
    let mut pair = PairCorrelation::new("hall", CorrelationConfig::default().area_pair());
    for _ in 0..200 {
        pair.update(10.0, None);
    }
    let settled = pair.variance();

    pair.begin_training_session();
    assert!(pair.variance() > settled);
    assert_eq!(pair.estimate(), 10.0);
    assert_eq!(pair.sample_count(), 200);

    let fresh = pair.update(20.0, None);
    assert!(fresh > 11.0);
}

#[test]
fn many_scanners_stay_within_caps() {
    let mut profile = AreaProfile::new("atrium");
    let mut room = RoomProfile::new("atrium");
    let ids: Vec<String> = (0..40).map(|i| format!("scanner-{:02}", i)).collect();

    for step in 0..200 {
        // Sliding window of 6 scanners over 40
        let window: Vec<(&str, f64)> = (0..6)
            .map(|k| {
                let id = &ids[(step + k) % ids.len()];
                (id.as_str(), -60.0 - k as f64 * 3.0)
            })
            .collect();
        let others = readings(&window[1..]);
        profile.update(window[0].1, &others, Some(window[0].0));
        room.update(&readings(&window));

        assert!(profile.correlation_count() <= 15);
        assert!(profile.absolute_profile_count() <= 15);
        assert!(room.pair_count() <= 20);
    }
}

#[test]
fn area_profile_prefers_its_own_room() {
    let kitchen = trained_area("kitchen", 60, 41);

    let in_kitchen = readings(room_pattern("kitchen"));
    let in_bedroom = readings(room_pattern("bedroom"));

    let score = |sample: &std::collections::BTreeMap<String, f64>| {
        let mut others = sample.clone();
        let primary = others.remove("kitchen").unwrap();
        kitchen.match_score(primary, &others)
    };

    let own = score(&in_kitchen);
    let other = score(&in_bedroom);
    assert_probability!(own);
    assert_probability!(other);
    assert!(own > 0.3);
    assert!(other < 0.1);
    assert!(own > other);
}

#[test]
fn absolute_z_scores_cover_primary_scanner() {
    let kitchen = trained_area("kitchen", 40, 9);
    let scores = kitchen.get_absolute_z_scores(&readings(room_pattern("kitchen")));
    assert_eq!(scores.len(), 4);
    assert!(scores.iter().any(|(scanner, _, _)| scanner == "kitchen"));
    for (_, z, n) in &scores {
        assert!(*z < 5.0);
        assert_eq!(*n, 40);
    }
}

#[test]
fn room_without_scanner_is_recognised() {
    let mut store = ProfileStore::default();
    for (i, room) in ROOMS.iter().enumerate() {
        let mut generator = RssiGenerator::new(500 + i as u64, room_pattern(room), 3.0);
        for _ in 0..80 {
            store.room_profile_mut(room).update(&generator.sample());
        }
    }

    let ranked = store.rank_rooms(&readings(room_pattern("study")));
    assert_eq!(ranked.len(), 4);
    assert_eq!(ranked[0].0, "study");
    for pair in ranked.windows(2) {
        assert!(pair[0].1 >= pair[1].1);
    }

    // The strongest scanner alone would have said "hall"
    let study = readings(room_pattern("study"));
    assert_eq!(strongest(&study).unwrap().0, "hall");
}

#[test]
fn room_match_ignores_device_offset() {
    let room = trained_room("bedroom", 60, 77);
    let pattern = readings(room_pattern("bedroom"));

    // A weaker transmitter shifts every reading by the same amount
    let quieter: std::collections::BTreeMap<String, f64> =
        pattern.iter().map(|(k, v)| (k.clone(), v - 9.0)).collect();

    assert_within_tolerance!(room.get_match_score(&quieter), room.get_match_score(&pattern), 1e-9);
}
