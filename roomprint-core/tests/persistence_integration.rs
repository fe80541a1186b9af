//! Integration tests for snapshot persistence
//!
//! Hosts store snapshots as JSON text. Everything learned must survive the trip
//! through text bit-for-bit, and snapshots written by older single-pool
//! builds must still load.

#![cfg(test)]

mod common;

use roomprint_core::{
    AreaProfile, CorrelationConfig, PortableRecord, ProfileStore, RecordError, RoomProfile,
};
use serde_json::{json, Value};

use common::generators::RssiGenerator;
use common::readings;
use common::scenarios::{room_pattern, strongest, ROOMS};

fn through_text(value: &Value) -> Value {
    let text = serde_json::to_string(value).unwrap();
    serde_json::from_str(&text).unwrap()
}

fn populated_store() -> ProfileStore {
    let mut store = ProfileStore::default();
    for (i, room) in ROOMS.iter().enumerate() {
        let mut generator = RssiGenerator::new(900 + i as u64, room_pattern(room), 3.5);
        for step in 0..45 {
            let sample = generator.sample();
            store.room_profile_mut(room).update(&sample);

            let mut others = sample.clone();
            if let Some((primary, rssi)) = strongest(&sample) {
                others.remove(&primary);
                let profile = store.area_profile_mut("phone", room);
                if step % 9 == 0 {
                    profile.update_button(rssi, &others, Some(primary.as_str()));
                } else {
                    profile.update(rssi, &others, Some(primary.as_str()));
                }
            }
        }
    }
    store
}

#[test]
fn store_survives_text_round_trip() {
    let store = populated_store();
    let snapshot = through_text(&store.to_portable_record());
    let restored = ProfileStore::from_portable_record(&snapshot).unwrap();

    assert_eq!(restored, store);
    assert_eq!(restored.area_count(), 4);
    assert_eq!(restored.room_count(), 4);
}

#[test]
fn scores_identical_after_reload() {
    let store = populated_store();
    let restored =
        ProfileStore::from_portable_record(&through_text(&store.to_portable_record())).unwrap();

    for room in ROOMS {
        let sample = readings(room_pattern(room));
        assert_eq!(restored.rank_rooms(&sample), store.rank_rooms(&sample));

        let mut others = sample.clone();
        let primary = others.remove("hall").unwrap();
        let before = store.area_profile("phone", room).unwrap();
        let after = restored.area_profile("phone", room).unwrap();
        assert_eq!(after.match_score(primary, &others), before.match_score(primary, &others));
        assert_eq!(after.has_button_training(), before.has_button_training());
    }
}

#[test]
fn snapshot_loads_with_other_tuning() {
    let store = populated_store();
    let tighter = CorrelationConfig::default().with_caps(2, 3);
    let restored =
        ProfileStore::from_portable_record_with(&store.to_portable_record(), &tighter).unwrap();

    for room in ROOMS {
        assert!(restored.area_profile("phone", room).unwrap().correlation_count() <= 2);
        assert!(restored.room_profile(room).unwrap().pair_count() <= 3);
    }
    assert_eq!(restored.config(), &tighter);
}

#[test]
fn single_pool_area_record_loads() {
    let legacy = json!({
        "area_id": "kitchen",
        "correlations": [
            { "scanner": "hall", "estimate": 16.0, "variance": 0.9, "samples": 120 },
            { "scanner": "office", "estimate": 28.0, "variance": 1.1, "samples": 12 }
        ],
        "absolute_profiles": [
            { "scanner": "kitchen", "estimate": -52.0, "variance": 0.8, "samples": 140 }
        ]
    });

    let profile = AreaProfile::from_portable_record(&legacy).unwrap();
    assert_eq!(profile.correlation_count(), 2);
    assert!(!profile.has_button_training());

    let hall = profile.correlation("hall").unwrap();
    assert_eq!(hall.estimate(), 16.0);
    assert_eq!(hall.sample_count(), 120);
    assert!(hall.is_mature());
    assert!(!profile.correlation("office").unwrap().is_mature());

    // Rewritten in the two-pool layout
    let upgraded = profile.to_portable_record();
    assert!(upgraded["correlations"][0]["auto"].is_object());
    assert_eq!(AreaProfile::from_portable_record(&upgraded).unwrap(), profile);
}

#[test]
fn single_pool_room_record_loads() {
    let legacy = json!({
        "area_id": "lounge",
        "scanner_pairs": [
            { "scanner": "S1|S2", "estimate": 10.0, "variance": 1.0, "samples": 50 }
        ]
    });

    let room = RoomProfile::from_portable_record(&legacy).unwrap();
    let pair = room.pair("S2", "S1").unwrap();
    assert!(pair.is_mature());
    assert!(room.get_match_score(&readings(&[("S1", -60.0), ("S2", -70.0)])) > 0.9);
}

#[test]
fn damaged_records_are_rejected() {
    let negative_variance = json!({
        "area_id": "kitchen",
        "correlations": [
            { "scanner": "hall", "auto": { "estimate": 16.0, "variance": -1.0, "sample_count": 3 } }
        ]
    });
    assert!(matches!(
        AreaProfile::from_portable_record(&negative_variance),
        Err(RecordError::InvalidField { field: "variance", .. })
    ));

    let no_scanner = json!({
        "area_id": "kitchen",
        "correlations": [{ "estimate": 1.0, "variance": 1.0, "samples": 3 }]
    });
    assert_eq!(
        AreaProfile::from_portable_record(&no_scanner),
        Err(RecordError::MissingField { field: "scanner" })
    );

    let not_an_object = json!("snapshot");
    assert!(matches!(
        ProfileStore::from_portable_record(&not_an_object),
        Err(RecordError::Malformed { .. })
    ));

    assert_eq!(
        ProfileStore::from_portable_record(&json!({ "version": 2 })),
        Err(RecordError::UnsupportedVersion { found: 2, supported: 1 })
    );
}
