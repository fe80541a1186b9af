//! House layout and profile training helpers
//!
//! ```text
//! room       primary   kitchen  hall   bedroom  office
//! kitchen    kitchen   -52      -68    -84      -80
//! hall       hall      -70      -50    -66      -74
//! bedroom    bedroom   -86      -67    -48      -79
//! study      (none)    -78      -64    -72      -70
//! ```
//!
//! The study has no scanner of its own and can only be recognised through its
//! pattern across the others.

use std::collections::BTreeMap;

use roomprint_core::{AreaProfile, RoomProfile};

use super::generators::RssiGenerator;

pub const SCANNERS: [&str; 4] = ["kitchen", "hall", "bedroom", "office"];

/// Mean RSSI per scanner for a room
pub fn room_pattern(room: &str) -> &'static [(&'static str, f64)] {
    match room {
        "kitchen" => &[("kitchen", -52.0), ("hall", -68.0), ("bedroom", -84.0), ("office", -80.0)],
        "hall" => &[("kitchen", -70.0), ("hall", -50.0), ("bedroom", -66.0), ("office", -74.0)],
        "bedroom" => &[("kitchen", -86.0), ("hall", -67.0), ("bedroom", -48.0), ("office", -79.0)],
        "study" => &[("kitchen", -78.0), ("hall", -64.0), ("bedroom", -72.0), ("office", -70.0)],
        _ => &[],
    }
}

pub const ROOMS: [&str; 4] = ["kitchen", "hall", "bedroom", "study"];

/// Strongest scanner in a sample
pub fn strongest(sample: &BTreeMap<String, f64>) -> Option<(String, f64)> {
    sample
        .iter()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(k, v)| (k.clone(), *v))
}

/// Area profile trained on `samples` noisy observations in `room`
pub fn trained_area(room: &str, samples: usize, seed: u64) -> AreaProfile {
    let mut generator = RssiGenerator::new(seed, room_pattern(room), 3.0);
    let mut profile = AreaProfile::new(room);
    for _ in 0..samples {
        let mut sample = generator.sample();
        if let Some((primary, primary_rssi)) = strongest(&sample) {
            sample.remove(&primary);
            profile.update(primary_rssi, &sample, Some(primary.as_str()));
        }
    }
    profile
}

/// Room profile trained on `samples` noisy observations in `room`
pub fn trained_room(room: &str, samples: usize, seed: u64) -> RoomProfile {
    let mut generator = RssiGenerator::new(seed, room_pattern(room), 3.0);
    let mut profile = RoomProfile::new(room);
    for _ in 0..samples {
        profile.update(&generator.sample());
    }
    profile
}

/// Area profiles for every room in the house
pub fn trained_house(samples: usize) -> BTreeMap<String, AreaProfile> {
    ROOMS
        .iter()
        .enumerate()
        .map(|(i, room)| (room.to_string(), trained_area(room, samples, 100 + i as u64)))
        .collect()
}
