//! Room Matching Example
//!
//! Learns room profiles from a few passive observations plus one user
//! confirmation, then ranks rooms for new readings, including a room that has
//! no scanner of its own.
//!
//! ## What You'll Learn
//!
//! - Feeding observations into a `ProfileStore`
//! - Confirming a location with a button press
//! - Ranking rooms and reading area z-scores
//! - Persisting the store and loading it back
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 01_room_matching
//! ```

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use roomprint_core::{PortableRecord, ProfileStore};

const ROOMS: [(&str, [(&str, f64); 3]); 3] = [
    ("kitchen", [("kitchen", -52.0), ("hall", -70.0), ("office", -82.0)]),
    ("office", [("kitchen", -80.0), ("hall", -68.0), ("office", -50.0)]),
    // No scanner in the lounge
    ("lounge", [("kitchen", -74.0), ("hall", -61.0), ("office", -69.0)]),
];

fn noisy(rng: &mut StdRng, pattern: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pattern
        .iter()
        .map(|(scanner, mean)| (scanner.to_string(), mean + rng.gen_range(-4.0..4.0)))
        .collect()
}

fn main() {
    println!("Roomprint Room Matching Example");
    println!("===============================\n");

    let mut rng = StdRng::seed_from_u64(42);
    let mut store = ProfileStore::default();

    for (room, pattern) in &ROOMS {
        for _ in 0..40 {
            let sample = noisy(&mut rng, pattern);
            store.room_profile_mut(room).update(&sample);

            let mut others = sample.clone();
            let primary = others.remove("hall").unwrap_or(-100.0);
            store.area_profile_mut("phone", room).update(primary, &others, Some("hall"));
        }
        println!(
            "Learned {:8} {} pairs",
            room,
            store.room_profile(room).map_or(0, |p| p.pair_count())
        );
    }

    // The user confirms once that they are in the lounge
    let confirmed = noisy(&mut rng, &ROOMS[2].1);
    store.room_profile_mut("lounge").update_button(&confirmed);
    println!("Button press recorded for lounge\n");

    for (room, pattern) in &ROOMS {
        let live = noisy(&mut rng, pattern);
        println!("Device actually in {}:", room);
        for (candidate, score) in store.rank_rooms(&live) {
            println!("  {:8} {:.3}", candidate, score);
        }

        if let Some(profile) = store.area_profile("phone", room) {
            let mut others = live.clone();
            let primary = others.remove("hall").unwrap_or(-100.0);
            for (scanner, z) in profile.get_z_scores(primary, &others) {
                println!("  hall vs {:8} z = {:.2}", scanner, z);
            }
        }
        println!();
    }

    let snapshot = store.to_portable_record();
    match ProfileStore::from_portable_record(&snapshot) {
        Ok(restored) => println!(
            "Snapshot restored: {} areas, {} rooms, identical = {}",
            restored.area_count(),
            restored.room_count(),
            restored == store
        ),
        Err(err) => println!("Snapshot failed to load: {}", err),
    }
}
