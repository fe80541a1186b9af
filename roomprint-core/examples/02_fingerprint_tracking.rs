//! Fingerprint Tracking Example
//!
//! Tracks a walking device with the joint multi-scanner filter and matches the
//! smoothed state against learned area fingerprints every few seconds.
//!
//! ## What You'll Learn
//!
//! - Selecting a matrix backend at startup
//! - Feeding partial, irregular readings into `MultiScannerFilter`
//! - Interpreting Mahalanobis distances and confidences
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 02_fingerprint_tracking --features accelerated
//! ```

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use roomprint_core::matrix::backend;
use roomprint_core::{AreaProfile, MultiScannerFilter};

const AREAS: [(&str, [(&str, f64); 4]); 3] = [
    ("kitchen", [("s1", -50.0), ("s2", -71.0), ("s3", -83.0), ("s4", -78.0)]),
    ("hall", [("s1", -69.0), ("s2", -49.0), ("s3", -67.0), ("s4", -72.0)]),
    ("bedroom", [("s1", -85.0), ("s2", -66.0), ("s3", -47.0), ("s4", -80.0)]),
];

fn sample(rng: &mut StdRng, pattern: &[(&str, f64)]) -> BTreeMap<String, f64> {
    let mut readings = BTreeMap::new();
    for (scanner, mean) in pattern {
        // Roughly one scanner in four misses each advertisement
        if rng.gen_bool(0.75) {
            readings.insert(scanner.to_string(), mean + rng.gen_range(-5.0..5.0));
        }
    }
    readings
}

fn main() {
    println!("Roomprint Fingerprint Tracking Example");
    println!("======================================\n");

    let kind = backend::init();
    println!("Matrix backend: {:?}\n", kind);

    let mut rng = StdRng::seed_from_u64(7);

    // Calibration walk: learn each area's absolute fingerprint
    let mut profiles = BTreeMap::new();
    for (area, pattern) in &AREAS {
        let mut profile = AreaProfile::new(*area);
        for _ in 0..40 {
            let mut readings = sample(&mut rng, pattern);
            if let Some(primary) = readings.remove("s1") {
                profile.update(primary, &readings, Some("s1"));
            }
        }
        profiles.insert(area.to_string(), profile);
    }

    // Walk kitchen → hall → bedroom, 20 s per area, advertisements every 0.3-2 s
    let mut ukf = MultiScannerFilter::default();
    let mut t = 0.0;
    for (area, pattern) in &AREAS {
        println!("Walking into {}", area);
        let leave_at = t + 20.0;
        let mut next_report = t + 5.0;
        while t < leave_at {
            t += rng.gen_range(0.3..2.0);
            ukf.update_multi_at(&sample(&mut rng, pattern), Some(t));

            if t >= next_report {
                next_report += 5.0;
                let best = ukf.match_fingerprints(&profiles);
                let summary: Vec<String> = best
                    .iter()
                    .map(|m| format!("{} {:.2} (d²={:.1}, k={})", m.area_id, m.confidence, m.d_squared, m.overlap))
                    .collect();
                println!("  t={:5.1}s  {}", t, summary.join("  |  "));
            }
        }
    }

    println!("\nFinal state after {} updates:", ukf.sample_count());
    for scanner in ukf.scanners() {
        println!(
            "  {}  {:6.1} dBm  ±{:.2}",
            scanner,
            ukf.state_of(scanner).unwrap_or(f64::NAN),
            ukf.variance_of(scanner).map_or(f64::NAN, f64::sqrt)
        );
    }

    backend::teardown();
}
