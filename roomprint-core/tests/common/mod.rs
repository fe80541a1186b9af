//! Common test utilities for integration tests
//!
//! This module provides:
//! - Seeded RSSI generators with Gaussian noise and dropouts
//! - A small house layout with per-room signal patterns
//! - Helpers that train area and room profiles from that layout

#![allow(dead_code)]

pub mod generators;
pub mod scenarios;

use std::collections::BTreeMap;

/// Build a readings map from `(scanner, rssi)` pairs
pub fn readings(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[macro_export]
macro_rules! assert_within_tolerance {
    ($actual:expr, $expected:expr, $tolerance:expr) => {
        let actual: f64 = $actual;
        let expected: f64 = $expected;
        let diff = (actual - expected).abs();
        if diff > $tolerance {
            panic!(
                "Value {} not within tolerance {} of expected {} (diff: {})",
                actual, $tolerance, expected, diff
            );
        }
    };
}

#[macro_export]
macro_rules! assert_probability {
    ($value:expr) => {
        let value: f64 = $value;
        if !(0.0..=1.0).contains(&value) {
            panic!("Value {} is not a probability", value);
        }
    };
}
