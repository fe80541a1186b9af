//! Seeded RSSI generators
//!
//! Every generator is deterministic for a given seed so failures reproduce.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Gaussian noise source
pub struct NoiseSource {
    rng: StdRng,
}

impl NoiseSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Standard normal sample (Box-Muller)
    pub fn standard_normal(&mut self) -> f64 {
        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    /// `mean + sigma * N(0, 1)`
    pub fn gaussian(&mut self, mean: f64, sigma: f64) -> f64 {
        mean + sigma * self.standard_normal()
    }

    /// True with probability `p`
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }
}

/// Noisy advertisement stream for a device standing still
pub struct RssiGenerator {
    noise: NoiseSource,
    means: BTreeMap<String, f64>,
    sigma: f64,
    dropout: f64,
}

impl RssiGenerator {
    pub fn new(seed: u64, means: &[(&str, f64)], sigma: f64) -> Self {
        Self {
            noise: NoiseSource::new(seed),
            means: means.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            sigma,
            dropout: 0.0,
        }
    }

    /// Drop each scanner from a sample with probability `p`
    pub fn with_dropout(mut self, p: f64) -> Self {
        self.dropout = p;
        self
    }

    /// Move the device: new true means per scanner
    pub fn relocate(&mut self, means: &[(&str, f64)]) {
        self.means = means.iter().map(|(k, v)| (k.to_string(), *v)).collect();
    }

    /// One noisy sample across all scanners that heard the device
    pub fn sample(&mut self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        for (scanner, mean) in &self.means {
            if self.dropout > 0.0 && self.noise.chance(self.dropout) {
                continue;
            }
            out.insert(scanner.clone(), self.noise.gaussian(*mean, self.sigma));
        }
        out
    }

    /// Noisy value for one scanner
    pub fn sample_one(&mut self, scanner: &str) -> f64 {
        let mean = self.means.get(scanner).copied().unwrap_or(-100.0);
        self.noise.gaussian(mean, self.sigma)
    }
}
