//! Multi-Scanner Unscented Kalman Filter
//!
//! ## State
//!
//! One device's RSSI at every scanner it has been seen by, tracked jointly:
//! ```text
//! x = [rssi_0, rssi_1, ..., rssi_{N-1}]     P = N×N covariance
//! ```
//! Scanners are appended in discovery order and never removed within a
//! session, so an index handed out once stays valid.
//!
//! ## Predict
//!
//! Random walk per scanner, no cross terms:
//! ```text
//! P_ii += q·dt
//! ```
//!
//! ## Update
//!
//! 2N+1 sigma points from the regularised Cholesky factor of P:
//! ```text
//! λ  = α²(N + κ) - N
//! χ₀ = x,   χᵢ = x + (√((N+λ)P))ᵢ,   χᵢ₊ₙ = x - (√((N+λ)P))ᵢ
//!
//! Wm₀ = λ/(N+λ)   Wc₀ = Wm₀ + (1 - α² + β)   Wᵢ = 1/(2(N+λ))
//! ```
//! The observation model is the identity restricted to the scanners present
//! in this cycle (**partial observation**). Rows of the gain belonging to
//! silent scanners are discarded, so their mean is untouched and their
//! variance is only ever grown by `predict`.
//!
//! ```text
//! S   = Σ Wc (Zⱼ - ẑ)(Zⱼ - ẑ)ᵀ + R
//! Pxz = Σ Wc (χⱼ - x)(Zⱼ - ẑ)ᵀ
//! K   = Pxz S⁻¹
//! x  += K (z - ẑ)
//! P  -= K S Kᵀ
//! ```
//! Afterwards P is symmetrised and its diagonal floored, which keeps
//! unbounded sessions numerically stable.
//!
//! ## Fingerprint Matching
//!
//! For each area with at least two mature absolute profiles on tracked
//! scanners:
//! ```text
//! diff = expected - x_shared
//! Σ    = P_shared + diag(max(profile_var, MIN_PROFILE_VARIANCE))
//! d²   = diffᵀ Σ⁻¹ diff
//! confidence = 1 / (1 + d²/(4k))
//! ```
//! When Σ cannot be inverted the diagonal approximation `Σ diffᵢ²/Σᵢᵢ` is
//! used instead.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::constants::ukf::{
    MIN_FINGERPRINT_OVERLAP, MIN_PROFILE_VARIANCE, UKF_ALPHA, UKF_BETA, UKF_INITIAL_RSSI_DBM,
    UKF_INITIAL_VARIANCE, UKF_KAPPA, UKF_MAX_DT_SECONDS, UKF_MEASUREMENT_NOISE,
    UKF_MIN_DT_SECONDS, UKF_MIN_VARIANCE, UKF_PROCESS_NOISE,
};
use crate::correlation::AreaProfile;
use crate::errors::{require_non_negative, require_positive, ConfigError, ConfigResult};
use crate::logging::{log_debug, log_warn};
use crate::matrix::{self, active_backend, Matrix};
use crate::scoring;
use crate::time::{clamped_dt, Timestamp};

/// UKF configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UkfConfig {
    /// Process noise q per scanner (dB² per second)
    pub process_noise: f64,
    /// Measurement noise r per scanner (dB²)
    pub measurement_noise: f64,
    /// Variance of a newly added scanner (dB²)
    pub initial_variance: f64,
    /// RSSI assumed for a scanner added without a reading (dBm)
    pub initial_rssi: f64,
    /// Floor on every diagonal covariance entry (dB²)
    pub min_variance: f64,
    /// Lower clamp for elapsed time (seconds)
    pub min_dt: f64,
    /// Upper clamp for elapsed time (seconds)
    pub max_dt: f64,
    /// Sigma point spread α
    pub alpha: f64,
    /// Prior distribution parameter β (2 is optimal for Gaussians)
    pub beta: f64,
    /// Secondary scaling κ
    pub kappa: f64,
    /// Shared scanners needed to score a fingerprint
    pub min_overlap: usize,
    /// Floor on a profile's per-scanner variance when matching (dB²)
    pub min_profile_variance: f64,
}

impl Default for UkfConfig {
    fn default() -> Self {
        Self {
            process_noise: UKF_PROCESS_NOISE,
            measurement_noise: UKF_MEASUREMENT_NOISE,
            initial_variance: UKF_INITIAL_VARIANCE,
            initial_rssi: UKF_INITIAL_RSSI_DBM,
            min_variance: UKF_MIN_VARIANCE,
            min_dt: UKF_MIN_DT_SECONDS,
            max_dt: UKF_MAX_DT_SECONDS,
            alpha: UKF_ALPHA,
            beta: UKF_BETA,
            kappa: UKF_KAPPA,
            min_overlap: MIN_FINGERPRINT_OVERLAP,
            min_profile_variance: MIN_PROFILE_VARIANCE,
        }
    }
}

impl UkfConfig {
    /// Set process and measurement noise
    pub fn with_noise(mut self, process_noise: f64, measurement_noise: f64) -> Self {
        self.process_noise = process_noise;
        self.measurement_noise = measurement_noise;
        self
    }

    /// Set sigma point parameters
    pub fn with_sigma_params(mut self, alpha: f64, beta: f64, kappa: f64) -> Self {
        self.alpha = alpha;
        self.beta = beta;
        self.kappa = kappa;
        self
    }

    /// Check parameter domains
    pub fn validate(&self) -> ConfigResult<()> {
        require_non_negative("process_noise", self.process_noise)?;
        require_positive("measurement_noise", self.measurement_noise)?;
        require_positive("initial_variance", self.initial_variance)?;
        require_positive("min_variance", self.min_variance)?;
        require_positive("min_dt", self.min_dt)?;
        require_positive("max_dt", self.max_dt)?;
        require_positive("min_profile_variance", self.min_profile_variance)?;
        if !self.initial_rssi.is_finite() {
            return Err(ConfigError::invalid("initial_rssi", self.initial_rssi, "must be finite"));
        }
        if self.max_dt < self.min_dt {
            return Err(ConfigError::invalid("max_dt", self.max_dt, "must be >= min_dt"));
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(ConfigError::invalid("alpha", self.alpha, "must lie in (0, 1]"));
        }
        require_non_negative("beta", self.beta)?;
        if !self.kappa.is_finite() {
            return Err(ConfigError::invalid("kappa", self.kappa, "must be finite"));
        }
        // spread = α²(n + κ) must stay positive for n = 1
        if self.kappa <= -1.0 {
            return Err(ConfigError::invalid("kappa", self.kappa, "must be > -1"));
        }
        if self.min_overlap < 1 {
            return Err(ConfigError::invalid("min_overlap", 0.0, "must be >= 1"));
        }
        Ok(())
    }
}

/// Fingerprint match against one area
#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintMatch {
    /// Area id
    pub area_id: String,
    /// Squared Mahalanobis distance
    pub d_squared: f64,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Scanners the distance was computed over
    pub overlap: usize,
}

/// Joint RSSI tracker across a growing set of scanners
#[derive(Debug, Clone)]
pub struct MultiScannerFilter {
    config: UkfConfig,
    index: BTreeMap<String, usize>,
    scanners: Vec<String>,
    state: Vec<f64>,
    covariance: Matrix,
    sample_count: u64,
    last_update: Option<Timestamp>,
}

impl Default for MultiScannerFilter {
    fn default() -> Self {
        Self::new(UkfConfig::default())
    }
}

impl MultiScannerFilter {
    /// Create a filter tracking no scanners
    pub fn new(config: UkfConfig) -> Self {
        Self {
            config,
            index: BTreeMap::new(),
            scanners: Vec::new(),
            state: Vec::new(),
            covariance: Matrix::zeros(0, 0),
            sample_count: 0,
            last_update: None,
        }
    }

    /// Start tracking `scanner`, returning its position
    ///
    /// Idempotent: a known scanner keeps its position.
    pub fn add_scanner(&mut self, scanner: &str) -> usize {
        self.add_scanner_at(scanner, self.config.initial_rssi)
    }

    fn add_scanner_at(&mut self, scanner: &str, rssi: f64) -> usize {
        if let Some(&idx) = self.index.get(scanner) {
            return idx;
        }
        let idx = self.scanners.len();
        self.index.insert(String::from(scanner), idx);
        self.scanners.push(String::from(scanner));
        self.state.push(rssi);
        self.covariance.grow(self.config.initial_variance);
        log_debug!("UKF tracking scanner {} at index {}", scanner, idx);
        idx
    }

    /// Tracked scanner ids in index order
    pub fn scanners(&self) -> &[String] {
        &self.scanners
    }

    /// Number of tracked scanners
    pub fn dimension(&self) -> usize {
        self.scanners.len()
    }

    /// State vector in index order
    pub fn state(&self) -> &[f64] {
        &self.state
    }

    /// Full covariance
    pub fn covariance(&self) -> &Matrix {
        &self.covariance
    }

    /// Estimated RSSI at `scanner`
    pub fn state_of(&self, scanner: &str) -> Option<f64> {
        self.index.get(scanner).map(|&i| self.state[i])
    }

    /// Variance of the estimate at `scanner`
    pub fn variance_of(&self, scanner: &str) -> Option<f64> {
        self.index.get(scanner).map(|&i| self.covariance[(i, i)])
    }

    /// Measurement cycles absorbed
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Configuration in use
    pub fn config(&self) -> &UkfConfig {
        &self.config
    }

    /// Forget every scanner and all state
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    /// Grow every scanner's variance by `q·dt`
    ///
    /// Non-positive or non-finite `dt` is ignored.
    pub fn predict(&mut self, dt: f64) {
        if !(dt > 0.0) || !dt.is_finite() {
            return;
        }
        self.covariance.add_diagonal(self.config.process_noise * dt);
    }

    /// Timestamped update: predict over the clamped elapsed time, then correct
    pub fn update_multi_at(&mut self, readings: &BTreeMap<String, f64>, timestamp: Option<Timestamp>) {
        if self.sample_count > 0 {
            let dt = clamped_dt(self.last_update, timestamp, self.config.min_dt, self.config.max_dt);
            self.predict(dt);
        }
        self.update_multi(readings);
        if timestamp.is_some() {
            self.last_update = timestamp;
        }
    }

    /// Correct the state with simultaneous readings from any subset of scanners
    ///
    /// Unknown scanners are added, seeded with their reading. Scanners absent
    /// from `readings` are not corrected. Empty (or entirely non-finite)
    /// readings leave the filter unchanged.
    pub fn update_multi(&mut self, readings: &BTreeMap<String, f64>) {
        let mut observed: Vec<(usize, f64)> = Vec::with_capacity(readings.len());
        for (scanner, &rssi) in readings {
            if !rssi.is_finite() {
                continue;
            }
            let idx = self.add_scanner_at(scanner, rssi);
            observed.push((idx, rssi));
        }
        if observed.is_empty() {
            return;
        }
        observed.sort_by_key(|&(idx, _)| idx);

        let n = self.state.len();
        let m = observed.len();
        let weights = SigmaWeights::new(n, &self.config);
        let sigma = self.sigma_points(weights.spread);

        // Sigma points through the observation model
        let projected: Vec<Vec<f64>> = sigma
            .iter()
            .map(|point| observed.iter().map(|&(idx, _)| point[idx]).collect())
            .collect();

        let mut z_pred = vec![0.0; m];
        for (j, z) in projected.iter().enumerate() {
            let w = weights.mean(j);
            for (acc, v) in z_pred.iter_mut().zip(z) {
                *acc += w * v;
            }
        }

        let mut innovation_cov = Matrix::zeros(m, m);
        let mut cross_cov = Matrix::zeros(n, m);
        for (j, (point, z)) in sigma.iter().zip(&projected).enumerate() {
            let w = weights.cov(j);
            let dz: Vec<f64> = z.iter().zip(&z_pred).map(|(a, b)| a - b).collect();
            let dx: Vec<f64> = point.iter().zip(&self.state).map(|(a, b)| a - b).collect();
            for a in 0..m {
                for b in 0..m {
                    innovation_cov[(a, b)] += w * dz[a] * dz[b];
                }
                for i in 0..n {
                    cross_cov[(i, a)] += w * dx[i] * dz[a];
                }
            }
        }
        innovation_cov.add_diagonal(self.config.measurement_noise);

        let backend = active_backend();
        let s_inv = backend.invert(&innovation_cov).unwrap_or_else(|err| {
            log_warn!("Innovation covariance unavailable ({}), using diagonal inverse", err);
            diagonal_inverse(&innovation_cov)
        });

        let mut gain = match backend.multiply(&cross_cov, &s_inv) {
            Ok(gain) => gain,
            Err(_) => return,
        };

        // Discard gain rows of silent scanners
        let mut is_observed = vec![false; n];
        for &(idx, _) in &observed {
            is_observed[idx] = true;
        }
        for (i, _) in is_observed.iter().enumerate().filter(|(_, seen)| !**seen) {
            for a in 0..m {
                gain[(i, a)] = 0.0;
            }
        }

        let residual: Vec<f64> = observed
            .iter()
            .zip(&z_pred)
            .map(|(&(_, z), zp)| z - zp)
            .collect();
        if let Ok(correction) = matrix::matvec(&gain, &residual) {
            for (x, dx) in self.state.iter_mut().zip(correction) {
                *x += dx;
            }
        }

        // P -= K S Kᵀ
        let reduction = backend
            .multiply(&gain, &innovation_cov)
            .and_then(|ks| backend.multiply(&ks, &matrix::transpose(&gain)));
        if let Ok(reduction) = reduction {
            for i in 0..n {
                for j in 0..n {
                    self.covariance[(i, j)] -= reduction[(i, j)];
                }
            }
        }

        self.stabilise();
        self.sample_count += 1;
    }

    fn sigma_points(&self, spread: f64) -> Vec<Vec<f64>> {
        let n = self.state.len();
        let mut scaled = self.covariance.clone();
        for v in 0..n {
            for w in 0..n {
                scaled[(v, w)] *= spread;
            }
        }

        let sqrt = active_backend().cholesky(&scaled).unwrap_or_else(|err| {
            log_warn!("Cholesky unavailable ({}), using diagonal square root", err);
            let mut diag = Matrix::zeros(n, n);
            for i in 0..n {
                diag[(i, i)] = libm::sqrt(scaled[(i, i)].max(0.0));
            }
            diag
        });

        let mut points = Vec::with_capacity(2 * n + 1);
        points.push(self.state.clone());
        for sign in [1.0, -1.0] {
            for col in 0..n {
                points.push(
                    self.state
                        .iter()
                        .enumerate()
                        .map(|(row, x)| x + sign * sqrt[(row, col)])
                        .collect(),
                );
            }
        }
        points
    }

    fn stabilise(&mut self) {
        matrix::make_symmetric(&mut self.covariance);
        for i in 0..self.state.len() {
            let v = self.covariance[(i, i)];
            if !(v >= self.config.min_variance) {
                self.covariance[(i, i)] = self.config.min_variance;
            }
        }
    }

    /// Score the current state against every area's absolute fingerprint
    ///
    /// Areas sharing fewer than `min_overlap` mature, tracked scanners are
    /// left out. Results are ordered best match first.
    pub fn match_fingerprints(&self, profiles: &BTreeMap<String, AreaProfile>) -> Vec<FingerprintMatch> {
        let mut matches: Vec<FingerprintMatch> = profiles
            .iter()
            .filter_map(|(area_id, profile)| self.match_profile(area_id, profile))
            .collect();

        matches.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.area_id.cmp(&b.area_id))
        });
        matches
    }

    fn match_profile(&self, area_id: &str, profile: &AreaProfile) -> Option<FingerprintMatch> {
        let shared: Vec<(usize, f64, f64)> = profile
            .absolute_profiles()
            .filter(|p| p.is_mature())
            .filter_map(|p| {
                let idx = *self.index.get(p.scanner())?;
                Some((idx, p.expected_rssi(), p.variance()))
            })
            .collect();

        let k = shared.len();
        if k < self.config.min_overlap {
            return None;
        }

        let indices: Vec<usize> = shared.iter().map(|&(idx, _, _)| idx).collect();
        let diff: Vec<f64> = shared
            .iter()
            .map(|&(idx, expected, _)| expected - self.state[idx])
            .collect();

        let mut joint = self.covariance.principal_submatrix(&indices);
        for (a, &(_, _, variance)) in shared.iter().enumerate() {
            joint[(a, a)] += variance.max(self.config.min_profile_variance);
        }

        let d_squared = active_backend()
            .invert(&joint)
            .ok()
            .and_then(|inv| matrix::quadratic_form(&inv, &diff).ok())
            .filter(|d2| d2.is_finite() && *d2 >= 0.0)
            .unwrap_or_else(|| {
                log_debug!("Joint covariance for {} unavailable, using diagonal distance", area_id);
                diff.iter()
                    .enumerate()
                    .map(|(a, d)| d * d / joint[(a, a)].max(self.config.min_variance))
                    .sum()
            });

        Some(FingerprintMatch {
            area_id: String::from(area_id),
            d_squared,
            confidence: scoring::mahalanobis_confidence(d_squared, k),
            overlap: k,
        })
    }
}

/// Unscented transform weights for dimension `n`
struct SigmaWeights {
    spread: f64,
    mean0: f64,
    cov0: f64,
    rest: f64,
}

impl SigmaWeights {
    fn new(n: usize, config: &UkfConfig) -> Self {
        let n_f = n as f64;
        let alpha_sq = config.alpha * config.alpha;
        let mut lambda = alpha_sq * (n_f + config.kappa) - n_f;
        let spread = n_f + lambda;
        if spread.is_nan() || spread <= 0.0 {
            log_warn!("Sigma spread {} not positive, using kappa = 0", spread);
            lambda = alpha_sq * n_f - n_f;
        }
        let spread = n_f + lambda;
        let mean0 = lambda / spread;
        Self {
            spread,
            mean0,
            cov0: mean0 + (1.0 - alpha_sq + config.beta),
            rest: 1.0 / (2.0 * spread),
        }
    }

    fn mean(&self, j: usize) -> f64 {
        if j == 0 {
            self.mean0
        } else {
            self.rest
        }
    }

    fn cov(&self, j: usize) -> f64 {
        if j == 0 {
            self.cov0
        } else {
            self.rest
        }
    }
}

fn diagonal_inverse(a: &Matrix) -> Matrix {
    let n = a.rows();
    let mut inv = Matrix::zeros(n, n);
    for i in 0..n {
        let v = a[(i, i)];
        inv[(i, i)] = if v > 0.0 { 1.0 / v } else { 0.0 };
    }
    inv
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    fn readings(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn add_scanner_is_append_only() {
        let mut ukf = MultiScannerFilter::default();
        assert_eq!(ukf.add_scanner("a"), 0);
        assert_eq!(ukf.add_scanner("b"), 1);
        assert_eq!(ukf.add_scanner("a"), 0);
        assert_eq!(ukf.dimension(), 2);
        assert_eq!(ukf.state_of("b"), Some(UKF_INITIAL_RSSI_DBM));
        assert_eq!(ukf.variance_of("b"), Some(UKF_INITIAL_VARIANCE));
        assert_eq!(ukf.state_of("c"), None);
    }

    #[test]
    fn predict_grows_diagonal_only() {
        let mut ukf = MultiScannerFilter::default();
        ukf.add_scanner("a");
        ukf.add_scanner("b");
        ukf.predict(2.0);
        assert_eq!(ukf.variance_of("a"), Some(UKF_INITIAL_VARIANCE + 2.0 * UKF_PROCESS_NOISE));
        assert_eq!(ukf.covariance()[(0, 1)], 0.0);

        ukf.predict(-1.0);
        ukf.predict(f64::NAN);
        assert_eq!(ukf.variance_of("a"), Some(UKF_INITIAL_VARIANCE + 2.0 * UKF_PROCESS_NOISE));
    }

    #[test]
    fn single_scanner_matches_scalar_kalman() {
        let mut ukf = MultiScannerFilter::default();
        ukf.add_scanner("a");
        ukf.update_multi(&readings(&[("a", -60.0)]));

        // Linear observation: the unscented transform is exact
        let p = UKF_INITIAL_VARIANCE;
        let k = p / (p + UKF_MEASUREMENT_NOISE);
        let expected = UKF_INITIAL_RSSI_DBM + k * (-60.0 - UKF_INITIAL_RSSI_DBM);
        assert!((ukf.state_of("a").unwrap() - expected).abs() < 1e-6);
        assert!((ukf.variance_of("a").unwrap() - (1.0 - k) * p).abs() < 1e-6);
    }

    #[test]
    fn unknown_scanner_seeded_with_reading() {
        let mut ukf = MultiScannerFilter::default();
        ukf.update_multi(&readings(&[("a", -55.0)]));
        assert!((ukf.state_of("a").unwrap() - -55.0).abs() < 1e-9);
        assert!(ukf.variance_of("a").unwrap() < UKF_INITIAL_VARIANCE);
        assert_eq!(ukf.sample_count(), 1);
    }

    #[test]
    fn empty_readings_are_noop() {
        let mut ukf = MultiScannerFilter::default();
        ukf.add_scanner("a");
        ukf.update_multi(&BTreeMap::new());
        ukf.update_multi(&readings(&[("a", f64::NAN)]));
        assert_eq!(ukf.state_of("a"), Some(UKF_INITIAL_RSSI_DBM));
        assert_eq!(ukf.sample_count(), 0);
    }

    #[test]
    fn partial_observation_leaves_silent_scanners() {
        let mut ukf = MultiScannerFilter::default();
        for _ in 0..10 {
            ukf.update_multi(&readings(&[("a", -70.0), ("b", -75.0), ("c", -85.0)]));
        }
        ukf.predict(1.0);
        let b_before = (ukf.state_of("b").unwrap(), ukf.variance_of("b").unwrap());
        let c_before = (ukf.state_of("c").unwrap(), ukf.variance_of("c").unwrap());
        let a_before = ukf.state_of("a").unwrap();

        ukf.update_multi(&readings(&[("a", -60.0)]));

        assert!(ukf.state_of("a").unwrap() > a_before);
        assert_eq!((ukf.state_of("b").unwrap(), ukf.variance_of("b").unwrap()), b_before);
        assert_eq!((ukf.state_of("c").unwrap(), ukf.variance_of("c").unwrap()), c_before);
    }

    #[test]
    fn diagonal_never_below_floor() {
        let config = UkfConfig::default().with_noise(0.0, 0.001);
        let mut ukf = MultiScannerFilter::new(config);
        for _ in 0..500 {
            ukf.update_multi(&readings(&[("a", -60.0), ("b", -62.0)]));
        }
        for v in ukf.covariance().diagonal() {
            assert!(v >= UKF_MIN_VARIANCE);
        }
        assert!(ukf.covariance().is_finite());
    }

    #[test]
    fn timestamped_updates_predict_first() {
        let mut a = MultiScannerFilter::default();
        let mut b = MultiScannerFilter::default();
        let r = readings(&[("s", -65.0)]);
        a.update_multi_at(&r, Some(0.0));
        b.update_multi_at(&r, Some(0.0));

        a.update_multi_at(&readings(&[("s", -50.0)]), Some(1.0));
        b.update_multi_at(&readings(&[("s", -50.0)]), Some(25.0));
        // Longer gap → larger gain
        assert!(b.state_of("s").unwrap() > a.state_of("s").unwrap());
    }

    #[test]
    fn reset_forgets_scanners() {
        let mut ukf = MultiScannerFilter::default();
        ukf.update_multi(&readings(&[("a", -60.0), ("b", -70.0)]));
        ukf.reset();
        assert_eq!(ukf.dimension(), 0);
        assert!(ukf.scanners().is_empty());
        assert_eq!(ukf.sample_count(), 0);
    }

    fn trained_profile(area: &str, pattern: &[(&str, f64)]) -> AreaProfile {
        let mut profile = AreaProfile::new(area);
        let (primary, primary_rssi) = pattern[0];
        let others = readings(&pattern[1..]);
        for _ in 0..40 {
            profile.update(primary_rssi, &others, Some(primary));
        }
        profile
    }

    #[test]
    fn fingerprints_rank_closest_area_first() {
        let mut profiles = BTreeMap::new();
        profiles.insert(
            "kitchen".to_string(),
            trained_profile("kitchen", &[("s1", -55.0), ("s2", -75.0), ("s3", -85.0)]),
        );
        profiles.insert(
            "bedroom".to_string(),
            trained_profile("bedroom", &[("s1", -85.0), ("s2", -60.0), ("s3", -70.0)]),
        );

        let mut ukf = MultiScannerFilter::default();
        for _ in 0..20 {
            ukf.update_multi(&readings(&[("s1", -56.0), ("s2", -74.0), ("s3", -86.0)]));
        }

        let matches = ukf.match_fingerprints(&profiles);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].area_id, "kitchen");
        assert_eq!(matches[0].overlap, 3);
        assert!(matches[0].confidence > 0.5);
        assert!(matches[0].confidence > 5.0 * matches[1].confidence);
        assert!(matches[0].d_squared < matches[1].d_squared);
    }

    #[test]
    fn fingerprints_need_two_shared_scanners() {
        let mut profiles = BTreeMap::new();
        profiles.insert(
            "hall".to_string(),
            trained_profile("hall", &[("s1", -60.0), ("s9", -70.0)]),
        );

        let mut ukf = MultiScannerFilter::default();
        ukf.update_multi(&readings(&[("s1", -60.0), ("s2", -70.0)]));
        assert!(ukf.match_fingerprints(&profiles).is_empty());

        ukf.update_multi(&readings(&[("s9", -70.0)]));
        assert_eq!(ukf.match_fingerprints(&profiles).len(), 1);
    }

    #[test]
    fn immature_profiles_are_ignored() {
        let mut profile = AreaProfile::new("study");
        profile.update(-60.0, &readings(&[("s2", -70.0)]), Some("s1"));
        let mut profiles = BTreeMap::new();
        profiles.insert("study".to_string(), profile);

        let mut ukf = MultiScannerFilter::default();
        ukf.update_multi(&readings(&[("s1", -60.0), ("s2", -70.0)]));
        assert!(ukf.match_fingerprints(&profiles).is_empty());
    }

    #[test]
    fn config_validation() {
        assert!(UkfConfig::default().validate().is_ok());
        assert!(UkfConfig::default().with_noise(0.5, 0.0).validate().is_err());
        assert!(UkfConfig::default().with_sigma_params(0.0, 2.0, 0.0).validate().is_err());
        assert!(UkfConfig::default().with_sigma_params(0.5, 2.0, -1.0).validate().is_err());
        assert!(UkfConfig::default().with_sigma_params(0.5, 2.0, -0.5).validate().is_ok());
    }

    #[test]
    fn collapsed_sigma_spread_falls_back_to_zero_kappa() {
        let config = UkfConfig::default().with_sigma_params(0.5, 2.0, -1.0);
        let mut ukf = MultiScannerFilter::new(config);
        let mut reference = MultiScannerFilter::default();
        ukf.update_multi(&readings(&[("a", -60.0)]));
        ukf.update_multi(&readings(&[("a", -64.0)]));
        reference.update_multi(&readings(&[("a", -60.0)]));
        reference.update_multi(&readings(&[("a", -64.0)]));
        assert_eq!(ukf.state(), reference.state());

        ukf.update_multi(&readings(&[("a", -62.0), ("b", -70.0)]));
        assert!(ukf.state().iter().all(|x| x.is_finite()));
        assert!(ukf.covariance().is_finite());
    }
}
