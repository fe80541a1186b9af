//! Statistical Scoring Primitives
//!
//! ## z-score
//!
//! How many standard deviations an observation lies from a learned estimate:
//! ```text
//! z = |observed - estimate| / sqrt(max(variance, ε))
//! ```
//! A variance of zero or below means "no spread information" and scores 0,
//! never NaN or infinity.
//!
//! ## Confidence
//!
//! z-scores map to a confidence in [0, 1] with a rational falloff:
//! ```text
//! confidence = 1 / (1 + (z / 2)²)
//!
//! z = 0 → 1.00
//! z = 2 → 0.50
//! z = 4 → 0.20
//! z = 6 → 0.10
//! ```
//! The curve is monotonically decreasing and never reaches zero, so a single
//! wild reading lowers a room's score without eliminating it.
//!
//! ## Mahalanobis confidence
//!
//! A squared Mahalanobis distance over `k` dimensions is first turned into a
//! per-dimension RMS z (`sqrt(d² / k)`) and then mapped with the same curve,
//! which keeps fingerprint scores comparable to pairwise scores.

use crate::constants::correlation::{NEUTRAL_MATCH_SCORE, Z_CONFIDENCE_SCALE};
use crate::constants::filters::Z_SCORE_VARIANCE_EPSILON;

/// Absolute z-score of `observed` against `estimate` with `variance`
pub fn z_score(observed: f64, estimate: f64, variance: f64) -> f64 {
    if !(variance > 0.0) || !observed.is_finite() || !estimate.is_finite() {
        return 0.0;
    }
    libm::fabs(observed - estimate) / libm::sqrt(variance.max(Z_SCORE_VARIANCE_EPSILON))
}

/// Map a z-score to a confidence in [0, 1]
pub fn z_to_confidence(z: f64) -> f64 {
    if !z.is_finite() {
        return 0.0;
    }
    let scaled = z / Z_CONFIDENCE_SCALE;
    (1.0 / (1.0 + scaled * scaled)).clamp(0.0, 1.0)
}

/// Sample-weighted mean of `(z, weight)` pairs
///
/// `None` when the weights sum to zero.
pub fn weighted_mean_z<I>(scores: I) -> Option<f64>
where
    I: IntoIterator<Item = (f64, u64)>,
{
    let (sum, total) = scores
        .into_iter()
        .fold((0.0, 0u64), |(sum, total), (z, weight)| {
            (sum + z * weight as f64, total + weight)
        });

    if total == 0 {
        None
    } else {
        Some(sum / total as f64)
    }
}

/// Confidence from weighted z-scores, neutral when there are none
pub fn match_confidence<I>(scores: I) -> f64
where
    I: IntoIterator<Item = (f64, u64)>,
{
    weighted_mean_z(scores)
        .map(z_to_confidence)
        .unwrap_or(NEUTRAL_MATCH_SCORE)
}

/// Confidence from a squared Mahalanobis distance over `dimensions`
pub fn mahalanobis_confidence(d_squared: f64, dimensions: usize) -> f64 {
    if dimensions == 0 || !d_squared.is_finite() {
        return 0.0;
    }
    let rms_z = libm::sqrt(d_squared.max(0.0) / dimensions as f64);
    z_to_confidence(rms_z)
}
