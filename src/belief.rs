//! Posterior beliefs over ratio metrics.
//!
//! A ratio observed as `r` over a denominator of `n` is normalized into the metric's
//! support `[lo, hi]` and treated as a fractional success rate `x` over `n` trials:
//!
//! ```text
//!   x = (r - lo) / (hi - lo)            (clamped to [0, 1])
//!   y ~ Beta(1 + x*n, 1 + (1 - x)*n)
//!   draw = lo + y * (hi - lo)
//! ```
//!
//! This concentrates on `r` as `n` grows, never leaves the support, and is uniform
//! over the support when `n` is zero. The support is `[0, 1]` for metrics declared
//! `zero_to_one`. Otherwise it is built from the running [`RatioMaxMin`] bounds
//! `[min, max]`, anchored at zero and padded above (see [`belief_support`]):
//!
//! ```text
//!   lo = min(0, min)
//!   hi = max + SUPPORT_MARGIN * (max - lo)
//! ```
//!
//! Anchoring keeps the posterior width proportional to the ratio's magnitude, so two
//! versions at 100.0 and 100.5 stay indistinguishable until `n` is large. Mapping
//! `[min, max]` straight onto `[0, 1]` would put them at opposite ends.
//!
//! Draws are seedable; see [`crate::draw_seed`].

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Beta, Distribution};

use crate::{RatioMaxMin, RatioMetricSpec};

/// Headroom above the largest observed ratio, as a fraction of the support width.
pub const SUPPORT_MARGIN: f64 = 0.5;

/// Sampling support `(lo, hi)` for a ratio metric, `None` when no bounds exist yet.
pub fn belief_support(spec: &RatioMetricSpec, max_min: Option<&RatioMaxMin>) -> Option<(f64, f64)> {
    if spec.zero_to_one {
        return Some((0.0, 1.0));
    }
    let (min, max) = max_min.and_then(RatioMaxMin::bounds)?;
    let lo = min.min(0.0);
    Some((lo, max + SUPPORT_MARGIN * (max - lo)))
}

/// Belief about one ratio metric of one version.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BeliefModel {
    /// Nothing observed yet: every draw is missing (NaN).
    Unknown,
    /// No usable support yet: every draw is this value.
    PointMass(f64),
    /// Beta posterior rescaled onto `[lo, hi]`.
    ScaledBeta {
        alpha: f64,
        beta: f64,
        lo: f64,
        hi: f64,
    },
}

impl BeliefModel {
    /// Posterior from an aggregated ratio, its denominator count and the metric bounds.
    pub fn update(
        spec: &RatioMetricSpec,
        ratio: Option<f64>,
        denominator: Option<f64>,
        max_min: Option<&RatioMaxMin>,
    ) -> Self {
        let Some(r) = ratio.filter(|r| r.is_finite()) else {
            return BeliefModel::Unknown;
        };
        let Some((lo, hi)) = belief_support(spec, max_min) else {
            return BeliefModel::PointMass(r);
        };
        // Only reachable when every observation so far is the same value <= 0.
        if !(hi > lo) {
            return BeliefModel::PointMass(r);
        }
        let n = denominator
            .filter(|n| n.is_finite() && *n > 0.0)
            .unwrap_or(0.0);
        let x = ((r - lo) / (hi - lo)).clamp(0.0, 1.0);
        BeliefModel::ScaledBeta {
            alpha: 1.0 + x * n,
            beta: 1.0 + (1.0 - x) * n,
            lo,
            hi,
        }
    }

    /// Posterior mean, `None` when unknown.
    pub fn mean(&self) -> Option<f64> {
        match *self {
            BeliefModel::Unknown => None,
            BeliefModel::PointMass(v) => Some(v),
            BeliefModel::ScaledBeta { alpha, beta, lo, hi } => {
                Some(lo + (hi - lo) * alpha / (alpha + beta))
            }
        }
    }

    /// `sample_count` draws from a stream seeded with `seed`.
    pub fn sample(&self, sample_count: usize, seed: u64) -> Vec<f64> {
        match *self {
            BeliefModel::Unknown => vec![f64::NAN; sample_count],
            BeliefModel::PointMass(v) => vec![v; sample_count],
            BeliefModel::ScaledBeta { alpha, beta, lo, hi } => {
                let dist = match Beta::new(alpha, beta) {
                    Ok(d) => d,
                    // Parameters are finite and >= 1 by construction; fall back to the mean.
                    Err(_) => return vec![self.mean().unwrap_or(f64::NAN); sample_count],
                };
                let mut rng = StdRng::seed_from_u64(seed);
                (0..sample_count)
                    .map(|_| lo + (hi - lo) * dist.sample(&mut rng))
                    .collect()
            }
        }
    }
}
