//! Traffic-split recommendations via top-k posterior Bayesian routing.
//!
//! For a given `k`, a version's fractional split is its share of draws on which it
//! ranks in the top `k` by utility. That split is blended with a uniform exploration
//! share and rounded to integer percentages summing to 100.
//!
//! - `progressive`: k = 1 (plain PBR)
//! - `top_2`: k = 2
//! - `uniform`: k = N, every version is in the top N on every draw

use std::collections::BTreeMap;

use tracing::debug;

use crate::{apportion, blend_with_uniform, min_ranks, top_k_shares, TrafficSplitRecommendation};

/// Integer percentages for one `k`, keyed by version id.
pub fn top_k_split(
    version_ids: &[&str],
    ranks: &[Vec<usize>],
    k: usize,
    exploration_fraction: f64,
) -> BTreeMap<String, u32> {
    let fractional = top_k_shares(ranks, k);
    let mix = blend_with_uniform(&fractional, exploration_fraction);
    let scaled: Vec<f64> = mix.iter().map(|m| m * 100.0).collect();
    let integral = apportion(&scaled, 100);
    debug!(k, ?fractional, ?mix, ?integral, "top-k split");
    version_ids
        .iter()
        .zip(integral)
        .map(|(id, pct)| (id.to_string(), pct))
        .collect()
}

/// The three recommendations for one iteration.
pub fn recommend_traffic(
    version_ids: &[&str],
    utilities: &[Vec<f64>],
    exploration_fraction: f64,
) -> TrafficSplitRecommendation {
    let ranks = min_ranks(utilities);
    let rec = TrafficSplitRecommendation {
        progressive: top_k_split(version_ids, &ranks, 1, exploration_fraction),
        top_2: top_k_split(version_ids, &ranks, 2, exploration_fraction),
        uniform: top_k_split(version_ids, &ranks, version_ids.len(), exploration_fraction),
    };
    mix_recommendations(rec)
}

/// Final adjustment against the live split. Nothing to adjust against yet, so the
/// recommendations pass through unchanged.
fn mix_recommendations(rec: TrafficSplitRecommendation) -> TrafficSplitRecommendation {
    rec
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(m: &BTreeMap<String, u32>) -> u32 {
        m.values().sum()
    }

    #[test]
    fn clear_leader_gets_everything_but_exploration() {
        // Iteration order: candidates, then the baseline.
        let ids = ["c1", "c2", "base"];
        let u = vec![vec![1.0; 10], vec![0.5; 10], vec![0.0; 10]];
        let rec = recommend_traffic(&ids, &u, 0.0);
        assert_eq!(rec.progressive["c1"], 100);
        assert_eq!(rec.top_2["c1"], 50);
        assert_eq!(rec.top_2["c2"], 50);
        assert_eq!(rec.top_2["base"], 0);
        // The leftover point goes to the first version in iteration order.
        assert_eq!(rec.uniform["c1"], 34);
        assert_eq!(rec.uniform["c2"], 33);
        assert_eq!(rec.uniform["base"], 33);

        let rec = recommend_traffic(&ids, &u, 0.09);
        assert_eq!(rec.progressive["base"], 3);
        assert_eq!(rec.progressive["c2"], 3);
        assert_eq!(rec.progressive["c1"], 94);
        for m in [&rec.progressive, &rec.top_2, &rec.uniform] {
            assert_eq!(sum(m), 100);
        }
    }

    #[test]
    fn single_version_takes_all_traffic() {
        let rec = recommend_traffic(&["base"], &[vec![0.0; 3]], 0.05);
        assert_eq!(rec.progressive["base"], 100);
        assert_eq!(rec.top_2["base"], 100);
        assert_eq!(rec.uniform["base"], 100);
    }
}
