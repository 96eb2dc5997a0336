//! Win probabilities and winner declaration.

use tracing::debug;

use crate::{min_ranks, top_k_shares, WinnerAssessment};

/// Per-version win probability: its share of rank-1 cells.
pub fn win_probabilities(utilities: &[Vec<f64>]) -> Vec<f64> {
    top_k_shares(&min_ranks(utilities), 1)
}

/// Declare a winner when the leader's probability strictly exceeds `min_probability`.
///
/// The leader is the first version (in iteration order) with the highest probability.
/// It is logged either way but only reported when found.
pub fn assess_winner(
    version_ids: &[&str],
    win_probabilities: &[f64],
    min_probability: f64,
) -> WinnerAssessment {
    let leader = win_probabilities
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, p)| match best {
            Some((_, bp)) if bp >= *p => best,
            _ => Some((i, *p)),
        });
    let Some((index, probability)) = leader else {
        return WinnerAssessment::default();
    };
    let found = probability > min_probability;
    debug!(
        leader = version_ids.get(index).copied().unwrap_or_default(),
        probability,
        found,
        "winner assessment"
    );
    if !found {
        return WinnerAssessment::default();
    }
    WinnerAssessment {
        winning_version_found: true,
        current_winner: version_ids.get(index).map(|s| s.to_string()),
        winning_probability: Some(probability),
    }
}
