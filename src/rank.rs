//! Per-draw ranking of versions by utility.
//!
//! Ranks are 1-based, descending, with ties sharing the minimum rank: on a draw
//! where two versions tie for the top utility, both are rank 1.

/// `ranks[v][j]`: rank of version `v` on draw `j`.
pub fn min_ranks(utilities: &[Vec<f64>]) -> Vec<Vec<usize>> {
    let draws = utilities.iter().map(Vec::len).min().unwrap_or(0);
    utilities
        .iter()
        .map(|row| {
            (0..draws)
                .map(|j| {
                    let u = row[j];
                    1 + utilities.iter().filter(|other| other[j] > u).count()
                })
                .collect()
        })
        .collect()
}

/// Share of "rank <= k" cells held by each version.
///
/// Each version's count of draws with rank at most `k`, divided by the total count
/// over all versions and draws. Sums to 1 whenever there is at least one draw;
/// all zeros otherwise.
pub fn top_k_shares(ranks: &[Vec<usize>], k: usize) -> Vec<f64> {
    let counts: Vec<usize> = ranks
        .iter()
        .map(|row| row.iter().filter(|r| **r <= k).count())
        .collect();
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0.0; ranks.len()];
    }
    counts
        .into_iter()
        .map(|c| c as f64 / total as f64)
        .collect()
}
