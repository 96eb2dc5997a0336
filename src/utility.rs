//! Utility samples: reward draws gated by criteria.
//!
//! Rows are versions (in iteration order), columns are paired draws.

use crate::Direction;

/// Added to every baseline utility draw so the baseline wins all-zero ties
/// (for instance before any data has arrived).
pub const BASELINE_BIAS: f64 = 1.0e-10;

/// Reward draws oriented so that higher is always better.
///
/// Missing draws count as 0. For a `lower` reward, draw `j` of a version becomes
/// `max_v reward[v][j] - reward[version][j]`.
pub fn effective_rewards(rewards: &[Vec<f64>], direction: Direction) -> Vec<Vec<f64>> {
    let filled: Vec<Vec<f64>> = rewards
        .iter()
        .map(|row| {
            row.iter()
                .map(|x| if x.is_nan() { 0.0 } else { *x })
                .collect()
        })
        .collect();
    match direction {
        Direction::Higher => filled,
        Direction::Lower => {
            let draws = filled.iter().map(Vec::len).max().unwrap_or(0);
            let max_per_draw: Vec<f64> = (0..draws)
                .map(|j| {
                    filled
                        .iter()
                        .filter_map(|row| row.get(j).copied())
                        .fold(f64::NEG_INFINITY, f64::max)
                })
                .collect();
            filled
                .iter()
                .map(|row| {
                    row.iter()
                        .zip(&max_per_draw)
                        .map(|(x, m)| m - x)
                        .collect()
                })
                .collect()
        }
    }
}

/// `effective_reward * mask`, plus [`BASELINE_BIAS`] on the baseline row.
pub fn utility_samples(
    effective_rewards: &[Vec<f64>],
    criteria_masks: &[Vec<bool>],
    baseline_index: usize,
) -> Vec<Vec<f64>> {
    effective_rewards
        .iter()
        .zip(criteria_masks)
        .enumerate()
        .map(|(i, (reward, mask))| {
            let bias = if i == baseline_index { BASELINE_BIAS } else { 0.0 };
            reward
                .iter()
                .zip(mask)
                .map(|(r, ok)| if *ok { r + bias } else { bias })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_rewards_are_inverted_against_the_per_draw_max() {
        let rewards = vec![vec![0.5, 0.2], vec![0.3, f64::NAN]];
        let eff = effective_rewards(&rewards, Direction::Lower);
        assert_eq!(eff, vec![vec![0.0, 0.0], vec![0.2, 0.2]]);
        let eff = effective_rewards(&rewards, Direction::Higher);
        assert_eq!(eff, vec![vec![0.5, 0.2], vec![0.3, 0.0]]);
    }

    #[test]
    fn failing_draws_contribute_nothing_but_the_baseline_bias() {
        let eff = vec![vec![2.0, 2.0], vec![3.0, 3.0]];
        let masks = vec![vec![true, false], vec![false, true]];
        let u = utility_samples(&eff, &masks, 0);
        assert_eq!(u[0], vec![2.0 + BASELINE_BIAS, BASELINE_BIAS]);
        assert_eq!(u[1], vec![0.0, 3.0]);
    }
}
