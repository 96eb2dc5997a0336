//! Per-iteration tuning knobs ("advanced parameters").
//!
//! These travel with each request rather than living in process-wide settings.
//! Start with [`AdvancedParameters::default()`] and adjust with the `with_*` methods.

use crate::ConfigurationError;

/// Upper bound on the Monte Carlo sample count, keeping per-iteration cost predictable.
pub const MAX_SAMPLE_COUNT: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AdvancedParameters {
    /// Share of traffic (percent, `0..=100`) kept uniform across versions.
    pub exploration_traffic_percentage: f64,
    /// A winner is declared only when its win probability strictly exceeds this.
    pub min_posterior_probability_for_winner: f64,
    /// Monte Carlo draws per version and ratio metric (`1..=MAX_SAMPLE_COUNT`).
    pub sample_count: usize,
    /// Seed for all posterior sampling.
    pub seed: u64,
}

impl Default for AdvancedParameters {
    fn default() -> Self {
        Self {
            exploration_traffic_percentage: 5.0,
            min_posterior_probability_for_winner: 0.99,
            sample_count: 5_000,
            seed: 0,
        }
    }
}

impl AdvancedParameters {
    pub fn with_exploration_traffic_percentage(mut self, pct: f64) -> Self {
        self.exploration_traffic_percentage = pct;
        self
    }

    pub fn with_min_posterior_probability_for_winner(mut self, p: f64) -> Self {
        self.min_posterior_probability_for_winner = p;
        self
    }

    pub fn with_sample_count(mut self, n: usize) -> Self {
        self.sample_count = n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Exploration traffic as a fraction in `[0, 1]`.
    pub fn exploration_fraction(&self) -> f64 {
        self.exploration_traffic_percentage / 100.0
    }

    /// Check ranges. Non-finite values are rejected.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let etp = self.exploration_traffic_percentage;
        if !(etp.is_finite() && (0.0..=100.0).contains(&etp)) {
            return Err(ConfigurationError::InvalidAdvancedParameter {
                name: "exploration_traffic_percentage",
                reason: format!("{etp} is outside [0, 100]"),
            });
        }
        let p = self.min_posterior_probability_for_winner;
        if !(p.is_finite() && (0.0..=1.0).contains(&p)) {
            return Err(ConfigurationError::InvalidAdvancedParameter {
                name: "min_posterior_probability_for_winner",
                reason: format!("{p} is outside [0, 1]"),
            });
        }
        if self.sample_count == 0 || self.sample_count > MAX_SAMPLE_COUNT {
            return Err(ConfigurationError::InvalidAdvancedParameter {
                name: "sample_count",
                reason: format!("{} is outside [1, {MAX_SAMPLE_COUNT}]", self.sample_count),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let p = AdvancedParameters::default();
        assert!(p.validate().is_ok());
        assert!((p.exploration_fraction() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let bad = [
            AdvancedParameters::default().with_exploration_traffic_percentage(101.0),
            AdvancedParameters::default().with_exploration_traffic_percentage(f64::NAN),
            AdvancedParameters::default().with_min_posterior_probability_for_winner(-0.1),
            AdvancedParameters::default().with_sample_count(0),
            AdvancedParameters::default().with_sample_count(MAX_SAMPLE_COUNT + 1),
        ];
        for p in bad {
            assert!(
                matches!(
                    p.validate(),
                    Err(ConfigurationError::InvalidAdvancedParameter { .. })
                ),
                "{p:?}"
            );
        }
    }
}
