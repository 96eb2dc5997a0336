//! Request and response data model.
//!
//! Everything in here is plain data: specs as sent by the caller, observations as
//! returned by a [`MetricSource`][crate::MetricSource], the state replayed between
//! iterations, and the assessment payload handed back to the transport layer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::AdvancedParameters;

/// Reserved id of the mandatory total-request-count counter metric.
pub const REQUEST_COUNT_METRIC_ID: &str = "request_count";

/// Preferred optimization direction of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    #[default]
    Higher,
    Lower,
}

impl Direction {
    /// Whether `value` meets `target` in this direction (`>=` for higher, `<=` for lower).
    ///
    /// Missing (NaN) values never satisfy anything.
    #[inline]
    pub fn satisfies(self, value: f64, target: f64) -> bool {
        match self {
            Direction::Higher => value >= target,
            Direction::Lower => value <= target,
        }
    }

    /// Whether `value` is strictly better than `other`.
    #[inline]
    pub fn beats(self, value: f64, other: f64) -> bool {
        match self {
            Direction::Higher => value > other,
            Direction::Lower => value < other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ThresholdType {
    /// Compare against a constant.
    Absolute,
    /// Compare against the baseline's value scaled by the threshold value.
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Threshold {
    pub threshold_type: ThresholdType,
    pub value: f64,
}

impl Threshold {
    pub fn absolute(value: f64) -> Self {
        Self {
            threshold_type: ThresholdType::Absolute,
            value,
        }
    }

    pub fn relative(value: f64) -> Self {
        Self {
            threshold_type: ThresholdType::Relative,
            value,
        }
    }
}

/// A cumulative counter, aggregated by the backend since the experiment start.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CounterMetricSpec {
    pub id: String,
    /// Backend query template; opaque here.
    #[cfg_attr(feature = "serde", serde(default))]
    pub query_template: String,
    /// Direction used for absolute thresholds. Unset means the threshold is an upper bound.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub preferred_direction: Option<Direction>,
}

impl CounterMetricSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            query_template: String::new(),
            preferred_direction: None,
        }
    }

    /// Direction applied when comparing this counter against a threshold.
    pub fn threshold_direction(&self) -> Direction {
        self.preferred_direction.unwrap_or(Direction::Lower)
    }
}

/// A metric derived as `numerator / denominator` of two counters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RatioMetricSpec {
    pub id: String,
    pub numerator: String,
    pub denominator: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub preferred_direction: Direction,
    /// The ratio is known to lie in `[0, 1]` (error rates, conversion rates).
    #[cfg_attr(feature = "serde", serde(default))]
    pub zero_to_one: bool,
}

impl RatioMetricSpec {
    pub fn new(
        id: impl Into<String>,
        numerator: impl Into<String>,
        denominator: impl Into<String>,
        preferred_direction: Direction,
    ) -> Self {
        Self {
            id: id.into(),
            numerator: numerator.into(),
            denominator: denominator.into(),
            preferred_direction,
            zero_to_one: false,
        }
    }

    pub fn zero_to_one(mut self) -> Self {
        self.zero_to_one = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricSpecs {
    #[cfg_attr(feature = "serde", serde(default))]
    pub counter_metrics: Vec<CounterMetricSpec>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub ratio_metrics: Vec<RatioMetricSpec>,
}

/// A pass/fail condition on a metric, optionally the experiment's reward.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Criterion {
    pub id: String,
    pub metric_id: String,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub threshold: Option<Threshold>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_reward: bool,
}

impl Criterion {
    pub fn new(id: impl Into<String>, metric_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metric_id: metric_id.into(),
            threshold: None,
            is_reward: false,
        }
    }

    pub fn with_threshold(mut self, threshold: Threshold) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn reward(mut self) -> Self {
        self.is_reward = true;
        self
    }
}

/// A version under test. Labels are the opaque descriptor handed to the metric source.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VersionSpec {
    pub id: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub version_labels: BTreeMap<String, String>,
}

impl VersionSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version_labels: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.version_labels.insert(key.into(), value.into());
        self
    }
}

/// Role of a version within one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Reference point for relative thresholds; receives the tie-breaking bias.
    Baseline,
    Candidate,
}

/// One counter observation for one version.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CounterDataPoint {
    pub value: Option<f64>,
}

/// One ratio observation for one version.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RatioDataPoint {
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AggregatedCounterMetric {
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AggregatedRatioMetric {
    pub value: Option<f64>,
}

/// Running bounds of a ratio metric across every iteration seen so far.
///
/// Both ends are set together; once set they only ever widen.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RatioMaxMin {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

impl RatioMaxMin {
    /// `(minimum, maximum)` when both are defined.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match (self.minimum, self.maximum) {
            (Some(lo), Some(hi)) => Some((lo, hi)),
            _ => None,
        }
    }
}

/// Version id → metric id → value.
pub type PerVersion<T> = BTreeMap<String, BTreeMap<String, T>>;

/// The only data carried from one iteration to the next.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExperimentState {
    #[cfg_attr(feature = "serde", serde(default))]
    pub aggregated_counter_metrics: PerVersion<AggregatedCounterMetric>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub aggregated_ratio_metrics: PerVersion<AggregatedRatioMetric>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub ratio_max_mins: BTreeMap<String, RatioMaxMin>,
}

/// Everything one iteration needs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IterationParameters {
    pub start_time: DateTime<Utc>,
    pub baseline: VersionSpec,
    #[cfg_attr(feature = "serde", serde(default))]
    pub candidates: Vec<VersionSpec>,
    pub metric_specs: MetricSpecs,
    #[cfg_attr(feature = "serde", serde(default))]
    pub criteria: Vec<Criterion>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub last_state: Option<ExperimentState>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub advanced_parameters: AdvancedParameters,
}

// ============================================================================
// Assessment payload
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CredibleInterval {
    pub lower: f64,
    pub upper: f64,
}

/// Posterior summaries of a ratio metric for one version.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RatioStatistics {
    pub sample_mean: f64,
    pub credible_interval: CredibleInterval,
    /// Fraction of draws strictly better than the baseline's paired draw.
    pub probability_of_beating_baseline: f64,
    /// Fraction of draws where this version is (jointly) best.
    pub probability_of_being_best_version: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Statistics {
    pub value: Option<f64>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub ratio_statistics: Option<RatioStatistics>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThresholdAssessment {
    pub threshold_breached: bool,
    pub probability_of_satisfying_threshold: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CriterionAssessment {
    pub id: String,
    pub metric_id: String,
    pub statistics: Statistics,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub threshold_assessment: Option<ThresholdAssessment>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VersionAssessment {
    pub id: String,
    pub request_count: f64,
    pub criterion_assessments: Vec<CriterionAssessment>,
    pub win_probability: f64,
}

/// Integer traffic percentages per version id; each map sums to 100.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrafficSplitRecommendation {
    pub progressive: BTreeMap<String, u32>,
    pub top_2: BTreeMap<String, u32>,
    pub uniform: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WinnerAssessment {
    pub winning_version_found: bool,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub current_winner: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub winning_probability: Option<f64>,
}

/// Result of one iteration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssessmentResult {
    pub baseline_assessment: VersionAssessment,
    pub candidate_assessments: Vec<VersionAssessment>,
    pub traffic_split_recommendation: TrafficSplitRecommendation,
    pub winner_assessment: WinnerAssessment,
    /// Replay this as `last_state` on the next iteration.
    pub last_state: ExperimentState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_comparisons_reject_missing_values() {
        assert!(Direction::Higher.satisfies(2.0, 2.0));
        assert!(!Direction::Higher.satisfies(1.9, 2.0));
        assert!(Direction::Lower.satisfies(1.9, 2.0));
        assert!(!Direction::Lower.satisfies(f64::NAN, 2.0));
        assert!(!Direction::Higher.satisfies(f64::NAN, 2.0));
        assert!(Direction::Lower.beats(1.0, 2.0));
        assert!(!Direction::Lower.beats(2.0, 2.0));
    }

    #[test]
    fn counter_thresholds_default_to_upper_bounds() {
        let c = CounterMetricSpec::new("error_count");
        assert_eq!(c.threshold_direction(), Direction::Lower);
        let c = CounterMetricSpec {
            preferred_direction: Some(Direction::Higher),
            ..CounterMetricSpec::new("conversions")
        };
        assert_eq!(c.threshold_direction(), Direction::Higher);
    }

    #[test]
    fn ratio_max_min_bounds_need_both_ends() {
        assert_eq!(RatioMaxMin::default().bounds(), None);
        let m = RatioMaxMin {
            minimum: Some(0.1),
            maximum: Some(0.4),
        };
        assert_eq!(m.bounds(), Some((0.1, 0.4)));
    }
}
