//! One iteration of a canary experiment, end to end.
//!
//! ```text
//! validate ─▶ fetch counters ─▶ aggregate ─▶ fetch ratios ─▶ widen bounds
//!          ─▶ sample beliefs ─▶ criteria masks ─▶ utilities
//!          ─▶ win probabilities + traffic splits ─▶ AssessmentResult
//! ```
//!
//! Validation happens in [`Experiment::new`], so a rejected request never reaches
//! the metric source. All sampling finishes before utilities are computed, since
//! ranking compares draw `j` of every version.
//!
//! ```rust
//! use canarist::*;
//!
//! let params = IterationParameters {
//!     start_time: chrono::Utc::now(),
//!     baseline: VersionSpec::new("reviews-v1"),
//!     candidates: vec![VersionSpec::new("reviews-v2")],
//!     metric_specs: MetricSpecs {
//!         counter_metrics: vec![
//!             CounterMetricSpec::new(REQUEST_COUNT_METRIC_ID),
//!             CounterMetricSpec::new("error_count"),
//!         ],
//!         ratio_metrics: vec![RatioMetricSpec::new(
//!             "error_rate",
//!             "error_count",
//!             REQUEST_COUNT_METRIC_ID,
//!             Direction::Lower,
//!         )
//!         .zero_to_one()],
//!     },
//!     criteria: vec![Criterion::new("errors", "error_rate").with_threshold(Threshold::absolute(0.02))],
//!     last_state: None,
//!     advanced_parameters: AdvancedParameters::default().with_sample_count(500),
//! };
//! let source = StaticMetricSource::new()
//!     .with_counter("reviews-v1", REQUEST_COUNT_METRIC_ID, 1000.0)
//!     .with_counter("reviews-v1", "error_count", 50.0)
//!     .with_counter("reviews-v2", REQUEST_COUNT_METRIC_ID, 1000.0)
//!     .with_counter("reviews-v2", "error_count", 1.0);
//!
//! let result = Experiment::new(params).unwrap().run(&source).unwrap();
//! assert_eq!(result.traffic_split_recommendation.progressive.values().sum::<u32>(), 100);
//! assert!(result.candidate_assessments[0].win_probability > 0.9);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use tracing::{error, info};

use crate::{
    assess_winner, effective_rewards, evaluate_criteria, recommend_traffic, update_ratio_max_mins,
    utility_samples, win_probabilities, AssessmentResult, ConfigurationError, DetailedVersion,
    ExperimentState, IterationParameters, MetricCatalog, MetricSource, PerVersion, RatioMaxMin,
    Result, Role, VersionAggregate, VersionAssessment, VersionSpec,
};

/// A validated experiment, ready to run one iteration.
#[derive(Debug, Clone)]
pub struct Experiment {
    params: IterationParameters,
    catalog: MetricCatalog,
}

impl Experiment {
    /// Validate the request. Nothing is fetched here.
    pub fn new(params: IterationParameters) -> std::result::Result<Self, ConfigurationError> {
        params.advanced_parameters.validate()?;

        let mut seen = BTreeSet::new();
        for v in std::iter::once(&params.baseline).chain(&params.candidates) {
            if !seen.insert(v.id.as_str()) {
                error!(version = %v.id, "duplicate version id");
                return Err(ConfigurationError::DuplicateVersionId {
                    version_id: v.id.clone(),
                });
            }
        }

        let catalog = MetricCatalog::new(&params.metric_specs, &params.criteria)?;
        Ok(Self { params, catalog })
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    pub fn params(&self) -> &IterationParameters {
        &self.params
    }

    /// Candidates in request order, then the baseline. Ties in apportionment and
    /// winner selection follow this order.
    pub fn version_specs(&self) -> Vec<VersionSpec> {
        self.params
            .candidates
            .iter()
            .chain(std::iter::once(&self.params.baseline))
            .cloned()
            .collect()
    }

    /// Run one iteration against `source`.
    pub fn run<S: MetricSource + ?Sized>(&self, source: &S) -> Result<AssessmentResult> {
        let (aggregates, ratio_max_mins) = self.populate_metric_values(source)?;
        let adv = &self.params.advanced_parameters;
        let sample_count = adv.sample_count;
        let baseline_index = self.params.candidates.len();

        let versions: Vec<DetailedVersion> = aggregates
            .into_iter()
            .map(|a| DetailedVersion::sample(a, &self.catalog, &ratio_max_mins, sample_count, adv.seed))
            .collect();

        let evaluations: Vec<_> = (0..versions.len())
            .map(|i| evaluate_criteria(&self.catalog, &versions, i, baseline_index, sample_count))
            .collect();
        let rewards: Vec<Vec<f64>> = versions
            .iter()
            .map(|v| v.reward_sample(&self.catalog, sample_count))
            .collect();
        let masks: Vec<Vec<bool>> = evaluations.iter().map(|e| e.criteria_mask.clone()).collect();

        let effective = effective_rewards(&rewards, self.catalog.preferred_reward_direction());
        let utilities = utility_samples(&effective, &masks, baseline_index);

        let ids: Vec<&str> = versions.iter().map(DetailedVersion::id).collect();
        let win = win_probabilities(&utilities);
        let winner_assessment =
            assess_winner(&ids, &win, adv.min_posterior_probability_for_winner);
        let traffic_split_recommendation =
            recommend_traffic(&ids, &utilities, adv.exploration_fraction());

        info!(
            versions = versions.len(),
            sample_count,
            winner_found = winner_assessment.winning_version_found,
            "iteration assessed"
        );

        let last_state = ExperimentState {
            aggregated_counter_metrics: versions
                .iter()
                .map(|v| (v.id().to_string(), v.aggregate.counters.clone()))
                .collect(),
            aggregated_ratio_metrics: versions
                .iter()
                .map(|v| (v.id().to_string(), v.aggregate.ratios.clone()))
                .collect(),
            ratio_max_mins,
        };

        let mut assessments: Vec<VersionAssessment> = versions
            .iter()
            .zip(evaluations)
            .zip(&win)
            .map(|((v, e), p)| VersionAssessment {
                id: v.id().to_string(),
                request_count: v.aggregate.request_count(),
                criterion_assessments: e.assessments,
                win_probability: *p,
            })
            .collect();
        // The baseline is always present and always last.
        let baseline_assessment = assessments.remove(baseline_index);

        Ok(AssessmentResult {
            baseline_assessment,
            candidate_assessments: assessments,
            traffic_split_recommendation,
            winner_assessment,
            last_state,
        })
    }

    /// Fetch and fold this iteration's observations into fresh per-version aggregates.
    fn populate_metric_values<S: MetricSource + ?Sized>(
        &self,
        source: &S,
    ) -> Result<(Vec<VersionAggregate>, BTreeMap<String, RatioMaxMin>)> {
        let specs = self.version_specs();
        let baseline_index = self.params.candidates.len();
        let last_state = self.params.last_state.as_ref();
        let start_time = self.params.start_time;

        let mut aggregates: Vec<VersionAggregate> = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let role = if i == baseline_index {
                    Role::Baseline
                } else {
                    Role::Candidate
                };
                VersionAggregate::new(spec.clone(), role, &self.catalog, last_state)
            })
            .collect();

        let new_counters =
            source.fetch_counter_metrics(self.catalog.counter_metrics(), &specs, start_time)?;
        for a in aggregates.iter_mut() {
            a.aggregate_counter_metrics(new_counters.get(a.id()));
        }

        let aggregated_counters: PerVersion<_> = aggregates
            .iter()
            .map(|a| (a.id().to_string(), a.counters.clone()))
            .collect();
        let new_ratios = source.fetch_ratio_metrics(
            self.catalog.ratio_metrics(),
            self.catalog.counter_metrics(),
            &aggregated_counters,
            &specs,
            start_time,
        )?;

        let ratio_max_mins = update_ratio_max_mins(
            self.catalog.ratio_metrics().keys(),
            last_state.map(|s| &s.ratio_max_mins),
            &new_ratios,
        );
        for a in aggregates.iter_mut() {
            a.aggregate_ratio_metrics(new_ratios.get(a.id()));
        }

        Ok((aggregates, ratio_max_mins))
    }
}

/// Validate `params` and run one iteration.
pub fn run_iteration<S: MetricSource + ?Sized>(
    params: IterationParameters,
    source: &S,
) -> Result<AssessmentResult> {
    Experiment::new(params)?.run(source)
}
