//! Shared fixtures for integration tests.
#![allow(dead_code)]

use canarist::{
    AdvancedParameters, CounterMetricSpec, Criterion, Direction, IterationParameters, MetricSpecs,
    RatioMetricSpec, VersionSpec, REQUEST_COUNT_METRIC_ID,
};
use chrono::{TimeZone, Utc};

/// Counters: request count, error count, latency sum.
/// Ratios: `error_rate` (lower, zero-to-one), `mean_latency` (lower), `conversion_rate` (higher).
pub fn metric_specs() -> MetricSpecs {
    MetricSpecs {
        counter_metrics: vec![
            CounterMetricSpec::new(REQUEST_COUNT_METRIC_ID),
            CounterMetricSpec::new("error_count"),
            CounterMetricSpec::new("latency_sum"),
            CounterMetricSpec::new("conversions"),
        ],
        ratio_metrics: vec![
            RatioMetricSpec::new("error_rate", "error_count", REQUEST_COUNT_METRIC_ID, Direction::Lower)
                .zero_to_one(),
            RatioMetricSpec::new("mean_latency", "latency_sum", REQUEST_COUNT_METRIC_ID, Direction::Lower),
            RatioMetricSpec::new("conversion_rate", "conversions", REQUEST_COUNT_METRIC_ID, Direction::Higher)
                .zero_to_one(),
        ],
    }
}

pub fn params(candidates: &[&str], criteria: Vec<Criterion>) -> IterationParameters {
    IterationParameters {
        start_time: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        baseline: VersionSpec::new("baseline").with_label("version", "v1"),
        candidates: candidates
            .iter()
            .map(|c| VersionSpec::new(*c).with_label("version", *c))
            .collect(),
        metric_specs: metric_specs(),
        criteria,
        last_state: None,
        advanced_parameters: AdvancedParameters::default().with_sample_count(1_000),
    }
}
