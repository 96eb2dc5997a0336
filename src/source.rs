//! The seam to the metric backend.
//!
//! The engine never talks to a backend itself. An implementation of [`MetricSource`]
//! resolves counter queries (and, optionally, ratio queries) once per iteration and
//! hands back plain values.
//!
//! ```rust
//! use canarist::{StaticMetricSource, REQUEST_COUNT_METRIC_ID};
//!
//! let source = StaticMetricSource::new()
//!     .with_counter("v1", REQUEST_COUNT_METRIC_ID, 120.0)
//!     .with_counter("v1", "error_count", 3.0);
//! assert_eq!(source.fetch_calls(), 0);
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};

use crate::{
    AggregatedCounterMetric, CounterDataPoint, CounterMetricSpec, MetricFetchFailure, PerVersion,
    RatioDataPoint, RatioMetricSpec, VersionSpec,
};

/// Resolves metric values for a set of versions.
pub trait MetricSource {
    /// Counter values accumulated since `start_time`, per version and metric.
    ///
    /// Versions or metrics with no data may be omitted or carry `value: None`.
    fn fetch_counter_metrics(
        &self,
        counter_specs: &BTreeMap<String, CounterMetricSpec>,
        versions: &[VersionSpec],
        start_time: DateTime<Utc>,
    ) -> Result<PerVersion<CounterDataPoint>, MetricFetchFailure>;

    /// Ratio values per version and metric.
    ///
    /// The default derives each ratio from the already-aggregated counters; backends
    /// that can evaluate ratios natively may override it.
    fn fetch_ratio_metrics(
        &self,
        ratio_specs: &BTreeMap<String, RatioMetricSpec>,
        _counter_specs: &BTreeMap<String, CounterMetricSpec>,
        aggregated_counters: &PerVersion<AggregatedCounterMetric>,
        versions: &[VersionSpec],
        _start_time: DateTime<Utc>,
    ) -> Result<PerVersion<RatioDataPoint>, MetricFetchFailure> {
        Ok(derive_ratio_metrics(ratio_specs, aggregated_counters, versions))
    }
}

/// `numerator / denominator` from aggregated counters.
///
/// Undefined when either side is undefined or the denominator is zero.
pub fn derive_ratio_metrics(
    ratio_specs: &BTreeMap<String, RatioMetricSpec>,
    aggregated_counters: &PerVersion<AggregatedCounterMetric>,
    versions: &[VersionSpec],
) -> PerVersion<RatioDataPoint> {
    let mut out = PerVersion::new();
    for v in versions {
        let counters = aggregated_counters.get(&v.id);
        let lookup = |id: &str| {
            counters
                .and_then(|m| m.get(id))
                .and_then(|a| a.value)
        };
        let ratios = ratio_specs
            .values()
            .map(|spec| {
                let value = match (lookup(&spec.numerator), lookup(&spec.denominator)) {
                    (Some(n), Some(d)) if d != 0.0 => Some(n / d),
                    _ => None,
                };
                (spec.id.clone(), RatioDataPoint { value })
            })
            .collect();
        out.insert(v.id.clone(), ratios);
    }
    out
}

/// In-memory source: values are fixed up front.
///
/// Useful for replaying recorded observations and for tests. Only metrics and
/// versions that were asked for are returned.
#[derive(Debug, Default)]
pub struct StaticMetricSource {
    counters: PerVersion<CounterDataPoint>,
    ratios: Option<PerVersion<RatioDataPoint>>,
    calls: AtomicUsize,
}

impl StaticMetricSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_counter(mut self, version: &str, metric: &str, value: f64) -> Self {
        self.counters
            .entry(version.to_string())
            .or_default()
            .insert(metric.to_string(), CounterDataPoint { value: Some(value) });
        self
    }

    /// Override the derived ratio for one version and metric.
    pub fn with_ratio(mut self, version: &str, metric: &str, value: f64) -> Self {
        self.ratios
            .get_or_insert_with(PerVersion::new)
            .entry(version.to_string())
            .or_default()
            .insert(metric.to_string(), RatioDataPoint { value: Some(value) });
        self
    }

    /// Number of fetch calls served so far.
    pub fn fetch_calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl MetricSource for StaticMetricSource {
    fn fetch_counter_metrics(
        &self,
        counter_specs: &BTreeMap<String, CounterMetricSpec>,
        versions: &[VersionSpec],
        _start_time: DateTime<Utc>,
    ) -> Result<PerVersion<CounterDataPoint>, MetricFetchFailure> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let mut out = PerVersion::new();
        for v in versions {
            let known = self.counters.get(&v.id);
            let points = counter_specs
                .keys()
                .filter_map(|id| known.and_then(|m| m.get(id)).map(|p| (id.clone(), *p)))
                .collect();
            out.insert(v.id.clone(), points);
        }
        Ok(out)
    }

    fn fetch_ratio_metrics(
        &self,
        ratio_specs: &BTreeMap<String, RatioMetricSpec>,
        _counter_specs: &BTreeMap<String, CounterMetricSpec>,
        aggregated_counters: &PerVersion<AggregatedCounterMetric>,
        versions: &[VersionSpec],
        _start_time: DateTime<Utc>,
    ) -> Result<PerVersion<RatioDataPoint>, MetricFetchFailure> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let mut out = derive_ratio_metrics(ratio_specs, aggregated_counters, versions);
        if let Some(overrides) = &self.ratios {
            for (version, metrics) in overrides {
                let Some(row) = out.get_mut(version) else {
                    continue;
                };
                for (metric, point) in metrics {
                    if ratio_specs.contains_key(metric) {
                        row.insert(metric.clone(), *point);
                    }
                }
            }
        }
        Ok(out)
    }
}
