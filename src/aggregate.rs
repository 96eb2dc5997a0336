//! Per-version metric aggregation and cross-iteration normalization bounds.
//!
//! A [`VersionAggregate`] is built fresh every iteration from the replayed
//! [`ExperimentState`] and then folded with this iteration's observations. Nothing in
//! here outlives the iteration except what gets copied into the next state.

use std::collections::BTreeMap;

use tracing::warn;

use crate::{
    AggregatedCounterMetric, AggregatedRatioMetric, CounterDataPoint, ExperimentState,
    MetricCatalog, PerVersion, RatioDataPoint, RatioMaxMin, Role, VersionSpec,
    REQUEST_COUNT_METRIC_ID,
};

/// Aggregated counter and ratio values of one version.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionAggregate {
    pub spec: VersionSpec,
    pub role: Role,
    pub counters: BTreeMap<String, AggregatedCounterMetric>,
    pub ratios: BTreeMap<String, AggregatedRatioMetric>,
}

impl VersionAggregate {
    /// Start from the replayed state (missing entries start undefined).
    pub fn new(
        spec: VersionSpec,
        role: Role,
        catalog: &MetricCatalog,
        last_state: Option<&ExperimentState>,
    ) -> Self {
        let prev_counters = last_state.and_then(|s| s.aggregated_counter_metrics.get(&spec.id));
        let prev_ratios = last_state.and_then(|s| s.aggregated_ratio_metrics.get(&spec.id));
        let counters = catalog
            .counter_metrics()
            .keys()
            .map(|id| {
                let prev = prev_counters.and_then(|m| m.get(id)).copied();
                (id.clone(), prev.unwrap_or_default())
            })
            .collect();
        let ratios = catalog
            .ratio_metrics()
            .keys()
            .map(|id| {
                let prev = prev_ratios.and_then(|m| m.get(id)).copied();
                (id.clone(), prev.unwrap_or_default())
            })
            .collect();
        Self {
            spec,
            role,
            counters,
            ratios,
        }
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn is_baseline(&self) -> bool {
        self.role == Role::Baseline
    }

    /// Fold in counter observations. Observations are cumulative since the experiment
    /// start, so a defined observation replaces the aggregate; a missing one keeps it.
    pub fn aggregate_counter_metrics(&mut self, new: Option<&BTreeMap<String, CounterDataPoint>>) {
        for (id, agg) in self.counters.iter_mut() {
            match new.and_then(|m| m.get(id)).and_then(|p| p.value) {
                Some(value) => agg.value = Some(value),
                None => {
                    if agg.value.is_some() {
                        warn!(
                            version = %self.spec.id,
                            metric = %id,
                            "no counter observation; reusing replayed value"
                        );
                    }
                }
            }
        }
    }

    /// Fold in ratio observations with the same replace-or-keep rule as counters.
    pub fn aggregate_ratio_metrics(&mut self, new: Option<&BTreeMap<String, RatioDataPoint>>) {
        for (id, agg) in self.ratios.iter_mut() {
            if let Some(value) = new.and_then(|m| m.get(id)).and_then(|p| p.value) {
                agg.value = Some(value);
            }
        }
    }

    pub fn counter_value(&self, metric_id: &str) -> Option<f64> {
        self.counters.get(metric_id).and_then(|a| a.value)
    }

    pub fn ratio_value(&self, metric_id: &str) -> Option<f64> {
        self.ratios.get(metric_id).and_then(|a| a.value)
    }

    /// Aggregated request count, `0` before any traffic was observed.
    pub fn request_count(&self) -> f64 {
        self.counter_value(REQUEST_COUNT_METRIC_ID).unwrap_or(0.0)
    }
}

/// Widen each ratio metric's bounds with this iteration's observations.
///
/// The previous bounds (if any) and every new defined, finite value are pooled; the
/// new bounds are the min and max of the pool. Metrics with an empty pool stay
/// undefined. Because the previous bounds are in the pool, bounds never shrink.
pub fn update_ratio_max_mins<'a>(
    ratio_metric_ids: impl IntoIterator<Item = &'a String>,
    previous: Option<&BTreeMap<String, RatioMaxMin>>,
    observations: &PerVersion<RatioDataPoint>,
) -> BTreeMap<String, RatioMaxMin> {
    let mut pools: BTreeMap<String, Vec<f64>> = ratio_metric_ids
        .into_iter()
        .map(|id| (id.clone(), Vec::new()))
        .collect();

    if let Some(prev) = previous {
        for (id, pool) in pools.iter_mut() {
            if let Some((lo, hi)) = prev.get(id).and_then(RatioMaxMin::bounds) {
                pool.push(lo);
                pool.push(hi);
            }
        }
    }

    for per_metric in observations.values() {
        for (id, point) in per_metric {
            if let (Some(pool), Some(v)) = (pools.get_mut(id), point.value) {
                if v.is_finite() {
                    pool.push(v);
                }
            }
        }
    }

    pools
        .into_iter()
        .map(|(id, pool)| {
            let bounds = if pool.is_empty() {
                RatioMaxMin::default()
            } else {
                RatioMaxMin {
                    minimum: Some(pool.iter().copied().fold(f64::INFINITY, f64::min)),
                    maximum: Some(pool.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
                }
            };
            (id, bounds)
        })
        .collect()
}
