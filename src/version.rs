//! A version's working set for one iteration: aggregates, beliefs and paired draws.

use std::collections::BTreeMap;

use crate::{draw_seed, BeliefModel, MetricCatalog, RatioMaxMin, VersionAggregate};

#[derive(Debug, Clone, PartialEq)]
pub struct DetailedVersion {
    pub aggregate: VersionAggregate,
    pub beliefs: BTreeMap<String, BeliefModel>,
    /// Ratio metric id → `sample_count` draws. Draw `j` of every version is paired.
    pub samples: BTreeMap<String, Vec<f64>>,
}

impl DetailedVersion {
    /// Update beliefs for every catalog ratio metric and draw `sample_count` samples each.
    pub fn sample(
        aggregate: VersionAggregate,
        catalog: &MetricCatalog,
        ratio_max_mins: &BTreeMap<String, RatioMaxMin>,
        sample_count: usize,
        seed: u64,
    ) -> Self {
        let mut beliefs = BTreeMap::new();
        let mut samples = BTreeMap::new();
        for (id, spec) in catalog.ratio_metrics() {
            let belief = BeliefModel::update(
                spec,
                aggregate.ratio_value(id),
                aggregate.counter_value(&spec.denominator),
                ratio_max_mins.get(id),
            );
            let draws = belief.sample(sample_count, draw_seed(seed, aggregate.id(), id));
            beliefs.insert(id.clone(), belief);
            samples.insert(id.clone(), draws);
        }
        Self {
            aggregate,
            beliefs,
            samples,
        }
    }

    pub fn id(&self) -> &str {
        self.aggregate.id()
    }

    pub fn is_baseline(&self) -> bool {
        self.aggregate.is_baseline()
    }

    pub fn samples_of(&self, metric_id: &str) -> Option<&[f64]> {
        self.samples.get(metric_id).map(Vec::as_slice)
    }

    /// Reward draws: the reward metric's samples, or all ones without a reward metric.
    pub fn reward_sample(&self, catalog: &MetricCatalog, sample_count: usize) -> Vec<f64> {
        match catalog.reward() {
            Some(r) => self
                .samples_of(&r.metric_id)
                .map(<[f64]>::to_vec)
                .unwrap_or_else(|| vec![f64::NAN; sample_count]),
            None => vec![1.0; sample_count],
        }
    }
}
