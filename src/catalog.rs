//! Metric catalog: the validated set of metrics one experiment depends on.
//!
//! Construction is all-or-nothing. Every rule is checked before any metric is
//! fetched, so a bad request never costs backend I/O.

use std::collections::BTreeMap;

use tracing::error;

use crate::{
    ConfigurationError, CounterMetricSpec, Criterion, Direction, MetricSpecs, RatioMetricSpec,
    ThresholdType, REQUEST_COUNT_METRIC_ID,
};

/// The reward signal of an experiment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardMetric {
    pub metric_id: String,
    pub preferred_direction: Direction,
}

/// What a criterion's metric id resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Ratio,
}

/// Counter and ratio specs relevant to one experiment, indexed by id.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricCatalog {
    counter_metrics: BTreeMap<String, CounterMetricSpec>,
    ratio_metrics: BTreeMap<String, RatioMetricSpec>,
    criteria: Vec<Criterion>,
    reward: Option<RewardMetric>,
}

impl MetricCatalog {
    /// Validate raw metric specs against the criteria list.
    ///
    /// Only metrics reachable from the criteria (plus the mandatory request count)
    /// end up in the catalog.
    pub fn new(specs: &MetricSpecs, criteria: &[Criterion]) -> Result<Self, ConfigurationError> {
        let all_counters: BTreeMap<&str, &CounterMetricSpec> = specs
            .counter_metrics
            .iter()
            .map(|c| (c.id.as_str(), c))
            .collect();
        let all_ratios: BTreeMap<&str, &RatioMetricSpec> = specs
            .ratio_metrics
            .iter()
            .map(|r| (r.id.as_str(), r))
            .collect();

        let mut counter_metrics = BTreeMap::new();
        let mut ratio_metrics = BTreeMap::new();

        match all_counters.get(REQUEST_COUNT_METRIC_ID) {
            Some(spec) => {
                counter_metrics.insert(spec.id.clone(), (*spec).clone());
            }
            None => {
                error!(metric_id = REQUEST_COUNT_METRIC_ID, "mandatory metric missing");
                return Err(ConfigurationError::MissingMandatoryMetric {
                    metric_id: REQUEST_COUNT_METRIC_ID.to_string(),
                });
            }
        }

        for cri in criteria {
            let metric_id = cri.metric_id.as_str();
            if let Some(spec) = all_counters.get(metric_id) {
                if cri.is_reward {
                    error!(metric_id, criterion = %cri.id, "counter metric used as reward");
                    return Err(ConfigurationError::RewardOnNonRatioMetric {
                        metric_id: metric_id.to_string(),
                    });
                }
                if cri
                    .threshold
                    .is_some_and(|t| t.threshold_type == ThresholdType::Relative)
                {
                    error!(metric_id, criterion = %cri.id, "relative threshold on counter metric");
                    return Err(ConfigurationError::RelativeThresholdOnCounterMetric {
                        metric_id: metric_id.to_string(),
                    });
                }
                counter_metrics.insert(spec.id.clone(), (*spec).clone());
            } else if let Some(spec) = all_ratios.get(metric_id) {
                for counter_id in [&spec.numerator, &spec.denominator] {
                    let Some(counter) = all_counters.get(counter_id.as_str()) else {
                        error!(
                            metric_id,
                            counter_metric_id = %counter_id,
                            "unknown numerator or denominator"
                        );
                        return Err(ConfigurationError::UnknownNumeratorOrDenominator {
                            ratio_metric_id: spec.id.clone(),
                            counter_metric_id: counter_id.clone(),
                        });
                    };
                    counter_metrics.insert(counter.id.clone(), (*counter).clone());
                }
                ratio_metrics.insert(spec.id.clone(), (*spec).clone());
            } else {
                error!(metric_id, criterion = %cri.id, "unknown metric id in criteria");
                return Err(ConfigurationError::UnknownMetricId {
                    metric_id: metric_id.to_string(),
                });
            }
        }

        let rewards: Vec<&Criterion> = criteria.iter().filter(|c| c.is_reward).collect();
        if rewards.len() > 1 {
            error!(count = rewards.len(), "more than one reward criterion");
            return Err(ConfigurationError::MultipleRewardCriteria {
                criteria: rewards.iter().map(|c| c.id.clone()).collect(),
            });
        }
        // A reward criterion passed the loop above, so it resolves to a ratio metric.
        let reward = rewards.first().and_then(|c| {
            ratio_metrics.get(&c.metric_id).map(|spec| RewardMetric {
                metric_id: spec.id.clone(),
                preferred_direction: spec.preferred_direction,
            })
        });

        Ok(Self {
            counter_metrics,
            ratio_metrics,
            criteria: criteria.to_vec(),
            reward,
        })
    }

    pub fn counter_metrics(&self) -> &BTreeMap<String, CounterMetricSpec> {
        &self.counter_metrics
    }

    pub fn ratio_metrics(&self) -> &BTreeMap<String, RatioMetricSpec> {
        &self.ratio_metrics
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn reward(&self) -> Option<&RewardMetric> {
        self.reward.as_ref()
    }

    /// Preferred direction of the reward; `higher` when no reward is configured.
    pub fn preferred_reward_direction(&self) -> Direction {
        self.reward
            .as_ref()
            .map_or(Direction::Higher, |r| r.preferred_direction)
    }

    pub fn kind_of(&self, metric_id: &str) -> Option<MetricKind> {
        if self.ratio_metrics.contains_key(metric_id) {
            Some(MetricKind::Ratio)
        } else if self.counter_metrics.contains_key(metric_id) {
            Some(MetricKind::Counter)
        } else {
            None
        }
    }
}
