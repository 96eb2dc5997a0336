//! Criteria evaluation on paired posterior draws.
//!
//! For every non-reward criterion with a threshold, each draw of a version either
//! satisfies the threshold or not. The version's criteria mask is the draw-wise AND
//! of those vectors (all true when there is nothing to check).
//!
//! Relative thresholds compare draw `j` of the version against draw `j` of the
//! baseline scaled by the threshold value. The baseline is compared against itself
//! the same way.

use crate::{
    CredibleInterval, Criterion, CriterionAssessment, DetailedVersion, Direction, MetricCatalog,
    MetricKind, RatioStatistics, Statistics, ThresholdAssessment, ThresholdType,
};

/// Draw-wise criteria results for one version.
#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaEvaluation {
    /// AND over every non-reward criterion's satisfaction vector.
    pub criteria_mask: Vec<bool>,
    /// One entry per criterion, in request order.
    pub assessments: Vec<CriterionAssessment>,
}

/// Evaluate every criterion for `versions[index]`.
pub fn evaluate_criteria(
    catalog: &MetricCatalog,
    versions: &[DetailedVersion],
    index: usize,
    baseline_index: usize,
    sample_count: usize,
) -> CriteriaEvaluation {
    let version = &versions[index];
    let baseline = &versions[baseline_index];
    let mut criteria_mask = vec![true; sample_count];
    let mut assessments = Vec::with_capacity(catalog.criteria().len());

    for cri in catalog.criteria() {
        let satisfied = satisfaction(catalog, cri, version, baseline, sample_count);
        if let Some(mask) = &satisfied {
            if !cri.is_reward {
                for (m, s) in criteria_mask.iter_mut().zip(mask) {
                    *m &= *s;
                }
            }
        }
        let threshold_assessment = satisfied.map(|mask| {
            let p = fraction(mask.iter().filter(|s| **s).count(), sample_count);
            ThresholdAssessment {
                threshold_breached: p < 0.5,
                probability_of_satisfying_threshold: p,
            }
        });
        assessments.push(CriterionAssessment {
            id: cri.id.clone(),
            metric_id: cri.metric_id.clone(),
            statistics: statistics(catalog, cri, versions, index, baseline_index),
            threshold_assessment,
        });
    }

    CriteriaEvaluation {
        criteria_mask,
        assessments,
    }
}

/// Satisfaction per draw, `None` when the criterion has no threshold.
fn satisfaction(
    catalog: &MetricCatalog,
    cri: &Criterion,
    version: &DetailedVersion,
    baseline: &DetailedVersion,
    sample_count: usize,
) -> Option<Vec<bool>> {
    let threshold = cri.threshold?;
    match catalog.kind_of(&cri.metric_id)? {
        MetricKind::Counter => {
            let direction = catalog.counter_metrics()[&cri.metric_id].threshold_direction();
            // Counters are not sampled: the aggregate decides every draw alike.
            let ok = version
                .aggregate
                .counter_value(&cri.metric_id)
                .is_some_and(|v| direction.satisfies(v, threshold.value));
            Some(vec![ok; sample_count])
        }
        MetricKind::Ratio => {
            let direction = catalog.ratio_metrics()[&cri.metric_id].preferred_direction;
            let draws = version.samples_of(&cri.metric_id)?;
            let mask = match threshold.threshold_type {
                ThresholdType::Absolute => draws
                    .iter()
                    .map(|x| direction.satisfies(*x, threshold.value))
                    .collect(),
                ThresholdType::Relative => {
                    let reference = baseline.samples_of(&cri.metric_id)?;
                    draws
                        .iter()
                        .zip(reference)
                        .map(|(x, b)| direction.satisfies(*x, b * threshold.value))
                        .collect()
                }
            };
            Some(mask)
        }
    }
}

fn statistics(
    catalog: &MetricCatalog,
    cri: &Criterion,
    versions: &[DetailedVersion],
    index: usize,
    baseline_index: usize,
) -> Statistics {
    let version = &versions[index];
    match catalog.kind_of(&cri.metric_id) {
        Some(MetricKind::Counter) => Statistics {
            value: version.aggregate.counter_value(&cri.metric_id),
            ratio_statistics: None,
        },
        Some(MetricKind::Ratio) => {
            let direction = catalog.ratio_metrics()[&cri.metric_id].preferred_direction;
            Statistics {
                value: version.aggregate.ratio_value(&cri.metric_id),
                ratio_statistics: ratio_statistics(
                    &cri.metric_id,
                    direction,
                    versions,
                    index,
                    baseline_index,
                ),
            }
        }
        None => Statistics::default(),
    }
}

fn ratio_statistics(
    metric_id: &str,
    direction: Direction,
    versions: &[DetailedVersion],
    index: usize,
    baseline_index: usize,
) -> Option<RatioStatistics> {
    let draws = versions[index].samples_of(metric_id)?;
    let mut defined: Vec<f64> = draws.iter().copied().filter(|x| !x.is_nan()).collect();
    if defined.is_empty() {
        return None;
    }
    defined.sort_by(f64::total_cmp);
    let sample_mean = defined.iter().sum::<f64>() / defined.len() as f64;

    let baseline = versions[baseline_index].samples_of(metric_id).unwrap_or(&[]);
    let beats_baseline = draws
        .iter()
        .zip(baseline)
        .filter(|(x, b)| direction.beats(**x, **b))
        .count();

    let others: Vec<&[f64]> = versions
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .filter_map(|(_, v)| v.samples_of(metric_id))
        .collect();
    let best = draws
        .iter()
        .enumerate()
        .filter(|(j, x)| {
            !x.is_nan()
                && others
                    .iter()
                    .all(|o| o.get(*j).map_or(true, |y| !direction.beats(*y, **x)))
        })
        .count();

    Some(RatioStatistics {
        sample_mean,
        credible_interval: CredibleInterval {
            lower: quantile(&defined, 0.025),
            upper: quantile(&defined, 0.975),
        },
        probability_of_beating_baseline: fraction(beats_baseline, draws.len()),
        probability_of_being_best_version: fraction(best, draws.len()),
    })
}

/// Nearest-rank quantile of a sorted, non-empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = (q * (sorted.len() - 1) as f64).round() as usize;
    sorted[pos.min(sorted.len() - 1)]
}

fn fraction(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        CounterMetricSpec, MetricSpecs, RatioMetricSpec, Role, Threshold, VersionAggregate,
        VersionSpec, REQUEST_COUNT_METRIC_ID,
    };
    use std::collections::BTreeMap;

    fn specs() -> MetricSpecs {
        MetricSpecs {
            counter_metrics: vec![
                CounterMetricSpec::new(REQUEST_COUNT_METRIC_ID),
                CounterMetricSpec::new("errors"),
                CounterMetricSpec::new("latency_sum"),
            ],
            ratio_metrics: vec![RatioMetricSpec::new(
                "mean_latency",
                "latency_sum",
                REQUEST_COUNT_METRIC_ID,
                Direction::Lower,
            )],
        }
    }

    /// A version with fixed latency draws and a fixed error count.
    fn version(
        cat: &MetricCatalog,
        id: &str,
        role: Role,
        errors: Option<f64>,
        latency: &[f64],
    ) -> DetailedVersion {
        let mut agg = VersionAggregate::new(VersionSpec::new(id), role, cat, None);
        if let Some(a) = agg.counters.get_mut("errors") {
            a.value = errors;
        }
        if let Some(a) = agg.ratios.get_mut("mean_latency") {
            a.value = latency.first().copied();
        }
        DetailedVersion {
            aggregate: agg,
            beliefs: BTreeMap::new(),
            samples: BTreeMap::from([("mean_latency".to_string(), latency.to_vec())]),
        }
    }

    #[test]
    fn mask_is_the_and_of_all_non_reward_criteria() {
        let criteria = vec![
            Criterion::new("errors_cap", "errors").with_threshold(Threshold::absolute(10.0)),
            Criterion::new("latency_cap", "mean_latency").with_threshold(Threshold::absolute(100.0)),
        ];
        let cat = MetricCatalog::new(&specs(), &criteria).unwrap();
        let vs = vec![
            version(&cat, "base", Role::Baseline, Some(3.0), &[90.0, 110.0, 100.0]),
            version(&cat, "cand", Role::Candidate, Some(30.0), &[50.0, 50.0, 50.0]),
        ];
        let base = evaluate_criteria(&cat, &vs, 0, 0, 3);
        assert_eq!(base.criteria_mask, vec![true, false, true]);
        let cand = evaluate_criteria(&cat, &vs, 1, 0, 3);
        assert_eq!(cand.criteria_mask, vec![false, false, false]);

        let errors = &cand.assessments[0];
        assert_eq!(errors.statistics.value, Some(30.0));
        let ta = errors.threshold_assessment.unwrap();
        assert!(ta.threshold_breached);
        assert_eq!(ta.probability_of_satisfying_threshold, 0.0);
    }

    #[test]
    fn relative_thresholds_pair_draws_with_the_baseline() {
        let criteria = vec![
            Criterion::new("latency_vs_base", "mean_latency").with_threshold(Threshold::relative(1.1)),
        ];
        let cat = MetricCatalog::new(&specs(), &criteria).unwrap();
        let vs = vec![
            version(&cat, "base", Role::Baseline, None, &[100.0, 100.0, 200.0]),
            version(&cat, "cand", Role::Candidate, None, &[105.0, 120.0, 210.0]),
        ];
        let cand = evaluate_criteria(&cat, &vs, 1, 0, 3);
        assert_eq!(cand.criteria_mask, vec![true, false, true]);
        // Baseline against itself: x <= 1.1 * x always holds.
        let base = evaluate_criteria(&cat, &vs, 0, 0, 3);
        assert_eq!(base.criteria_mask, vec![true, true, true]);

        let rs = cand.assessments[0].statistics.ratio_statistics.unwrap();
        assert_eq!(rs.probability_of_beating_baseline, 0.0);
        assert_eq!(rs.probability_of_being_best_version, 0.0);
        let rs = base.assessments[0].statistics.ratio_statistics.unwrap();
        assert_eq!(rs.probability_of_being_best_version, 1.0);
    }

    #[test]
    fn missing_draws_fail_and_criteria_without_thresholds_are_ignored() {
        let criteria = vec![
            Criterion::new("latency_cap", "mean_latency").with_threshold(Threshold::absolute(100.0)),
            Criterion::new("report_only", "errors"),
        ];
        let cat = MetricCatalog::new(&specs(), &criteria).unwrap();
        let nan = f64::NAN;
        let vs = vec![version(&cat, "base", Role::Baseline, None, &[nan, 50.0])];
        let base = evaluate_criteria(&cat, &vs, 0, 0, 2);
        assert_eq!(base.criteria_mask, vec![false, true]);
        assert!(base.assessments[1].threshold_assessment.is_none());
        let ci = base.assessments[0]
            .statistics
            .ratio_statistics
            .unwrap()
            .credible_interval;
        assert_eq!((ci.lower, ci.upper), (50.0, 50.0));
    }

    #[test]
    fn zero_criteria_means_all_true() {
        let cat = MetricCatalog::new(&specs(), &[]).unwrap();
        let vs = vec![version(&cat, "base", Role::Baseline, None, &[])];
        let e = evaluate_criteria(&cat, &vs, 0, 0, 4);
        assert_eq!(e.criteria_mask, vec![true; 4]);
        assert!(e.assessments.is_empty());
    }
}
