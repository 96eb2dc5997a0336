//! JSON shape of requests and results.
#![cfg(feature = "serde")]

mod common;

use canarist::{
    run_iteration, AdvancedParameters, Direction, IterationParameters, StaticMetricSource,
    ThresholdType, REQUEST_COUNT_METRIC_ID,
};
use serde_json::json;

#[test]
fn minimal_request_fills_in_defaults() {
    let body = json!({
        "start_time": "2026-03-01T12:00:00Z",
        "baseline": { "id": "reviews-v1" },
        "candidates": [{ "id": "reviews-v2", "version_labels": { "destination_workload": "reviews-v2" } }],
        "metric_specs": {
            "counter_metrics": [
                { "id": "request_count", "query_template": "sum(istio_requests_total{$labels})" },
                { "id": "error_count", "preferred_direction": "lower" }
            ],
            "ratio_metrics": [
                { "id": "error_rate", "numerator": "error_count", "denominator": "request_count",
                  "preferred_direction": "lower", "zero_to_one": true }
            ]
        },
        "criteria": [
            { "id": "errors", "metric_id": "error_rate",
              "threshold": { "threshold_type": "absolute", "value": 0.02 } }
        ]
    });

    let p: IterationParameters = serde_json::from_value(body).unwrap();
    assert_eq!(p.advanced_parameters, AdvancedParameters::default());
    assert!(p.last_state.is_none());
    assert!(p.baseline.version_labels.is_empty());
    assert_eq!(p.candidates[0].version_labels["destination_workload"], "reviews-v2");
    assert_eq!(p.metric_specs.counter_metrics[1].preferred_direction, Some(Direction::Lower));
    assert_eq!(p.metric_specs.counter_metrics[1].query_template, "");
    assert!(p.metric_specs.ratio_metrics[0].zero_to_one);
    let t = p.criteria[0].threshold.unwrap();
    assert_eq!(t.threshold_type, ThresholdType::Absolute);
    assert!(!p.criteria[0].is_reward);
}

#[test]
fn partial_advanced_parameters_keep_other_defaults() {
    let adv: AdvancedParameters =
        serde_json::from_value(json!({ "exploration_traffic_percentage": 10.0 })).unwrap();
    assert_eq!(adv.exploration_traffic_percentage, 10.0);
    assert_eq!(adv.sample_count, AdvancedParameters::default().sample_count);
    assert_eq!(
        adv.min_posterior_probability_for_winner,
        AdvancedParameters::default().min_posterior_probability_for_winner
    );
}

#[test]
fn result_serializes_with_stable_keys_and_round_trips_its_state() {
    let source = StaticMetricSource::new()
        .with_counter("baseline", REQUEST_COUNT_METRIC_ID, 100.0)
        .with_counter("baseline", "error_count", 1.0)
        .with_counter("canary", REQUEST_COUNT_METRIC_ID, 100.0);
    let p = common::params(
        &["canary"],
        vec![canarist::Criterion::new("errors", "error_rate")
            .with_threshold(canarist::Threshold::absolute(0.05))],
    );
    let out = run_iteration(p, &source).unwrap();
    let v = serde_json::to_value(&out).unwrap();

    assert_eq!(v["baseline_assessment"]["id"], "baseline");
    assert_eq!(v["baseline_assessment"]["request_count"], 100.0);
    let cri = &v["candidate_assessments"][0]["criterion_assessments"][0];
    assert_eq!(cri["metric_id"], "error_rate");
    assert!(cri["statistics"]["ratio_statistics"]["credible_interval"]["upper"].is_f64());
    assert!(cri["threshold_assessment"]["threshold_breached"].is_boolean());
    assert_eq!(
        v["traffic_split_recommendation"]["uniform"],
        json!({ "baseline": 50, "canary": 50 })
    );
    // The candidate never logged an error: its error count stays undefined.
    assert!(v["last_state"]["aggregated_counter_metrics"]["canary"]["error_count"]["value"].is_null());
    assert_eq!(
        v["last_state"]["ratio_max_mins"]["error_rate"],
        json!({ "minimum": 0.01, "maximum": 0.01 })
    );

    let state: canarist::ExperimentState =
        serde_json::from_value(v["last_state"].clone()).unwrap();
    assert_eq!(state, out.last_state);
}

#[test]
fn undecided_winner_omits_optional_fields() {
    let out = run_iteration(
        common::params(&["canary"], vec![]),
        &StaticMetricSource::new(),
    )
    .unwrap();
    // No criteria and no reward: every version ties and the baseline bias decides.
    assert_eq!(out.winner_assessment.current_winner.as_deref(), Some("baseline"));

    let mut undecided = out.winner_assessment.clone();
    undecided.winning_version_found = false;
    undecided.current_winner = None;
    undecided.winning_probability = None;
    assert_eq!(
        serde_json::to_value(&undecided).unwrap(),
        json!({ "winning_version_found": false })
    );
}
