//! Error taxonomy.
//!
//! Two kinds of failure end an iteration:
//! - [`ConfigurationError`]: the request itself is invalid. Always detected before any
//!   metric fetch or sampling happens, and never retried.
//! - [`MetricFetchFailure`]: raised by a [`MetricSource`][crate::MetricSource] and
//!   propagated unchanged. Retry policy belongs to the metric-backend client.
//!
//! Too little data is not an error: it shows up as low win probabilities and no winner.

use thiserror::Error;

/// Invalid experiment parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("{metric_id} is a mandatory counter metric which is missing from the list of metric specs")]
    MissingMandatoryMetric { metric_id: String },

    #[error("unknown metric id found in criteria: {metric_id}")]
    UnknownMetricId { metric_id: String },

    #[error("counter metric {metric_id} used as reward; only ratio metrics can be used as a reward")]
    RewardOnNonRatioMetric { metric_id: String },

    #[error("counter metric {metric_id} used with a relative threshold; only absolute thresholds are allowed for counter metrics")]
    RelativeThresholdOnCounterMetric { metric_id: String },

    #[error("ratio metric {ratio_metric_id} references unknown numerator or denominator {counter_metric_id}")]
    UnknownNumeratorOrDenominator {
        ratio_metric_id: String,
        counter_metric_id: String,
    },

    #[error("more than one reward criterion found: {}", .criteria.join(", "))]
    MultipleRewardCriteria { criteria: Vec<String> },

    #[error("version id {version_id} is used more than once")]
    DuplicateVersionId { version_id: String },

    #[error("invalid advanced parameter {name}: {reason}")]
    InvalidAdvancedParameter { name: &'static str, reason: String },
}

/// A metric-backend query failed.
#[derive(Debug, Error)]
#[error("metric fetch failed: {message}")]
pub struct MetricFetchFailure {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl MetricFetchFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying client error.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Any failure of one experiment iteration.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    MetricFetch(#[from] MetricFetchFailure),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_messages_name_the_offending_metric() {
        let e = ConfigurationError::UnknownNumeratorOrDenominator {
            ratio_metric_id: "error_rate".to_string(),
            counter_metric_id: "error_count".to_string(),
        };
        let msg = e.to_string();
        assert!(msg.contains("error_rate"), "{msg}");
        assert!(msg.contains("error_count"), "{msg}");

        let e = ConfigurationError::MultipleRewardCriteria {
            criteria: vec!["c1".to_string(), "c2".to_string()],
        };
        assert!(e.to_string().ends_with("c1, c2"));
    }

    #[test]
    fn fetch_failure_keeps_its_source() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "backend timed out");
        let e: Error = MetricFetchFailure::with_source("prometheus query", io).into();
        assert!(matches!(e, Error::MetricFetch(_)));
        // `transparent` forwards to the wrapped failure's own source.
        let src = std::error::Error::source(&e);
        assert_eq!(src.map(|s| s.to_string()).as_deref(), Some("backend timed out"));
    }
}
