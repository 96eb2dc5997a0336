//! `canarist`: the decision core of a progressive-delivery (canary / A-B) controller.
//!
//! Given fresh telemetry for a baseline and one or more candidate versions, one
//! iteration answers two questions:
//!
//! 1. Does any version statistically dominate the others? ([`WinnerAssessment`])
//! 2. How should live traffic be split for the next control interval?
//!    ([`TrafficSplitRecommendation`])
//!
//! The engine is stateless across calls. Everything it needs to remember is returned
//! in [`AssessmentResult::last_state`] and replayed by the caller on the next call.
//!
//! **Pipeline** (see [`Experiment`]):
//! - [`MetricCatalog`]: validate metric specs and criteria before any I/O.
//! - [`MetricSource`]: the caller's backend resolves counter (and ratio) values.
//! - [`VersionAggregate`] / [`update_ratio_max_mins`]: fold observations into
//!   cumulative aggregates and monotone normalization bounds.
//! - [`BeliefModel`]: a rescaled Beta posterior per version and ratio metric, sampled
//!   with a shared draw count so draw `j` of every version is paired.
//! - [`evaluate_criteria`]: per-draw threshold checks, ANDed into a criteria mask.
//! - [`effective_rewards`] / [`utility_samples`]: reward draws gated by the mask,
//!   with a tiny baseline bias for all-zero ties.
//! - [`win_probabilities`] / [`assess_winner`]: share of draws each version ranks first.
//! - [`recommend_traffic`]: top-k posterior Bayesian routing for k = 1, 2 and N,
//!   blended with exploration traffic and apportioned into integer percentages.
//!
//! **Goals:**
//! - **Deterministic**: same inputs + same [`AdvancedParameters::seed`] → same result.
//! - **Exact sums**: every traffic split sums to exactly 100.
//! - **Fail early**: configuration errors surface before any metric fetch.
//!
//! **Non-goals:**
//! - Enforcing traffic (no service-mesh integration).
//! - Retrying or caching backend queries.
//! - Persisting state; that is the caller's job.
//!
//! The crate logs through `tracing` and never installs a subscriber.

mod error;
pub use error::*;

mod types;
pub use types::*;

mod config;
pub use config::*;

mod catalog;
pub use catalog::*;

mod source;
pub use source::*;

mod aggregate;
pub use aggregate::*;

mod seed;
pub use seed::*;

mod belief;
pub use belief::*;

mod version;
pub use version::*;

mod criteria;
pub use criteria::*;

mod utility;
pub use utility::*;

mod rank;
pub use rank::*;

mod winner;
pub use winner::*;

mod alloc;
pub use alloc::*;

mod traffic;
pub use traffic::*;

mod experiment;
pub use experiment::*;
