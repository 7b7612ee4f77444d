//! Canary trend evaluation.
//!
//! A candidate's metrics are compared against a baseline and condensed into
//! a single composite: the success delta counts for the candidate, while
//! latency, cost and fallback deltas count against it. The composite is then
//! mapped onto promote / hold / rollback using the configured margins.

use crate::config::CanaryConfig;
use crate::config::TrendWeights;
use crate::telemetry::MetricSummary;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Verdict for a candidate relative to its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendAction {
    Promote,
    Hold,
    Rollback,
}

impl TrendAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendAction::Promote => "promote",
            TrendAction::Hold => "hold",
            TrendAction::Rollback => "rollback",
        }
    }
}

impl FromStr for TrendAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "promote" => Ok(TrendAction::Promote),
            "hold" => Ok(TrendAction::Hold),
            "rollback" => Ok(TrendAction::Rollback),
            _ => Err(format!("Unknown trend action: {}", s)),
        }
    }
}

impl std::fmt::Display for TrendAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one subject (a variant id or a model id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendDecision {
    pub subject: String,
    pub action: TrendAction,
    pub composite: f64,
    pub reason: String,
}

impl TrendDecision {
    pub fn hold(subject: &str, reason: impl Into<String>) -> Self {
        Self {
            subject: subject.to_string(),
            action: TrendAction::Hold,
            composite: 0.0,
            reason: reason.into(),
        }
    }
}

/// Weighted composite of the candidate's deltas against the baseline.
///
/// Latency and cost deltas are relative to the baseline; success and
/// fallback deltas are absolute rate differences. A paid candidate against a
/// free baseline counts as a full relative cost increase.
pub fn composite_score(candidate: &MetricSummary, baseline: &MetricSummary, weights: &TrendWeights) -> f64 {
    let success_delta = candidate.success_rate - baseline.success_rate;
    let latency_delta =
        (candidate.avg_latency_ms - baseline.avg_latency_ms) / baseline.avg_latency_ms.max(1.0);
    let cost_delta = if baseline.avg_cost > 0.0 {
        (candidate.avg_cost - baseline.avg_cost) / baseline.avg_cost
    } else if candidate.avg_cost > 0.0 {
        1.0
    } else {
        0.0
    };
    let fallback_delta = candidate.fallback_rate - baseline.fallback_rate;

    weights.success * success_delta
        - weights.latency * latency_delta
        - weights.cost * cost_delta
        - weights.fallback * fallback_delta
}

/// Judge a candidate against a baseline.
///
/// Holds until both sides have at least `min_samples` samples.
pub fn evaluate_trend(
    subject: &str,
    candidate: &MetricSummary,
    baseline: &MetricSummary,
    min_samples: u32,
    config: &CanaryConfig,
) -> TrendDecision {
    if candidate.samples < min_samples || baseline.samples < min_samples {
        return TrendDecision::hold(
            subject,
            format!(
                "insufficient samples: candidate {}, baseline {}, need {}",
                candidate.samples, baseline.samples, min_samples
            ),
        );
    }

    let composite = composite_score(candidate, baseline, &config.weights);
    let (action, reason) = if composite > config.promote_margin {
        (
            TrendAction::Promote,
            format!("composite {:+.3} above promote margin {:.3}", composite, config.promote_margin),
        )
    } else if composite < -config.rollback_margin {
        (
            TrendAction::Rollback,
            format!("composite {:+.3} below rollback margin -{:.3}", composite, config.rollback_margin),
        )
    } else {
        (TrendAction::Hold, format!("composite {:+.3} within margins", composite))
    };

    tracing::debug!(subject, action = %action, composite, "Canary trend evaluated");

    TrendDecision {
        subject: subject.to_string(),
        action,
        composite,
        reason,
    }
}

/// Evaluate every subject against `baseline`, in input order.
///
/// The baseline's own entry is always `Hold`.
pub fn evaluate_against_baseline<'a>(
    subjects: impl IntoIterator<Item = (&'a str, &'a MetricSummary)>,
    baseline_subject: &str,
    baseline: &MetricSummary,
    config: &CanaryConfig,
) -> Vec<TrendDecision> {
    subjects
        .into_iter()
        .map(|(subject, summary)| {
            if subject == baseline_subject {
                TrendDecision::hold(subject, "baseline")
            } else {
                evaluate_trend(subject, summary, baseline, config.min_samples, config)
            }
        })
        .collect()
}

/// Overall recommendation: rollback beats promote, promote beats hold.
pub fn recommended_action<'a>(decisions: impl IntoIterator<Item = &'a TrendDecision>) -> TrendAction {
    let mut recommended = TrendAction::Hold;
    for decision in decisions {
        match decision.action {
            TrendAction::Rollback => return TrendAction::Rollback,
            TrendAction::Promote => recommended = TrendAction::Promote,
            TrendAction::Hold => {}
        }
    }
    recommended
}
