//! Human-readable rationale per role.

use super::plan::{CanaryTrendSummary, Provenance};
use super::policy::{QuotaStatus, RoutingPolicy};
use super::resolve::{Resolution, RoleIntent};
use crate::catalog::AgentRole;
use serde::Serialize;

/// Plan-wide facts shared by every role's explanation.
#[derive(Debug, Clone, Copy)]
pub struct ExplainContext<'a> {
    pub policy_marker: &'a str,
    pub canary: Option<&'a CanaryTrendSummary>,
    pub quota: &'a QuotaStatus,
    pub policy: &'a RoutingPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleExplanation {
    pub role: AgentRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
    /// One-paragraph rationale; never empty
    pub summary: String,
    /// Individual contributing factors
    pub factors: Vec<String>,
}

pub fn explain_role(
    intent: &RoleIntent<'_>,
    resolution: Option<&Resolution>,
    context: &ExplainContext<'_>,
) -> RoleExplanation {
    let mut factors = Vec::new();

    if intent.degraded {
        factors.push("every model is circuit-open for this role; breakers ignored".to_string());
    } else if !intent.blocked.is_empty() {
        factors.push(format!("{} model(s) excluded by open circuit breakers", intent.blocked.len()));
    }
    factors.extend(intent.notes.iter().cloned());

    let Some(resolution) = resolution else {
        return RoleExplanation {
            role: intent.role,
            provenance: None,
            summary: format!("No candidate available for {}: the catalog is empty", intent.role),
            factors,
        };
    };

    if let Some(winner) = intent.candidate(&resolution.model) {
        let b = &winner.breakdown;
        factors.push(format!(
            "capability fit {:.2} weighted {:.2}, cost efficiency {:.2}",
            b.capability, b.capability_weight, b.cost_efficiency
        ));
        for (label, value) in [
            ("quota penalty", -b.quota_penalty),
            ("pacing adjustment", b.pacing_adjustment),
            ("diversity penalty", -b.diversity_penalty),
            ("lifecycle penalty", -b.status_penalty),
            ("learned adjustment", b.learned_adjustment),
        ] {
            if value != 0.0 {
                factors.push(format!("{} {:+.3}", label, value));
            }
        }
    }
    if resolution.chain.len() > 1 {
        factors.push(format!("fallbacks: {}", resolution.chain[1..].join(", ")));
    }

    let mut summary = format!(
        "{} routes to {} ({}): {}",
        intent.role, resolution.model, resolution.provenance, resolution.reason
    );
    if intent.role.is_primary() {
        summary.push_str(&format!(
            ". Policy {} with {} daily / {} monthly requests remaining (pressure {:.0}%)",
            context.policy_marker,
            context.quota.daily_remaining,
            context.quota.monthly_remaining,
            context.quota.pressure(context.policy) * 100.0
        ));
        if let Some(canary) = context.canary {
            summary.push_str(&format!(
                "; canary trend {} (promote {}, hold {}, rollback {})",
                canary.recommended_action, canary.promote, canary.hold, canary.rollback
            ));
        }
    }

    RoleExplanation {
        role: intent.role,
        provenance: Some(resolution.provenance),
        summary,
        factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Model;
    use crate::experiments::TrendAction;
    use std::collections::HashSet;

    fn resolution() -> Resolution {
        Resolution {
            model: "a/one".into(),
            chain: vec!["a/one".into(), "b/two".into()],
            provenance: Provenance::ScoringDefault,
            reason: "highest score".into(),
        }
    }

    #[test]
    fn primary_role_summary_carries_plan_context() {
        let catalog = vec![Model::new("a/one", "One")];
        let blocked = HashSet::new();
        let intent = RoleIntent::new(AgentRole::Orchestrator, &catalog, vec![], &blocked, 3);
        let quota = QuotaStatus::new(90, 2400);
        let policy = RoutingPolicy::default();
        let canary = CanaryTrendSummary {
            promote: 1,
            hold: 2,
            rollback: 0,
            recommended_action: TrendAction::Promote,
        };
        let context = ExplainContext {
            policy_marker: "hybrid",
            canary: Some(&canary),
            quota: &quota,
            policy: &policy,
        };

        let explanation = explain_role(&intent, Some(&resolution()), &context);
        assert!(explanation.summary.starts_with("orchestrator routes to a/one"));
        assert!(explanation.summary.contains("Policy hybrid"));
        assert!(explanation.summary.contains("canary trend promote"));
        assert!(explanation.factors.iter().any(|f| f == "fallbacks: b/two"));
    }

    #[test]
    fn secondary_role_summary_is_short() {
        let catalog = vec![Model::new("a/one", "One")];
        let blocked = HashSet::from(["c/three".to_string()]);
        let intent = RoleIntent::new(AgentRole::Fixer, &catalog, vec![], &blocked, 3);
        let quota = QuotaStatus::new(90, 2400);
        let policy = RoutingPolicy::default();
        let context = ExplainContext {
            policy_marker: "hybrid",
            canary: None,
            quota: &quota,
            policy: &policy,
        };

        let explanation = explain_role(&intent, Some(&resolution()), &context);
        assert!(!explanation.summary.contains("Policy"));
        assert!(explanation.factors[0].contains("circuit breakers"));
    }
}
