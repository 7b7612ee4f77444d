//! Candidate scoring for role-based routing
//!
//! `score_candidate` is a pure function: identical model, role and context
//! always produce an identical score and breakdown.

use crate::catalog::{AgentRole, Model};
use crate::routing::policy::{PacingMode, PacingPolicy, QuotaStatus, RoutingPolicy};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Unit cost (USD per million tokens, input + output) at which cost efficiency is 0.5.
pub const COST_SCALE: f64 = 10.0;

/// Cost pressure below which a model counts as low-cost for pacing
/// (unit cost under `COST_SCALE`).
pub const LOW_COST_NORM: f64 = 0.5;

/// Maximum penalty at full quota pressure for an infinitely expensive model.
const QUOTA_PENALTY_WEIGHT: f64 = 0.9;

/// Extra penalty for paid models once the daily quota is gone under hard enforcement.
const DAILY_EXHAUSTED_PENALTY: f64 = 0.5;

/// Penalty for a provider that served every request in the usage history.
const DIVERSITY_PENALTY_WEIGHT: f64 = 0.1;

/// Bound on the learned bias contribution.
const LEARNED_BIAS_LIMIT: f64 = 0.1;

/// Context window at which the context component saturates.
const CONTEXT_SATURATION_TOKENS: f64 = 200_000.0;

/// Inputs shared by every candidate scored in one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub policy: &'a RoutingPolicy,
    pub quota: &'a QuotaStatus,
    /// Requests per provider, used for the diversity penalty
    pub provider_usage: &'a HashMap<String, u32>,
    pub pacing: Option<&'a PacingPolicy>,
    /// Per-model learned adjustment (model id → bias)
    pub learned_bias: Option<&'a HashMap<String, f64>>,
}

impl<'a> ScoringContext<'a> {
    pub fn new(
        policy: &'a RoutingPolicy,
        quota: &'a QuotaStatus,
        provider_usage: &'a HashMap<String, u32>,
    ) -> Self {
        Self {
            policy,
            quota,
            provider_usage,
            pacing: None,
            learned_bias: None,
        }
    }

    pub fn with_pacing(mut self, pacing: Option<&'a PacingPolicy>) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_learned_bias(mut self, bias: Option<&'a HashMap<String, f64>>) -> Self {
        self.learned_bias = bias;
        self
    }
}

/// Component breakdown of a candidate score.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScoreBreakdown {
    /// Capability fit for the role (0.0-1.0)
    pub capability: f64,
    /// Cost efficiency (1.0 = free)
    pub cost_efficiency: f64,
    /// Share of the base score given to capability
    pub capability_weight: f64,
    pub quota_penalty: f64,
    pub pacing_adjustment: f64,
    pub diversity_penalty: f64,
    pub status_penalty: f64,
    pub learned_adjustment: f64,
}

/// A model with its score for one role.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub model: Model,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

impl ScoredCandidate {
    pub fn id(&self) -> &str {
        &self.model.id
    }

    pub fn provider(&self) -> &str {
        self.model.provider()
    }
}

/// Order candidates best-first; ties break on model id so ranking is stable.
pub fn compare_candidates(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.model.id.cmp(&b.model.id))
}

/// Normalized cost pressure of a model: 0.0 for free, approaching 1.0 when expensive.
fn cost_norm(model: &Model) -> f64 {
    let unit = model.unit_cost();
    unit / (unit + COST_SCALE)
}

/// How well a model's capabilities match what the role needs (0.0-1.0).
fn capability_fit(model: &Model, role: AgentRole) -> f64 {
    let profile = role.profile();
    let caps = &model.capabilities;
    let flag = |on: bool| if on { 1.0 } else { 0.0 };
    let context = (model.context_limit as f64 / CONTEXT_SATURATION_TOKENS).min(1.0);

    profile.reasoning * flag(caps.reasoning)
        + profile.tool_calling * flag(caps.tool_calling)
        + profile.attachments * flag(caps.attachments)
        + profile.context * context
}

/// Quota pressure penalty. Grows quadratically with pressure and scales
/// with cost, so expensive models degrade faster than cheap ones.
fn quota_penalty(model: &Model, context: &ScoringContext<'_>) -> f64 {
    if model.is_free() {
        return 0.0;
    }
    let pressure = context.quota.pressure(context.policy);
    let mut penalty = QUOTA_PENALTY_WEIGHT * pressure * pressure * cost_norm(model);
    if context.policy.is_hard() && context.quota.daily_remaining == 0 {
        penalty += DAILY_EXHAUSTED_PENALTY;
    }
    penalty
}

/// Provider pacing adjustment; zero for models of other providers.
fn pacing_adjustment(model: &Model, capability: f64, pacing: Option<&PacingPolicy>) -> f64 {
    let Some(pacing) = pacing else {
        return 0.0;
    };
    if model.provider() != pacing.provider {
        return 0.0;
    }
    let norm = cost_norm(model);
    let burn = pacing.burn_ratio();
    match pacing.mode {
        // Below LOW_COST_NORM economy is positive and quality-first is not
        PacingMode::Economy => 0.2 * (LOW_COST_NORM - norm) * (1.0 + burn),
        PacingMode::Balanced => -0.1 * norm * burn,
        PacingMode::QualityFirst => 0.2 * capability * (norm - LOW_COST_NORM) - 0.05 * norm * burn,
    }
}

fn diversity_penalty(model: &Model, usage: &HashMap<String, u32>) -> f64 {
    let total: u64 = usage.values().map(|v| *v as u64).sum();
    if total == 0 {
        return 0.0;
    }
    let used = usage.get(model.provider()).copied().unwrap_or(0) as f64;
    DIVERSITY_PENALTY_WEIGHT * used / total as f64
}

/// Score a model for a role.
///
/// Combines capability fit, cost efficiency, quota pressure, provider pacing,
/// lifecycle risk, provider diversity and an optional learned bias. Never
/// fails; missing cost fields count as zero.
pub fn score_candidate(model: &Model, role: AgentRole, context: &ScoringContext<'_>) -> ScoredCandidate {
    let capability = capability_fit(model, role);
    let cost_efficiency = 1.0 - cost_norm(model);
    let capability_weight = (role.profile().capability_emphasis
        + context.policy.mode.capability_bias())
    .clamp(0.1, 0.95);

    let breakdown = ScoreBreakdown {
        capability,
        cost_efficiency,
        capability_weight,
        quota_penalty: quota_penalty(model, context),
        pacing_adjustment: pacing_adjustment(model, capability, context.pacing),
        diversity_penalty: diversity_penalty(model, context.provider_usage),
        status_penalty: model.status.risk_penalty(),
        learned_adjustment: context
            .learned_bias
            .and_then(|bias| bias.get(&model.id))
            .map(|b| b.clamp(-LEARNED_BIAS_LIMIT, LEARNED_BIAS_LIMIT))
            .unwrap_or(0.0),
    };

    let score = capability_weight * capability + (1.0 - capability_weight) * cost_efficiency
        - breakdown.quota_penalty
        - breakdown.status_penalty
        - breakdown.diversity_penalty
        + breakdown.pacing_adjustment
        + breakdown.learned_adjustment;

    ScoredCandidate {
        model: model.clone(),
        score,
        breakdown,
    }
}
