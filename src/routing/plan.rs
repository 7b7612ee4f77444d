//! Routing plan assembly
//!
//! [`PlanBuilder`] scores and ranks the catalog for every role, runs the
//! resolver pipeline and collects the winners into a [`RoutingPlan`] with
//! provenance, metadata and per-role explanations.
//!
//! Building is pure: everything the plan depends on arrives through the
//! [`PlanRequest`] and [`PlanSignals`]. Live state (breakers, experiments,
//! learned values) is turned into signals by
//! [`RoutingRuntime`](crate::runtime::RoutingRuntime).

use super::beam::rank_candidates;
use super::error::RoutingError;
use super::explain::{explain_role, ExplainContext, RoleExplanation};
use super::policy::{provider_usage, PacingPolicy, QuotaStatus, RoutingPolicy, UsageRecord};
use super::resolve::{
    CanaryFallbackResolver, ExperimentResolver, PinnedResolver, Resolver, ResolverPipeline, RoleIntent,
    ScoringResolver,
};
use super::scoring::ScoringContext;
use crate::catalog::{AgentRole, Model};
use crate::config::{EngineConfig, RankingConfig};
use crate::experiments::canary::{recommended_action, TrendAction, TrendDecision};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;
use uuid::Uuid;

/// Marker for the ranking algorithm generation that produced a plan.
pub const ENGINE_VERSION: &str = "diversity-beam-v2";

/// Which decision layer produced a role's assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    PinnedModel,
    ExperimentOverride,
    ProviderFallbackPolicy,
    ScoringDefault,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::PinnedModel => "pinned-model",
            Provenance::ExperimentOverride => "experiment-override",
            Provenance::ProviderFallbackPolicy => "provider-fallback-policy",
            Provenance::ScoringDefault => "scoring-default",
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts of supplied canary decisions plus one overall recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanaryTrendSummary {
    pub promote: usize,
    pub hold: usize,
    pub rollback: usize,
    pub recommended_action: TrendAction,
}

impl CanaryTrendSummary {
    pub fn from_decisions(decisions: &[TrendDecision]) -> Self {
        let count = |action| decisions.iter().filter(|d| d.action == action).count();
        Self {
            promote: count(TrendAction::Promote),
            hold: count(TrendAction::Hold),
            rollback: count(TrendAction::Rollback),
            recommended_action: recommended_action(decisions),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentStamp {
    pub id: String,
    pub variant: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanMetadata {
    pub engine_version: String,
    pub plan_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// Routing mode, suffixed with `;<provider>:<pacing-mode>` when paced
    pub policy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canary_trend: Option<CanaryTrendSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment: Option<ExperimentStamp>,
    /// Forecast monthly quota exhaustion date, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_exhaustion: Option<NaiveDate>,
}

/// Per-role assignments, chains and provenance.
///
/// A role without any candidate (empty catalog) has an empty chain and no
/// assignment or provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingPlan {
    pub agents: BTreeMap<AgentRole, String>,
    pub chains: BTreeMap<AgentRole, Vec<String>>,
    pub provenance: BTreeMap<AgentRole, Provenance>,
    pub metadata: PlanMetadata,
}

impl RoutingPlan {
    pub fn model_for(&self, role: AgentRole) -> Option<&str> {
        self.agents.get(&role).map(String::as_str)
    }

    pub fn chain_for(&self, role: AgentRole) -> &[String] {
        self.chains.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Plan plus explanations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanOutcome {
    pub plan: RoutingPlan,
    pub explanations: BTreeMap<AgentRole, RoleExplanation>,
}

/// Caller-supplied inputs for one plan.
#[derive(Debug, Clone)]
pub struct PlanRequest<'a> {
    pub catalog: &'a [Model],
    pub policy: RoutingPolicy,
    pub quota: QuotaStatus,
    pub usage_history: &'a [UsageRecord],
    pub pacing: Option<PacingPolicy>,
    /// Pinned model per role
    pub preferences: BTreeMap<AgentRole, String>,
    /// Experiment whose variant applies to this plan
    pub experiment_id: Option<String>,
    /// Subject bucketed into the experiment
    pub subject_id: Option<String>,
    /// Externally computed canary verdicts
    pub trend_decisions: Vec<TrendDecision>,
}

impl<'a> PlanRequest<'a> {
    pub fn new(catalog: &'a [Model], policy: RoutingPolicy, quota: QuotaStatus) -> Self {
        Self {
            catalog,
            policy,
            quota,
            usage_history: &[],
            pacing: None,
            preferences: BTreeMap::new(),
            experiment_id: None,
            subject_id: None,
            trend_decisions: Vec::new(),
        }
    }

    pub fn with_usage_history(mut self, history: &'a [UsageRecord]) -> Self {
        self.usage_history = history;
        self
    }

    pub fn with_pacing(mut self, pacing: PacingPolicy) -> Self {
        self.pacing = Some(pacing);
        self
    }

    pub fn pin(mut self, role: AgentRole, model: &str) -> Self {
        self.preferences.insert(role, model.to_string());
        self
    }

    pub fn with_preferences(mut self, preferences: BTreeMap<AgentRole, String>) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn with_experiment(mut self, experiment_id: &str, subject_id: &str) -> Self {
        self.experiment_id = Some(experiment_id.to_string());
        self.subject_id = Some(subject_id.to_string());
        self
    }

    pub fn with_trend_decisions(mut self, decisions: Vec<TrendDecision>) -> Self {
        self.trend_decisions = decisions;
        self
    }

    /// Routing mode plus the pacing marker.
    pub fn policy_marker(&self) -> String {
        match &self.pacing {
            Some(pacing) => format!("{};{}:{}", self.policy.mode, pacing.provider, pacing.mode),
            None => self.policy.mode.to_string(),
        }
    }
}

/// Parse role-name keyed preferences, e.g. from a host config file.
pub fn parse_preferences(
    named: &HashMap<String, String>,
) -> Result<BTreeMap<AgentRole, String>, RoutingError> {
    named
        .iter()
        .map(|(role, model)| {
            role.parse::<AgentRole>()
                .map(|r| (r, model.clone()))
                .map_err(|_| RoutingError::UnknownRole { role: role.clone() })
        })
        .collect()
}

/// Variant selected for this plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveVariant {
    pub experiment_id: String,
    pub variant_id: String,
    pub overrides: BTreeMap<AgentRole, String>,
}

/// State-derived inputs computed by the runtime.
#[derive(Debug, Clone, Default)]
pub struct PlanSignals {
    /// Models with an open breaker, per role
    pub blocked: HashMap<AgentRole, HashSet<String>>,
    pub variant: Option<ActiveVariant>,
    /// Learned per-model bias, per role
    pub learned_bias: HashMap<AgentRole, HashMap<String, f64>>,
    pub quota_exhaustion: Option<NaiveDate>,
}

impl PlanSignals {
    pub fn block(mut self, role: AgentRole, model: &str) -> Self {
        self.blocked.entry(role).or_default().insert(model.to_string());
        self
    }

    pub fn with_variant(mut self, variant: ActiveVariant) -> Self {
        self.variant = Some(variant);
        self
    }
}

/// Builds routing plans.
#[derive(Debug, Clone, Default)]
pub struct PlanBuilder {
    ranking: RankingConfig,
}

impl PlanBuilder {
    pub fn new(ranking: RankingConfig) -> Self {
        Self { ranking }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.ranking.clone())
    }

    pub fn ranking(&self) -> &RankingConfig {
        &self.ranking
    }

    /// Build a plan covering every role.
    ///
    /// Never fails: an empty catalog yields empty chains, and a role whose
    /// every model is circuit-open falls back to the unfiltered ranking.
    pub fn build(&self, request: &PlanRequest<'_>, signals: &PlanSignals) -> PlanOutcome {
        let start = Instant::now();
        let usage = provider_usage(request.usage_history);
        let limits = self.ranking.limits();
        let no_blocks = HashSet::new();
        let rollback = request
            .trend_decisions
            .iter()
            .any(|d| d.action == TrendAction::Rollback);

        let resolvers: Vec<Box<dyn Resolver + '_>> = vec![
            Box::new(PinnedResolver::new(&request.preferences)),
            Box::new(ExperimentResolver::new(signals.variant.as_ref())),
            Box::new(CanaryFallbackResolver::new(rollback, &self.ranking.free_fallback_model)),
            Box::new(ScoringResolver),
        ];
        let pipeline = ResolverPipeline::new(resolvers);

        let policy_marker = request.policy_marker();
        let canary_trend = if request.trend_decisions.is_empty() {
            None
        } else {
            Some(CanaryTrendSummary::from_decisions(&request.trend_decisions))
        };
        let explain_context = ExplainContext {
            policy_marker: &policy_marker,
            canary: canary_trend.as_ref(),
            quota: &request.quota,
            policy: &request.policy,
        };

        let mut agents = BTreeMap::new();
        let mut chains = BTreeMap::new();
        let mut provenance = BTreeMap::new();
        let mut explanations = BTreeMap::new();

        for role in AgentRole::ALL {
            let blocked = signals.blocked.get(&role).unwrap_or(&no_blocks);
            let context = ScoringContext::new(&request.policy, &request.quota, &usage)
                .with_pacing(request.pacing.as_ref())
                .with_learned_bias(signals.learned_bias.get(&role));

            let mut ranked = rank_candidates(request.catalog, role, &context, limits, blocked);
            let degraded = ranked.is_empty() && !request.catalog.is_empty();
            if degraded {
                tracing::warn!(role = %role, blocked = blocked.len(), "Every model circuit-open, ignoring breakers");
                ranked = rank_candidates(request.catalog, role, &context, limits, &no_blocks);
            }

            let mut intent = RoleIntent::new(role, request.catalog, ranked, blocked, self.ranking.chain_depth);
            intent.degraded = degraded;
            let resolution = pipeline.execute(&mut intent);

            match &resolution {
                Some(resolution) => {
                    tracing::debug!(
                        role = %role,
                        model = %resolution.model,
                        provenance = %resolution.provenance,
                        chain = resolution.chain.len(),
                        "Role resolved"
                    );
                    crate::metrics::record_provenance(role, resolution.provenance);
                    agents.insert(role, resolution.model.clone());
                    chains.insert(role, resolution.chain.clone());
                    provenance.insert(role, resolution.provenance);
                }
                None => {
                    chains.insert(role, Vec::new());
                }
            }
            explanations.insert(role, explain_role(&intent, resolution.as_ref(), &explain_context));
        }

        let metadata = PlanMetadata {
            engine_version: ENGINE_VERSION.to_string(),
            plan_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            policy: policy_marker.clone(),
            canary_trend,
            experiment: signals.variant.as_ref().map(|v| ExperimentStamp {
                id: v.experiment_id.clone(),
                variant: v.variant_id.clone(),
            }),
            quota_exhaustion: signals.quota_exhaustion,
        };

        let elapsed = start.elapsed();
        crate::metrics::record_plan_built(elapsed);
        tracing::info!(
            plan_id = %metadata.plan_id,
            policy = %metadata.policy,
            assigned = agents.len(),
            elapsed_us = elapsed.as_micros() as u64,
            "Routing plan built"
        );

        PlanOutcome {
            plan: RoutingPlan {
                agents,
                chains,
                provenance,
                metadata,
            },
            explanations,
        }
    }
}
