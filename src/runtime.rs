//! The routing runtime aggregate.
//!
//! [`RoutingRuntime`] owns every piece of mutable engine state: anomaly
//! windows and breakers, spend counters, experiment metrics, shadow metrics
//! and the Q-table. The host creates one per routing domain and drives it
//! from a single logical caller; concurrent callers must serialize access.

use crate::budget::{forecast_quota, CostTracker, CostVerdict, ForecastOptions, QuotaForecast, SpendSnapshot, TokenUsage};
use crate::catalog::{AgentRole, Model};
use crate::config::EngineConfig;
use crate::experiments::{Experiment, ExperimentError, ExperimentManager, ShadowEvaluationEngine, TrendAction, TrendDecision};
use crate::learning::{QState, QUpdate, QuotaHealth, RoutingQAgent, TaskType};
use crate::routing::{ActiveVariant, PlanBuilder, PlanOutcome, PlanRequest, PlanSignals};
use crate::routing::policy::{QuotaStatus, UsageRecord};
use crate::telemetry::{Anomaly, AnomalyDetector, TelemetrySample, TrafficKind};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// One telemetry delivery from the host.
#[derive(Debug, Clone)]
pub struct Ingestion<'a> {
    pub role: AgentRole,
    pub model: &'a Model,
    pub sample: TelemetrySample,
    /// Tokens consumed, when the host tracks them
    pub usage: Option<TokenUsage>,
}

impl<'a> Ingestion<'a> {
    pub fn new(role: AgentRole, model: &'a Model, sample: TelemetrySample) -> Self {
        Self {
            role,
            model,
            sample,
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// What ingesting one sample changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub anomalies: Vec<Anomaly>,
    /// A breaker was opened for the (role, model) pair
    pub circuit_opened: bool,
    /// Spend added by this sample
    pub cost_usd: f64,
    pub cost_verdict: CostVerdict,
}

#[derive(Debug)]
pub struct RoutingRuntime {
    config: EngineConfig,
    builder: PlanBuilder,
    anomalies: AnomalyDetector,
    costs: CostTracker,
    experiments: ExperimentManager,
    shadow: ShadowEvaluationEngine,
    qagent: RoutingQAgent,
}

impl RoutingRuntime {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            builder: PlanBuilder::from_config(&config),
            anomalies: AnomalyDetector::new(config.anomaly.clone()),
            costs: CostTracker::new(config.budget.clone()),
            experiments: ExperimentManager::new(&config.experiments),
            shadow: ShadowEvaluationEngine::new(config.shadow.clone()),
            qagent: RoutingQAgent::new(config.learning.clone()),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn anomalies(&self) -> &AnomalyDetector {
        &self.anomalies
    }

    /// Direct access for manual breaker control.
    pub fn anomalies_mut(&mut self) -> &mut AnomalyDetector {
        &mut self.anomalies
    }

    pub fn experiments(&self) -> &ExperimentManager {
        &self.experiments
    }

    pub fn shadow(&self) -> &ShadowEvaluationEngine {
        &self.shadow
    }

    pub fn qagent(&self) -> &RoutingQAgent {
        &self.qagent
    }

    pub fn register_experiment(&mut self, experiment: Experiment) -> Result<(), ExperimentError> {
        self.experiments.register(experiment)
    }

    /// Build a plan from the request and the runtime's current state.
    ///
    /// Fails only when the request names an unregistered experiment.
    pub fn plan(&mut self, request: &PlanRequest<'_>) -> Result<PlanOutcome, ExperimentError> {
        self.plan_at(request, Utc::now())
    }

    pub fn plan_at(&mut self, request: &PlanRequest<'_>, now: DateTime<Utc>) -> Result<PlanOutcome, ExperimentError> {
        let signals = self.signals_at(request, now)?;
        Ok(self.builder.build(request, &signals))
    }

    fn signals_at(&mut self, request: &PlanRequest<'_>, now: DateTime<Utc>) -> Result<PlanSignals, ExperimentError> {
        let variant = match &request.experiment_id {
            Some(experiment_id) => {
                let subject = request.subject_id.as_deref().unwrap_or(experiment_id.as_str());
                let variant = self.experiments.pick_variant(experiment_id, subject)?;
                Some(ActiveVariant {
                    experiment_id: experiment_id.clone(),
                    variant_id: variant.id.clone(),
                    overrides: variant.overrides.clone(),
                })
            }
            None => None,
        };

        let over_budget: Vec<String> = request
            .catalog
            .iter()
            .filter(|m| self.costs.check_at(m, now) == CostVerdict::Block)
            .map(|m| m.id.clone())
            .collect();

        let quota = QuotaHealth::classify(&request.quota, &request.policy);
        let mut signals = PlanSignals {
            variant,
            ..Default::default()
        };
        for role in AgentRole::ALL {
            let mut blocked = self.anomalies.open_circuits_at(role, now);
            blocked.extend(over_budget.iter().cloned());
            if !blocked.is_empty() {
                signals.blocked.insert(role, blocked);
            }

            let state = QState {
                role,
                quota,
                task: TaskType::default(),
            };
            let bias = self.qagent.bias_for(&state);
            if !bias.is_empty() {
                signals.learned_bias.insert(role, bias);
            }
        }

        if !request.usage_history.is_empty() {
            let options = ForecastOptions::from_config(&self.config.forecast, now.date_naive());
            signals.quota_exhaustion = forecast_quota(request.usage_history, &request.quota, &options).exhaustion_date;
        }
        Ok(signals)
    }

    /// Feed one telemetry sample into the engine.
    pub fn ingest(&mut self, ingestion: Ingestion<'_>) -> IngestReport {
        self.ingest_at(ingestion, Utc::now())
    }

    /// Live samples update anomaly detection (possibly opening a breaker)
    /// and experiment metrics; shadow samples only feed shadow evaluation.
    /// Token usage is charged either way.
    pub fn ingest_at(&mut self, ingestion: Ingestion<'_>, now: DateTime<Utc>) -> IngestReport {
        let Ingestion {
            role,
            model,
            sample,
            usage,
        } = ingestion;
        crate::metrics::record_telemetry_ingested(sample.traffic);

        let mut anomalies = Vec::new();
        let mut circuit_opened = false;

        if sample.traffic == TrafficKind::Live {
            if let Some(tag) = &sample.experiment {
                if let Err(e) = self
                    .experiments
                    .record_variant_metrics(&tag.experiment_id, &tag.variant_id, sample.clone())
                {
                    tracing::warn!(error = %e, "Dropping experiment-tagged sample");
                }
            }

            self.anomalies.record(role, &model.id, sample.clone());
            anomalies = self.anomalies.detect(role, &model.id);

            if let Some(threshold) = self.config.anomaly.auto_open_severity {
                let tripping: Vec<&str> = anomalies
                    .iter()
                    .filter(|a| a.severity >= threshold)
                    .map(|a| a.kind.as_str())
                    .collect();
                if !tripping.is_empty() {
                    let ttl = self.config.anomaly.circuit_ttl();
                    let reason = format!("anomaly: {}", tripping.join(", "));
                    self.anomalies.open_circuit_at(role, &model.id, &reason, ttl, now);
                    circuit_opened = true;
                }
            }
        }
        self.shadow.record(role, &model.id, sample);

        let cost_usd = match usage {
            Some(usage) => self.costs.record_at(model, usage, now),
            None => 0.0,
        };
        let cost_verdict = self.costs.check_at(model, now);

        IngestReport {
            anomalies,
            circuit_opened,
            cost_usd,
            cost_verdict,
        }
    }

    /// Judge a shadow candidate against the live baseline; a rollback opens
    /// the candidate's breaker for `ttl`.
    pub fn evaluate_shadow_canary(
        &mut self,
        role: AgentRole,
        candidate: &str,
        baseline: &str,
        ttl: Duration,
    ) -> TrendDecision {
        self.evaluate_shadow_canary_at(role, candidate, baseline, ttl, Utc::now())
    }

    pub fn evaluate_shadow_canary_at(
        &mut self,
        role: AgentRole,
        candidate: &str,
        baseline: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> TrendDecision {
        let decision = self.shadow.evaluate(role, candidate, baseline, &self.config.canary);
        crate::metrics::record_canary_decision(decision.action);
        if decision.action == TrendAction::Rollback {
            tracing::warn!(role = %role, model = candidate, composite = decision.composite, "Shadow canary rolled back");
            let reason = format!("shadow canary rollback: {}", decision.reason);
            self.anomalies.open_circuit_at(role, candidate, &reason, ttl, now);
        }
        decision
    }

    /// Judge every variant against `baseline_variant`. Each rolled-back
    /// variant has the breakers of its overridden (role, model) pairs opened
    /// for `ttl`.
    pub fn evaluate_experiment_canary_trends(
        &mut self,
        experiment_id: &str,
        baseline_variant: &str,
        ttl: Duration,
    ) -> Result<Vec<TrendDecision>, ExperimentError> {
        self.evaluate_experiment_canary_trends_at(experiment_id, baseline_variant, ttl, Utc::now())
    }

    pub fn evaluate_experiment_canary_trends_at(
        &mut self,
        experiment_id: &str,
        baseline_variant: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<TrendDecision>, ExperimentError> {
        let decisions = self
            .experiments
            .evaluate_trends(experiment_id, baseline_variant, &self.config.canary)?;

        for decision in &decisions {
            crate::metrics::record_canary_decision(decision.action);
            if decision.action != TrendAction::Rollback {
                continue;
            }
            let overrides = self
                .experiments
                .get(experiment_id)
                .and_then(|e| e.variant(&decision.subject))
                .map(|v| v.overrides.clone())
                .unwrap_or_default();
            tracing::warn!(
                experiment = experiment_id,
                variant = %decision.subject,
                composite = decision.composite,
                overrides = overrides.len(),
                "Experiment variant rolled back"
            );
            let reason = format!("experiment {} variant {} rolled back", experiment_id, decision.subject);
            for (role, model) in overrides {
                self.anomalies.open_circuit_at(role, &model, &reason, ttl, now);
            }
        }
        Ok(decisions)
    }

    /// Apply one learning step; the updated values bias later plans.
    pub fn learn(&mut self, update: &QUpdate) -> f64 {
        self.qagent.update(update)
    }

    pub fn forecast(&self, history: &[UsageRecord], quota: &QuotaStatus, today: DateTime<Utc>) -> QuotaForecast {
        let options = ForecastOptions::from_config(&self.config.forecast, today.date_naive());
        forecast_quota(history, quota, &options)
    }

    pub fn spend(&mut self) -> SpendSnapshot {
        self.costs.snapshot()
    }

    /// Per-model learned values for a state, as fed into scoring.
    pub fn learned_bias(&self, state: &QState) -> HashMap<String, f64> {
        self.qagent.bias_for(state)
    }
}

impl Default for RoutingRuntime {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModelCost;
    use crate::config::{BudgetConfig, EnforcementMode};
    use crate::experiments::Variant;
    use crate::learning::{BillingMode, QAction, Reward};
    use crate::routing::policy::RoutingPolicy;
    use crate::routing::Provenance;
    use crate::telemetry::{AnomalyKind, Severity};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn paid(id: &str) -> Model {
        let mut m = Model::new(id, id);
        m.cost = Some(ModelCost {
            input: 1.0,
            output: 4.0,
        });
        m.capabilities.tool_calling = true;
        m.capabilities.reasoning = true;
        m
    }

    fn steady() -> TelemetrySample {
        TelemetrySample::new(0.98, 1000.0, 0.01, 0.05)
    }

    #[test]
    fn live_ingest_detects_and_auto_opens_on_critical() {
        let mut runtime = RoutingRuntime::default();
        let model = paid("openai/gpt-5");
        for _ in 0..8 {
            let report = runtime.ingest_at(Ingestion::new(AgentRole::Fixer, &model, steady()), now());
            assert!(report.anomalies.is_empty());
        }

        let spike = TelemetrySample::new(0.98, 1000.0, 0.01, 0.6);
        let report = runtime.ingest_at(Ingestion::new(AgentRole::Fixer, &model, spike), now());
        assert_eq!(report.anomalies.len(), 1);
        assert_eq!(report.anomalies[0].kind, AnomalyKind::FallbackSpike);
        assert_eq!(report.anomalies[0].severity, Severity::Critical);
        assert!(report.circuit_opened);
        assert!(runtime.anomalies_mut().is_circuit_open_at(AgentRole::Fixer, "openai/gpt-5", now()));
        assert!(!runtime.anomalies_mut().is_circuit_open_at(AgentRole::Oracle, "openai/gpt-5", now()));
    }

    #[test]
    fn oversized_circuit_ttl_blocks_until_end_of_time() {
        let mut config = EngineConfig::default();
        config.anomaly.circuit_ttl_seconds = 10_000_000_000_000_000;
        let mut runtime = RoutingRuntime::new(config);
        let model = paid("openai/gpt-5");
        for _ in 0..8 {
            runtime.ingest_at(Ingestion::new(AgentRole::Fixer, &model, steady()), now());
        }

        let spike = TelemetrySample::new(0.98, 1000.0, 0.01, 0.6);
        let report = runtime.ingest_at(Ingestion::new(AgentRole::Fixer, &model, spike), now());
        assert!(report.circuit_opened);
        let state = runtime
            .anomalies()
            .circuit_state(AgentRole::Fixer, "openai/gpt-5")
            .unwrap();
        assert_eq!(state.blocked_until, DateTime::<Utc>::MAX_UTC);
        assert!(runtime
            .anomalies_mut()
            .is_circuit_open_at(AgentRole::Fixer, "openai/gpt-5", now() + Duration::days(3650)));
    }

    #[test]
    fn non_critical_anomaly_does_not_open_circuit() {
        let mut runtime = RoutingRuntime::default();
        let model = paid("openai/gpt-5");
        for _ in 0..8 {
            runtime.ingest_at(Ingestion::new(AgentRole::Fixer, &model, steady()), now());
        }
        let slow = TelemetrySample::new(0.98, 2500.0, 0.01, 0.05);
        let report = runtime.ingest_at(Ingestion::new(AgentRole::Fixer, &model, slow), now());
        assert_eq!(report.anomalies[0].kind, AnomalyKind::LatencySpike);
        assert!(!report.circuit_opened);
    }

    #[test]
    fn shadow_samples_skip_anomaly_detection() {
        let mut runtime = RoutingRuntime::default();
        let model = paid("openai/gpt-5");
        for _ in 0..10 {
            runtime.ingest_at(Ingestion::new(AgentRole::Fixer, &model, steady().shadow()), now());
        }
        assert_eq!(runtime.anomalies().sample_count(AgentRole::Fixer, "openai/gpt-5"), 0);
        assert_eq!(
            runtime
                .shadow()
                .summary(AgentRole::Fixer, "openai/gpt-5", TrafficKind::Shadow)
                .samples,
            10
        );
    }

    #[test]
    fn usage_is_charged_and_blocks_under_hard_budget() {
        let mut config = EngineConfig::default();
        config.budget = BudgetConfig {
            daily_limit_usd: Some(0.5),
            monthly_limit_usd: None,
            enforcement: EnforcementMode::Block,
        };
        let mut runtime = RoutingRuntime::new(config);
        let model = paid("openai/gpt-5");

        let report = runtime.ingest_at(
            Ingestion::new(AgentRole::Fixer, &model, steady()).with_usage(TokenUsage::new(1_000_000, 0)),
            now(),
        );
        assert!((report.cost_usd - 1.0).abs() < 1e-9);
        assert_eq!(report.cost_verdict, CostVerdict::Block);

        let catalog = vec![model.clone(), paid("zai/glm-4.6"), Model::new("opencode/gpt-5-nano", "GPT-5 Nano")];
        let request = PlanRequest::new(&catalog, RoutingPolicy::default(), QuotaStatus::new(90, 2400));
        let outcome = runtime.plan_at(&request, now()).unwrap();
        for role in AgentRole::ALL {
            assert_eq!(outcome.plan.chain_for(role), ["opencode/gpt-5-nano".to_string()]);
        }
    }

    #[test]
    fn shadow_canary_rollback_opens_candidate_circuit() {
        let mut runtime = RoutingRuntime::default();
        let baseline = paid("openai/gpt-5");
        let candidate = paid("zai/glm-4.6");
        for _ in 0..30 {
            runtime.ingest_at(Ingestion::new(AgentRole::Oracle, &baseline, steady()), now());
            let bad = TelemetrySample::new(0.7, 2500.0, 0.02, 0.3).shadow();
            runtime.ingest_at(Ingestion::new(AgentRole::Oracle, &candidate, bad), now());
        }

        let decision = runtime.evaluate_shadow_canary_at(
            AgentRole::Oracle,
            "zai/glm-4.6",
            "openai/gpt-5",
            Duration::minutes(30),
            now(),
        );
        assert_eq!(decision.action, TrendAction::Rollback);
        let anomalies = runtime.anomalies_mut();
        assert!(anomalies.is_circuit_open_at(AgentRole::Oracle, "zai/glm-4.6", now()));
        assert!(!anomalies.is_circuit_open_at(AgentRole::Oracle, "zai/glm-4.6", now() + Duration::minutes(31)));
    }

    #[test]
    fn experiment_rollback_blocks_variant_overrides() {
        let mut runtime = RoutingRuntime::default();
        runtime
            .register_experiment(Experiment::new(
                "exp",
                "Fixer trial",
                vec![
                    Variant::new("control", 50.0),
                    Variant::new("treatment", 50.0).with_override(AgentRole::Fixer, "zai/glm-4.6"),
                ],
            ))
            .unwrap();

        let model = paid("zai/glm-4.6");
        for _ in 0..20 {
            let good = TelemetrySample::new(0.98, 900.0, 0.01, 0.02).with_experiment("exp", "control");
            let bad = TelemetrySample::new(0.70, 2400.0, 0.03, 0.30).with_experiment("exp", "treatment");
            runtime.ingest_at(Ingestion::new(AgentRole::Fixer, &model, good), now());
            runtime.ingest_at(Ingestion::new(AgentRole::Fixer, &model, bad), now());
        }
        // The alternating samples above tripped the live breaker; start clean
        runtime.anomalies = AnomalyDetector::new(runtime.config.anomaly.clone());

        let decisions = runtime
            .evaluate_experiment_canary_trends_at("exp", "control", Duration::minutes(15), now())
            .unwrap();
        assert_eq!(decisions[1].action, TrendAction::Rollback);
        assert!(runtime
            .anomalies_mut()
            .is_circuit_open_at(AgentRole::Fixer, "zai/glm-4.6", now()));
    }

    #[test]
    fn plan_applies_variant_unless_rolled_back() {
        let mut runtime = RoutingRuntime::default();
        runtime
            .register_experiment(Experiment::new(
                "exp",
                "All treatment",
                vec![Variant::new("treatment", 100.0).with_override(AgentRole::Fixer, "zai/glm-4.6")],
            ))
            .unwrap();
        let catalog = vec![paid("openai/gpt-5"), paid("zai/glm-4.6")];
        let request = PlanRequest::new(&catalog, RoutingPolicy::default(), QuotaStatus::new(90, 2400))
            .with_experiment("exp", "session-1");

        let outcome = runtime.plan_at(&request, now()).unwrap();
        assert_eq!(outcome.plan.provenance[&AgentRole::Fixer], Provenance::ExperimentOverride);
        assert_eq!(outcome.plan.metadata.experiment.as_ref().unwrap().variant, "treatment");

        runtime
            .anomalies_mut()
            .open_circuit_at(AgentRole::Fixer, "zai/glm-4.6", "rollback", Duration::minutes(15), now());
        let outcome = runtime.plan_at(&request, now()).unwrap();
        assert_eq!(outcome.plan.provenance[&AgentRole::Fixer], Provenance::ScoringDefault);
        assert_eq!(outcome.plan.agents[&AgentRole::Fixer], "openai/gpt-5");
    }

    #[test]
    fn plan_with_unknown_experiment_fails() {
        let mut runtime = RoutingRuntime::default();
        let catalog = vec![paid("openai/gpt-5")];
        let request = PlanRequest::new(&catalog, RoutingPolicy::default(), QuotaStatus::new(90, 2400))
            .with_experiment("missing", "session-1");
        assert_eq!(
            runtime.plan_at(&request, now()).unwrap_err(),
            ExperimentError::UnknownExperiment("missing".into())
        );
    }

    #[test]
    fn learning_biases_later_plans() {
        let mut runtime = RoutingRuntime::default();
        let policy = RoutingPolicy::default();
        let quota = QuotaStatus::new(90, 2400);
        let state = QState {
            role: AgentRole::Explorer,
            quota: QuotaHealth::classify(&quota, &policy),
            task: TaskType::default(),
        };
        let action = QAction::new("zai/glm-4.6", BillingMode::PayPerUse);
        for _ in 0..5 {
            runtime.learn(&QUpdate {
                state,
                action: action.clone(),
                reward: Reward {
                    success: 1.0,
                    ..Default::default()
                },
                next_state: state,
                available_next_actions: vec![],
            });
        }
        assert!(runtime.learned_bias(&state)["zai/glm-4.6"] > 0.5);

        let catalog = vec![paid("openai/gpt-5"), paid("zai/glm-4.6")];
        let request = PlanRequest::new(&catalog, policy, quota);
        let outcome = runtime.plan_at(&request, now()).unwrap();
        assert_eq!(outcome.plan.agents[&AgentRole::Explorer], "zai/glm-4.6");
    }
}
