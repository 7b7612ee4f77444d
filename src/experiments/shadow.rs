//! Shadow traffic evaluation.
//!
//! Candidates receive mirrored ("shadow") traffic whose results never reach
//! users. Their shadow metrics are judged against the live metrics of the
//! model currently serving the role.

use super::canary::{evaluate_trend, TrendDecision};
use crate::catalog::AgentRole;
use crate::config::{CanaryConfig, ShadowConfig};
use crate::telemetry::{MetricSummary, SampleWindow, TelemetrySample, TrafficKind};
use std::collections::HashMap;

type WindowKey = (AgentRole, String, TrafficKind);

#[derive(Debug)]
pub struct ShadowEvaluationEngine {
    config: ShadowConfig,
    windows: HashMap<WindowKey, SampleWindow<TelemetrySample>>,
}

impl ShadowEvaluationEngine {
    pub fn new(config: ShadowConfig) -> Self {
        Self {
            config,
            windows: HashMap::new(),
        }
    }

    pub fn config(&self) -> &ShadowConfig {
        &self.config
    }

    /// Store a sample under its own traffic kind.
    pub fn record(&mut self, role: AgentRole, model: &str, sample: TelemetrySample) {
        let window_size = self.config.window_size;
        self.windows
            .entry((role, model.to_string(), sample.traffic))
            .or_insert_with(|| SampleWindow::new(window_size))
            .push(sample);
    }

    pub fn summary(&self, role: AgentRole, model: &str, traffic: TrafficKind) -> MetricSummary {
        self.windows
            .get(&(role, model.to_string(), traffic))
            .map(|window| MetricSummary::from_samples(window.iter()))
            .unwrap_or_default()
    }

    /// Judge `candidate`'s shadow traffic against `baseline`'s live traffic.
    ///
    /// Holds until both sides reach the configured shadow sample count.
    pub fn evaluate(
        &self,
        role: AgentRole,
        candidate: &str,
        baseline: &str,
        canary: &CanaryConfig,
    ) -> TrendDecision {
        if candidate == baseline {
            return TrendDecision::hold(candidate, "baseline");
        }
        let candidate_summary = self.summary(role, candidate, TrafficKind::Shadow);
        let baseline_summary = self.summary(role, baseline, TrafficKind::Live);
        evaluate_trend(
            candidate,
            &candidate_summary,
            &baseline_summary,
            self.config.min_samples,
            canary,
        )
    }
}

impl Default for ShadowEvaluationEngine {
    fn default() -> Self {
        Self::new(ShadowConfig::default())
    }
}
