//! Anomaly detection and circuit breaking per (role, model).
//!
//! Each pair keeps a rolling window of telemetry. `detect` compares the
//! newest sample against the average of the older samples in the window.
//! Circuit breakers block a pair until a deadline and expire lazily: a read
//! past the deadline reports closed and drops the stored state.

use super::{SampleWindow, TelemetrySample};
use crate::catalog::AgentRole;
use crate::config::AnomalyConfig;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Kind of regression detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    LatencySpike,
    CostSpike,
    FallbackSpike,
    SuccessDrop,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::LatencySpike => "latency_spike",
            AnomalyKind::CostSpike => "cost_spike",
            AnomalyKind::FallbackSpike => "fallback_spike",
            AnomalyKind::SuccessDrop => "success_drop",
        }
    }
}

/// Severity of an anomaly, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// One detected regression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub severity: Severity,
    /// Value of the newest sample
    pub observed: f64,
    /// Average over the older samples in the window
    pub baseline: f64,
    pub message: String,
}

/// An open breaker for a (role, model) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerState {
    pub blocked_until: DateTime<Utc>,
    pub reason: String,
}

type PairKey = (AgentRole, String);

/// Rolling telemetry history and circuit breakers.
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    config: AnomalyConfig,
    windows: HashMap<PairKey, SampleWindow<TelemetrySample>>,
    breakers: HashMap<PairKey, CircuitBreakerState>,
}

#[derive(Default)]
struct Baseline {
    latency: f64,
    cost: f64,
    fallback: f64,
    success: f64,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> Self {
        Self {
            config,
            windows: HashMap::new(),
            breakers: HashMap::new(),
        }
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    /// Append a sample to the pair's window.
    pub fn record(&mut self, role: AgentRole, model: &str, sample: TelemetrySample) {
        let window_size = self.config.window_size;
        self.windows
            .entry((role, model.to_string()))
            .or_insert_with(|| SampleWindow::new(window_size))
            .push(sample);
    }

    /// Number of retained samples for the pair.
    pub fn sample_count(&self, role: AgentRole, model: &str) -> usize {
        self.windows
            .get(&(role, model.to_string()))
            .map(|w| w.len())
            .unwrap_or(0)
    }

    /// Compare the newest sample against the average of the older ones.
    ///
    /// Returns nothing until `min_samples` samples are retained. Several
    /// anomalies may fire for the same sample.
    pub fn detect(&self, role: AgentRole, model: &str) -> Vec<Anomaly> {
        let Some(window) = self.windows.get(&(role, model.to_string())) else {
            return Vec::new();
        };
        if window.len() < self.config.min_samples.max(2) {
            return Vec::new();
        }
        let Some(newest) = window.latest() else {
            return Vec::new();
        };

        let prior_count = window.len() - 1;
        let mut baseline = Baseline::default();
        for sample in window.iter().take(prior_count) {
            baseline.latency += sample.avg_latency_ms;
            baseline.cost += sample.avg_cost;
            baseline.fallback += sample.fallback_rate;
            baseline.success += sample.success_rate;
        }
        let n = prior_count as f64;
        baseline.latency /= n;
        baseline.cost /= n;
        baseline.fallback /= n;
        baseline.success /= n;

        let cfg = &self.config;
        let mut anomalies = Vec::new();

        if newest.avg_latency_ms > cfg.latency_spike_ratio * baseline.latency {
            anomalies.push(Anomaly {
                kind: AnomalyKind::LatencySpike,
                severity: Severity::High,
                observed: newest.avg_latency_ms,
                baseline: baseline.latency,
                message: format!(
                    "Latency {:.0}ms exceeds {:.1}x baseline {:.0}ms",
                    newest.avg_latency_ms, cfg.latency_spike_ratio, baseline.latency
                ),
            });
        }

        if newest.avg_cost > cfg.cost_spike_ratio * baseline.cost {
            anomalies.push(Anomaly {
                kind: AnomalyKind::CostSpike,
                severity: Severity::Medium,
                observed: newest.avg_cost,
                baseline: baseline.cost,
                message: format!(
                    "Cost ${:.4} exceeds {:.1}x baseline ${:.4}",
                    newest.avg_cost, cfg.cost_spike_ratio, baseline.cost
                ),
            });
        }

        let fallback_limit = cfg
            .fallback_floor
            .max(cfg.fallback_spike_ratio * baseline.fallback);
        if newest.fallback_rate > fallback_limit {
            anomalies.push(Anomaly {
                kind: AnomalyKind::FallbackSpike,
                severity: Severity::Critical,
                observed: newest.fallback_rate,
                baseline: baseline.fallback,
                message: format!(
                    "Fallback rate {:.1}% exceeds limit {:.1}%",
                    newest.fallback_rate * 100.0,
                    fallback_limit * 100.0
                ),
            });
        }

        let success_floor = cfg
            .success_ceiling
            .min(baseline.success - cfg.success_drop);
        if newest.success_rate < success_floor {
            anomalies.push(Anomaly {
                kind: AnomalyKind::SuccessDrop,
                severity: Severity::High,
                observed: newest.success_rate,
                baseline: baseline.success,
                message: format!(
                    "Success rate {:.1}% below floor {:.1}%",
                    newest.success_rate * 100.0,
                    success_floor * 100.0
                ),
            });
        }

        for anomaly in &anomalies {
            tracing::warn!(
                role = %role,
                model,
                kind = anomaly.kind.as_str(),
                severity = anomaly.severity.as_str(),
                observed = anomaly.observed,
                baseline = anomaly.baseline,
                "Telemetry anomaly detected"
            );
            crate::metrics::record_anomaly(anomaly.kind, anomaly.severity);
        }

        anomalies
    }

    /// Block the pair for `ttl` starting now.
    pub fn open_circuit(&mut self, role: AgentRole, model: &str, reason: &str, ttl: Duration) {
        self.open_circuit_at(role, model, reason, ttl, Utc::now());
    }

    /// Block the pair for `ttl` starting at `now`.
    pub fn open_circuit_at(
        &mut self,
        role: AgentRole,
        model: &str,
        reason: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) {
        let blocked_until = now
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        tracing::info!(
            role = %role,
            model,
            reason,
            %blocked_until,
            "Circuit breaker opened"
        );
        crate::metrics::record_circuit_opened(role);
        self.breakers.insert(
            (role, model.to_string()),
            CircuitBreakerState {
                blocked_until,
                reason: reason.to_string(),
            },
        );
    }

    pub fn is_circuit_open(&mut self, role: AgentRole, model: &str) -> bool {
        self.is_circuit_open_at(role, model, Utc::now())
    }

    /// Whether the pair is blocked at `now`. Clears an expired breaker.
    pub fn is_circuit_open_at(&mut self, role: AgentRole, model: &str, now: DateTime<Utc>) -> bool {
        let key = (role, model.to_string());
        match self.breakers.get(&key) {
            Some(state) if state.blocked_until > now => true,
            Some(_) => {
                self.breakers.remove(&key);
                tracing::debug!(role = %role, model, "Circuit breaker expired");
                false
            }
            None => false,
        }
    }

    /// Stored breaker state, without expiry handling.
    pub fn circuit_state(&self, role: AgentRole, model: &str) -> Option<&CircuitBreakerState> {
        self.breakers.get(&(role, model.to_string()))
    }

    /// Models currently blocked for `role` at `now`. Clears expired breakers.
    pub fn open_circuits_at(&mut self, role: AgentRole, now: DateTime<Utc>) -> HashSet<String> {
        self.breakers.retain(|_, state| state.blocked_until > now);
        self.breakers
            .keys()
            .filter(|(r, _)| *r == role)
            .map(|(_, model)| model.clone())
            .collect()
    }
}
