//! # Engine metrics
//!
//! Emitted through the `metrics` facade. The library installs no recorder;
//! hosts pick an exporter.
//!
//! **Counters:**
//! - `agent_router_plan_provenance_total{role, provenance}` - winning layer per role
//! - `agent_router_anomalies_total{kind, severity}` - detected anomalies
//! - `agent_router_circuit_opened_total{role}` - breakers opened
//! - `agent_router_canary_decisions_total{action}` - promote/hold/rollback verdicts
//! - `agent_router_telemetry_ingested_total{traffic}` - ingested samples
//!
//! **Histograms:**
//! - `agent_router_plan_build_duration_seconds` - plan build time
//!
//! **Gauges:**
//! - `agent_router_spend_usd{window}` - tracked spend for the current day/month

use crate::catalog::AgentRole;
use crate::experiments::canary::TrendAction;
use crate::routing::Provenance;
use crate::telemetry::{AnomalyKind, Severity, TrafficKind};
use std::time::Duration;

pub fn record_plan_built(elapsed: Duration) {
    metrics::histogram!("agent_router_plan_build_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_provenance(role: AgentRole, provenance: Provenance) {
    metrics::counter!(
        "agent_router_plan_provenance_total",
        "role" => role.as_str(),
        "provenance" => provenance.as_str()
    )
    .increment(1);
}

pub fn record_anomaly(kind: AnomalyKind, severity: Severity) {
    metrics::counter!(
        "agent_router_anomalies_total",
        "kind" => kind.as_str(),
        "severity" => severity.as_str()
    )
    .increment(1);
}

pub fn record_circuit_opened(role: AgentRole) {
    metrics::counter!("agent_router_circuit_opened_total", "role" => role.as_str()).increment(1);
}

pub fn record_canary_decision(action: TrendAction) {
    metrics::counter!("agent_router_canary_decisions_total", "action" => action.as_str())
        .increment(1);
}

/// `window` is "daily" or "monthly".
pub fn record_spend(window: &'static str, usd: f64) {
    metrics::gauge!("agent_router_spend_usd", "window" => window).set(usd);
}

pub fn record_telemetry_ingested(traffic: TrafficKind) {
    metrics::counter!("agent_router_telemetry_ingested_total", "traffic" => traffic.as_str())
        .increment(1);
}
