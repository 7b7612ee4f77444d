//! Agent Router - role-based model routing engine
//!
//! This library decides which backend model serves each agent role. It scores
//! catalog models per role, ranks them with per-provider diversity bounds,
//! assembles a routing plan with provenance, and keeps the plan honest with
//! telemetry: anomaly detection, circuit breakers, experiments, canary and
//! shadow evaluation, cost tracking, quota forecasting and a tabular
//! Q-learning agent.

pub mod budget;
pub mod catalog;
pub mod config;
pub mod experiments;
pub mod learning;
pub mod logging;
pub mod metrics;
pub mod routing;
pub mod runtime;
pub mod telemetry;

pub use catalog::{AgentRole, Model};
pub use config::EngineConfig;
pub use routing::{PlanBuilder, PlanOutcome, PlanRequest, RoutingPlan};
pub use runtime::RoutingRuntime;
