//! Shared test utilities for agent-router integration tests.
//!
//! Provides catalog builders and policy fixtures so the scenario tests
//! read as scenarios rather than setup.

#![allow(dead_code)]

use agent_router::catalog::{Capabilities, Model, ModelCost, ModelStatus};
use agent_router::routing::policy::{Enforcement, SubscriptionBudget};
use agent_router::routing::{QuotaStatus, RoutingMode, RoutingPolicy};
use chrono::{DateTime, TimeZone, Utc};

/// Always-free model used as the rollback fallback.
pub const FREE_FALLBACK: &str = "opencode/gpt-5-nano";

// =============================================================================
// Model Builders
// =============================================================================

/// A paid model with the given per-million pricing and full capabilities.
pub fn make_paid_model(id: &str, input: f64, output: f64) -> Model {
    let mut model = Model::new(id, id);
    model.cost = Some(ModelCost { input, output });
    model.context_limit = 200_000;
    model.output_limit = 32_000;
    model.capabilities = Capabilities {
        reasoning: true,
        tool_calling: true,
        attachments: true,
    };
    model
}

/// A model without pricing, treated as free.
pub fn make_free_model(id: &str) -> Model {
    let mut model = Model::new(id, id);
    model.context_limit = 128_000;
    model.capabilities.tool_calling = true;
    model
}

pub fn make_model_with_status(id: &str, status: ModelStatus) -> Model {
    let mut model = make_paid_model(id, 1.0, 4.0);
    model.status = status;
    model
}

// =============================================================================
// Catalog Builders
// =============================================================================

/// Six models across five providers, including the free fallback.
pub fn six_model_catalog() -> Vec<Model> {
    vec![
        make_paid_model("openai/gpt-5", 1.25, 10.0),
        make_paid_model("anthropic/claude-sonnet-4", 3.0, 15.0),
        make_paid_model("google/gemini-2.5-flash", 0.3, 2.5),
        make_paid_model("zai/glm-4.6", 0.6, 2.2),
        make_paid_model("chutes/deepseek-v3", 0.25, 1.0),
        make_free_model(FREE_FALLBACK),
    ]
}

/// Same as [`six_model_catalog`] without the free fallback model.
pub fn catalog_without_free_fallback() -> Vec<Model> {
    six_model_catalog()
        .into_iter()
        .filter(|m| m.id != FREE_FALLBACK)
        .collect()
}

// =============================================================================
// Policy Fixtures
// =============================================================================

pub fn hybrid_policy() -> RoutingPolicy {
    RoutingPolicy::new(RoutingMode::Hybrid).with_budget(SubscriptionBudget {
        daily_requests: Some(100),
        monthly_requests: Some(3000),
        enforcement: Enforcement::Soft,
    })
}

/// dailyRemaining=90, monthlyRemaining=2400
pub fn healthy_quota() -> QuotaStatus {
    QuotaStatus::new(90, 2400)
}

/// Fixed clock for breaker and spend tests.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
}
