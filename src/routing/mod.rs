//! Role-based routing
//!
//! Scoring, diversity-bounded ranking and plan assembly. Each role gets a
//! primary model and an ordered fallback chain, decided by a fixed pipeline
//! of resolvers:
//!
//! 1. a pinned preference present in the catalog
//! 2. the active experiment variant's override
//! 3. the free fallback model forced second on canary rollback
//! 4. the top scored candidate
//!
//! # Example
//!
//! ```
//! use agent_router::catalog::{AgentRole, Model, ModelCost};
//! use agent_router::routing::{PlanBuilder, PlanRequest, PlanSignals};
//! use agent_router::routing::policy::{QuotaStatus, RoutingPolicy};
//!
//! let mut paid = Model::new("openai/gpt-5", "GPT-5");
//! paid.cost = Some(ModelCost { input: 1.25, output: 10.0 });
//! let catalog = vec![paid, Model::new("opencode/gpt-5-nano", "GPT-5 Nano")];
//!
//! let request = PlanRequest::new(&catalog, RoutingPolicy::default(), QuotaStatus::new(90, 2400));
//! let outcome = PlanBuilder::default().build(&request, &PlanSignals::default());
//! assert_eq!(outcome.plan.agents.len(), AgentRole::ALL.len());
//! ```

pub mod beam;
pub mod error;
pub mod explain;
pub mod plan;
pub mod policy;
pub mod resolve;
pub mod scoring;

pub use beam::{build_alternatives_chain, rank_candidates, BeamLimits};
pub use error::RoutingError;
pub use explain::RoleExplanation;
pub use plan::{
    parse_preferences, ActiveVariant, CanaryTrendSummary, ExperimentStamp, PlanBuilder, PlanMetadata, PlanOutcome,
    PlanRequest, PlanSignals, Provenance, RoutingPlan, ENGINE_VERSION,
};
pub use policy::{PacingMode, PacingPolicy, QuotaStatus, RoutingMode, RoutingPolicy, UsageRecord};
pub use scoring::{score_candidate, ScoreBreakdown, ScoredCandidate, ScoringContext};
