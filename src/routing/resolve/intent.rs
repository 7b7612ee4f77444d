//! Per-role resolution state
//!
//! Shared state object passed through the resolver pipeline for one role.

use crate::catalog::{AgentRole, Model};
use crate::routing::plan::Provenance;
use crate::routing::scoring::ScoredCandidate;
use std::collections::HashSet;

/// Winning assignment for a role.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub model: String,
    /// Ordered chain, primary first
    pub chain: Vec<String>,
    pub provenance: Provenance,
    /// Human-readable reason from the winning resolver
    pub reason: String,
}

/// Routing state for one role, annotated by resolvers.
#[derive(Debug, Clone)]
pub struct RoleIntent<'a> {
    pub role: AgentRole,

    // === Inputs ===
    pub catalog: &'a [Model],
    /// Ranked candidates, best first. Circuit-open models are excluded
    /// unless `degraded` is set.
    pub ranked: Vec<ScoredCandidate>,
    /// Models with an open breaker for this role
    pub blocked: &'a HashSet<String>,
    /// Every catalog model was blocked; `ranked` ignores breakers
    pub degraded: bool,
    /// Target chain length, primary included
    pub chain_depth: usize,

    // === Outcome ===
    pub resolution: Option<Resolution>,
    /// Observations from resolvers that did not win, for explanations
    pub notes: Vec<String>,
}

impl<'a> RoleIntent<'a> {
    pub fn new(
        role: AgentRole,
        catalog: &'a [Model],
        ranked: Vec<ScoredCandidate>,
        blocked: &'a HashSet<String>,
        chain_depth: usize,
    ) -> Self {
        Self {
            role,
            catalog,
            ranked,
            blocked,
            degraded: false,
            chain_depth,
            resolution: None,
            notes: Vec::new(),
        }
    }

    pub fn in_catalog(&self, model_id: &str) -> bool {
        crate::catalog::contains_model(self.catalog, model_id)
    }

    pub fn is_blocked(&self, model_id: &str) -> bool {
        self.blocked.contains(model_id)
    }

    /// Best ranked candidate, if any.
    pub fn top(&self) -> Option<&ScoredCandidate> {
        self.ranked.first()
    }

    pub fn candidate(&self, model_id: &str) -> Option<&ScoredCandidate> {
        self.ranked.iter().find(|c| c.id() == model_id)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    pub fn resolve(&mut self, model: &str, chain: Vec<String>, provenance: Provenance, reason: String) {
        self.resolution = Some(Resolution {
            model: model.to_string(),
            chain,
            provenance,
            reason,
        });
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }
}
