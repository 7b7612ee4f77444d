//! Pinned preference resolver
//!
//! A caller-pinned model wins for its role whenever it exists in the
//! catalog, regardless of scores, breakers or canary state.

use super::{Resolver, RoleIntent};
use crate::catalog::AgentRole;
use crate::routing::beam::build_alternatives_chain;
use crate::routing::plan::Provenance;
use std::collections::BTreeMap;

pub struct PinnedResolver<'a> {
    preferences: &'a BTreeMap<AgentRole, String>,
}

impl<'a> PinnedResolver<'a> {
    pub fn new(preferences: &'a BTreeMap<AgentRole, String>) -> Self {
        Self { preferences }
    }
}

impl Resolver for PinnedResolver<'_> {
    fn name(&self) -> &'static str {
        "PinnedResolver"
    }

    fn resolve(&self, intent: &mut RoleIntent<'_>) {
        let Some(model) = self.preferences.get(&intent.role) else {
            return;
        };
        if !intent.in_catalog(model) {
            tracing::warn!(role = %intent.role, model = %model, "Pinned model not in catalog, ignoring");
            intent.note(format!("pinned model {} is not in the catalog", model));
            return;
        }

        let chain = build_alternatives_chain(model, &intent.ranked, intent.chain_depth);
        let reason = if intent.is_blocked(model) {
            format!("pinned to {} (circuit open, pin honoured)", model)
        } else {
            format!("pinned to {}", model)
        };
        intent.resolve(model, chain, Provenance::PinnedModel, reason);
    }
}
