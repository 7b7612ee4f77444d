//! Canary fallback resolver
//!
//! When any supplied canary decision recommends rollback, every role whose
//! top candidate is not already the free fallback model gets that model
//! forced into the second chain position. A catalog without the free model,
//! or a free model whose breaker is open for the role, turns this layer into
//! a no-op.

use super::{Resolver, RoleIntent};
use crate::routing::beam::build_alternatives_chain;
use crate::routing::plan::Provenance;

pub struct CanaryFallbackResolver<'a> {
    rollback: bool,
    free_model: &'a str,
}

impl<'a> CanaryFallbackResolver<'a> {
    pub fn new(rollback: bool, free_model: &'a str) -> Self {
        Self {
            rollback,
            free_model,
        }
    }
}

impl Resolver for CanaryFallbackResolver<'_> {
    fn name(&self) -> &'static str {
        "CanaryFallbackResolver"
    }

    fn resolve(&self, intent: &mut RoleIntent<'_>) {
        if !self.rollback {
            return;
        }
        if !intent.in_catalog(self.free_model) {
            intent.note(format!(
                "canary rollback ignored: fallback model {} is not in the catalog",
                self.free_model
            ));
            return;
        }
        if intent.is_blocked(self.free_model) {
            intent.note(format!(
                "canary rollback ignored: fallback model {} is circuit-open",
                self.free_model
            ));
            return;
        }
        let Some(top) = intent.top().map(|c| c.id().to_string()) else {
            return;
        };
        if top == self.free_model {
            return;
        }

        let depth = intent.chain_depth.max(2);
        let mut chain = build_alternatives_chain(&top, &intent.ranked, depth);
        chain.retain(|id| id != self.free_model);
        chain.insert(1, self.free_model.to_string());
        chain.truncate(depth);

        tracing::debug!(role = %intent.role, primary = %top, fallback = self.free_model, "Canary rollback fallback applied");
        let reason = format!(
            "canary rollback: {} kept as primary with {} as first fallback",
            top, self.free_model
        );
        intent.resolve(&top, chain, Provenance::ProviderFallbackPolicy, reason);
    }
}
