//! Scoring resolver
//!
//! Default layer: the best ranked candidate wins, followed by the next-best
//! alternatives with provider diversity.

use super::{Resolver, RoleIntent};
use crate::routing::beam::build_alternatives_chain;
use crate::routing::plan::Provenance;

pub struct ScoringResolver;

impl Resolver for ScoringResolver {
    fn name(&self) -> &'static str {
        "ScoringResolver"
    }

    fn resolve(&self, intent: &mut RoleIntent<'_>) {
        let Some(top) = intent.top() else {
            return;
        };
        let model = top.id().to_string();
        let reason = format!("highest score {:.3} among {} candidates", top.score, intent.ranked.len());
        let chain = build_alternatives_chain(&model, &intent.ranked, intent.chain_depth);
        intent.resolve(&model, chain, Provenance::ScoringDefault, reason);
    }
}
