//! Experiment override resolver
//!
//! Applies the active variant's model override for the role. Overrides that
//! are missing from the catalog, or whose breaker is open (for example after
//! a canary rollback), are skipped.

use super::{Resolver, RoleIntent};
use crate::routing::beam::build_alternatives_chain;
use crate::routing::plan::{ActiveVariant, Provenance};

pub struct ExperimentResolver<'a> {
    variant: Option<&'a ActiveVariant>,
}

impl<'a> ExperimentResolver<'a> {
    pub fn new(variant: Option<&'a ActiveVariant>) -> Self {
        Self { variant }
    }
}

impl Resolver for ExperimentResolver<'_> {
    fn name(&self) -> &'static str {
        "ExperimentResolver"
    }

    fn resolve(&self, intent: &mut RoleIntent<'_>) {
        let Some(variant) = self.variant else {
            return;
        };
        let Some(model) = variant.overrides.get(&intent.role) else {
            return;
        };
        if !intent.in_catalog(model) {
            intent.note(format!(
                "variant {}/{} override {} is not in the catalog",
                variant.experiment_id, variant.variant_id, model
            ));
            return;
        }
        if intent.is_blocked(model) {
            tracing::debug!(
                role = %intent.role,
                model = %model,
                experiment = %variant.experiment_id,
                variant = %variant.variant_id,
                "Experiment override skipped, circuit open"
            );
            intent.note(format!(
                "variant {}/{} override {} skipped: circuit open",
                variant.experiment_id, variant.variant_id, model
            ));
            return;
        }

        let chain = build_alternatives_chain(model, &intent.ranked, intent.chain_depth);
        let reason = format!(
            "experiment {} variant {} assigns {}",
            variant.experiment_id, variant.variant_id, model
        );
        intent.resolve(model, chain, Provenance::ExperimentOverride, reason);
    }
}
