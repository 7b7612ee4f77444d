//! Resolver pipeline
//!
//! Decides each role's assignment by running resolvers in precedence order.
//! The first resolver that resolves the intent wins and its provenance is
//! recorded; later resolvers are skipped.

pub mod canary;
pub mod experiment;
pub mod intent;
pub mod pinned;
pub mod ranked;

pub use canary::CanaryFallbackResolver;
pub use experiment::ExperimentResolver;
pub use intent::{Resolution, RoleIntent};
pub use pinned::PinnedResolver;
pub use ranked::ScoringResolver;

/// One decision layer.
pub trait Resolver {
    /// Resolver identifier for logging.
    fn name(&self) -> &'static str;

    /// Resolve the intent if this layer applies; otherwise leave it
    /// untouched (notes may still be added).
    fn resolve(&self, intent: &mut RoleIntent<'_>);
}

/// Fixed-order sequence of resolvers.
/// Order: Pinned → ExperimentOverride → CanaryFallback → Scoring
pub struct ResolverPipeline<'a> {
    resolvers: Vec<Box<dyn Resolver + 'a>>,
}

impl<'a> ResolverPipeline<'a> {
    pub fn new(resolvers: Vec<Box<dyn Resolver + 'a>>) -> Self {
        Self { resolvers }
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Run resolvers until one resolves the intent.
    pub fn execute(&self, intent: &mut RoleIntent<'_>) -> Option<Resolution> {
        for resolver in &self.resolvers {
            if intent.is_resolved() {
                break;
            }
            resolver.resolve(intent);
            tracing::trace!(
                role = %intent.role,
                resolver = resolver.name(),
                resolved = intent.is_resolved(),
                "Resolver completed"
            );
        }
        intent.resolution.clone()
    }
}
