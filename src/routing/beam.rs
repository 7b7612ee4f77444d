//! Diversity-bounded beam selection of candidates per role.

use crate::catalog::{AgentRole, Model};
use crate::routing::scoring::{compare_candidates, score_candidate, ScoredCandidate, ScoringContext};
use std::collections::{HashMap, HashSet};

/// Bounds on how many candidates survive ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeamLimits {
    pub max_per_provider: usize,
    pub max_providers: usize,
}

impl Default for BeamLimits {
    fn default() -> Self {
        Self {
            max_per_provider: 2,
            max_providers: 4,
        }
    }
}

/// Score and rank models for a role.
///
/// Models whose id is in `blocked` (open circuit breaker) are excluded
/// entirely. At most `max_providers` providers survive, chosen by their best
/// candidate, and each keeps at most `max_per_provider` candidates. The
/// result is ordered by score, best first.
pub fn rank_candidates(
    models: &[Model],
    role: AgentRole,
    context: &ScoringContext<'_>,
    limits: BeamLimits,
    blocked: &HashSet<String>,
) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = models
        .iter()
        .filter(|m| !blocked.contains(&m.id))
        .map(|m| score_candidate(m, role, context))
        .collect();
    scored.sort_by(compare_candidates);

    let mut per_provider: HashMap<String, usize> = HashMap::new();
    let mut ranked = Vec::with_capacity(scored.len());

    for candidate in scored {
        let provider = candidate.provider().to_string();
        let taken = per_provider.get(&provider).copied();
        match taken {
            None if per_provider.len() >= limits.max_providers => continue,
            Some(count) if count >= limits.max_per_provider => continue,
            _ => {}
        }
        if limits.max_per_provider == 0 {
            continue;
        }
        *per_provider.entry(provider).or_default() += 1;
        ranked.push(candidate);
    }

    tracing::trace!(
        role = %role,
        candidates = ranked.len(),
        providers = per_provider.len(),
        blocked = blocked.len(),
        "Ranked candidates"
    );

    ranked
}

/// Build an ordered chain starting at `primary`.
///
/// Greedily appends the best remaining ranked candidate, preferring
/// providers not yet in the chain, until `depth` entries or the pool runs
/// out. `primary` need not appear in `ranked`.
pub fn build_alternatives_chain(primary: &str, ranked: &[ScoredCandidate], depth: usize) -> Vec<String> {
    let mut chain = vec![primary.to_string()];
    let mut providers: HashSet<&str> = HashSet::new();
    providers.insert(primary.split('/').next().unwrap_or(primary));

    let mut remaining: Vec<&ScoredCandidate> = ranked.iter().filter(|c| c.id() != primary).collect();

    while chain.len() < depth && !remaining.is_empty() {
        // `ranked` is best-first, so the first match is the best of its kind
        let index = remaining
            .iter()
            .position(|c| !providers.contains(c.provider()))
            .unwrap_or(0);
        let next = remaining.remove(index);
        providers.insert(next.provider());
        chain.push(next.id().to_string());
    }

    chain
}
