//! Candidate ranking and chain configuration

use crate::routing::beam::BeamLimits;
use serde::{Deserialize, Serialize};

/// Ranking configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Candidates kept per provider after ranking
    pub max_per_provider: usize,
    /// Distinct providers kept after ranking
    pub max_providers: usize,
    /// Target length of each role's fallback chain, primary included
    pub chain_depth: usize,
    /// Always-free model injected into chains on canary rollback.
    /// Only used when present in the catalog.
    pub free_fallback_model: String,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            max_per_provider: 2,
            max_providers: 4,
            chain_depth: 3,
            free_fallback_model: "opencode/gpt-5-nano".to_string(),
        }
    }
}

impl RankingConfig {
    pub fn limits(&self) -> BeamLimits {
        BeamLimits {
            max_per_provider: self.max_per_provider,
            max_providers: self.max_providers,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_per_provider == 0 {
            return Err("max_per_provider must be >= 1".to_string());
        }
        if self.max_providers == 0 {
            return Err("max_providers must be >= 1".to_string());
        }
        if self.chain_depth == 0 {
            return Err("chain_depth must be >= 1".to_string());
        }
        Ok(())
    }
}
