//! Spend limit configuration

use serde::{Deserialize, Serialize};

/// Spend limits enforced by the cost tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Daily spending limit in USD
    pub daily_limit_usd: Option<f64>,

    /// Monthly spending limit in USD
    pub monthly_limit_usd: Option<f64>,

    /// What happens once a limit is exceeded
    pub enforcement: EnforcementMode,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            daily_limit_usd: None,
            monthly_limit_usd: None,
            enforcement: EnforcementMode::Warn,
        }
    }
}

impl BudgetConfig {
    /// Validate configuration at startup
    pub fn validate(&self) -> Result<(), String> {
        for (name, limit) in [
            ("daily_limit_usd", self.daily_limit_usd),
            ("monthly_limit_usd", self.monthly_limit_usd),
        ] {
            if let Some(limit) = limit {
                if limit < 0.0 {
                    return Err(format!("{} must be >= 0.0", name));
                }
            }
        }
        Ok(())
    }
}

/// Action once a spend limit is exceeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementMode {
    /// Flag the breach, keep routing
    #[default]
    #[serde(alias = "soft")]
    Warn,

    /// Stop routing to paid models
    #[serde(alias = "hard")]
    Block,
}

impl std::str::FromStr for EnforcementMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "warn" | "soft" => Ok(EnforcementMode::Warn),
            "block" | "hard" => Ok(EnforcementMode::Block),
            _ => Err(format!("Invalid enforcement mode: {}", s)),
        }
    }
}
