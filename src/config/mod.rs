//! Engine configuration
//!
//! Layered configuration for the routing engine: defaults, then a TOML file,
//! then `AGENT_ROUTER_*` environment variables.
//!
//! # Example
//!
//! ```rust
//! use agent_router::config::EngineConfig;
//!
//! let config = EngineConfig::default();
//! assert_eq!(config.ranking.chain_depth, 3);
//!
//! let toml = r#"
//! [ranking]
//! chain_depth = 4
//! "#;
//! let config: EngineConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.ranking.chain_depth, 4);
//! assert_eq!(config.ranking.max_providers, 4);
//! ```

pub mod anomaly;
pub mod budget;
pub mod error;
pub mod experiments;
pub mod forecast;
pub mod learning;
pub mod logging;
pub mod ranking;
pub mod transport;

pub use anomaly::AnomalyConfig;
pub use budget::{BudgetConfig, EnforcementMode};
pub use error::ConfigError;
pub use experiments::{CanaryConfig, ExperimentsConfig, ShadowConfig, TrendWeights};
pub use forecast::ForecastConfig;
pub use learning::LearningConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use ranking::RankingConfig;
pub use transport::{CollaboratorConfig, Transport};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Unified configuration for the routing engine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub logging: LoggingConfig,
    /// Candidate ranking and chain construction
    pub ranking: RankingConfig,
    /// Telemetry anomaly thresholds and breaker TTL
    pub anomaly: AnomalyConfig,
    pub experiments: ExperimentsConfig,
    pub canary: CanaryConfig,
    pub shadow: ShadowConfig,
    pub learning: LearningConfig,
    /// USD spend limits
    pub budget: BudgetConfig,
    pub forecast: ForecastConfig,
    /// Endpoints supplying catalog, quota and telemetry inputs
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub collaborators: Vec<CollaboratorConfig>,
}

impl EngineConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply `AGENT_ROUTER_*` environment variable overrides.
    ///
    /// Invalid values are ignored and the current value is kept.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(level) = std::env::var("AGENT_ROUTER_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("AGENT_ROUTER_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }
        if let Ok(model) = std::env::var("AGENT_ROUTER_FREE_FALLBACK_MODEL") {
            if !model.trim().is_empty() {
                self.ranking.free_fallback_model = model;
            }
        }
        if let Ok(mode) = std::env::var("AGENT_ROUTER_BUDGET_ENFORCEMENT") {
            if let Ok(m) = mode.parse() {
                self.budget.enforcement = m;
            }
        }
        self
    }

    /// Validate every section, reporting the first offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logging
            .validate()
            .map_err(|m| ConfigError::invalid("logging", m))?;
        self.ranking
            .validate()
            .map_err(|m| ConfigError::invalid("ranking", m))?;
        self.anomaly
            .validate()
            .map_err(|m| ConfigError::invalid("anomaly", m))?;
        if self.experiments.window_size == 0 {
            return Err(ConfigError::invalid(
                "experiments.window_size",
                "must be >= 1",
            ));
        }
        self.canary
            .validate()
            .map_err(|m| ConfigError::invalid("canary", m))?;
        if self.shadow.window_size == 0 {
            return Err(ConfigError::invalid("shadow.window_size", "must be >= 1"));
        }
        self.learning
            .validate()
            .map_err(|m| ConfigError::invalid("learning", m))?;
        self.budget
            .validate()
            .map_err(|m| ConfigError::invalid("budget", m))?;
        self.forecast
            .validate()
            .map_err(|m| ConfigError::invalid("forecast", m))?;

        let mut names = HashSet::new();
        for (i, collaborator) in self.collaborators.iter().enumerate() {
            collaborator
                .validate()
                .map_err(|m| ConfigError::invalid(format!("collaborators[{}]", i), m))?;
            if !names.insert(collaborator.name.as_str()) {
                return Err(ConfigError::invalid(
                    format!("collaborators[{}].name", i),
                    format!("duplicate collaborator '{}'", collaborator.name),
                ));
            }
        }
        Ok(())
    }
}
