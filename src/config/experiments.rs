//! Experiment, canary and shadow evaluation configuration

use serde::{Deserialize, Serialize};

/// Experiment metric retention
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentsConfig {
    /// Samples retained per (experiment, variant).
    ///
    /// Default: 2000
    pub window_size: usize,
}

impl Default for ExperimentsConfig {
    fn default() -> Self {
        Self { window_size: 2000 }
    }
}

/// Weights applied to metric deltas when computing a canary composite.
///
/// Success contributes positively; latency, cost and fallback deltas are
/// subtracted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendWeights {
    pub success: f64,
    pub latency: f64,
    pub cost: f64,
    pub fallback: f64,
}

impl Default for TrendWeights {
    fn default() -> Self {
        Self {
            success: 1.0,
            latency: 0.35,
            cost: 0.25,
            fallback: 0.6,
        }
    }
}

/// Canary trend thresholds.
///
/// # Example
///
/// ```toml
/// [canary]
/// min_samples = 20
/// promote_margin = 0.05
/// rollback_margin = 0.05
///
/// [canary.weights]
/// latency = 0.5
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanaryConfig {
    /// Samples a candidate needs before it can leave "hold".
    ///
    /// Default: 20
    pub min_samples: u32,

    /// Composite above this promotes.
    pub promote_margin: f64,

    /// Composite below the negated value rolls back.
    pub rollback_margin: f64,

    pub weights: TrendWeights,
}

impl Default for CanaryConfig {
    fn default() -> Self {
        Self {
            min_samples: 20,
            promote_margin: 0.05,
            rollback_margin: 0.05,
            weights: TrendWeights::default(),
        }
    }
}

impl CanaryConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.promote_margin < 0.0 || self.rollback_margin < 0.0 {
            return Err("margins must be >= 0.0".to_string());
        }
        let w = &self.weights;
        if [w.success, w.latency, w.cost, w.fallback].iter().any(|v| *v < 0.0) {
            return Err("weights must be >= 0.0".to_string());
        }
        Ok(())
    }
}

/// Shadow traffic evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Shadow samples required before a candidate is judged.
    ///
    /// Default: 30
    pub min_samples: u32,

    /// Samples retained per (role, model).
    ///
    /// Default: 500
    pub window_size: usize,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            min_samples: 30,
            window_size: 500,
        }
    }
}
