//! Q-learning configuration

use serde::{Deserialize, Serialize};

/// Tabular Q-learning parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Learning rate (alpha)
    pub alpha: f64,
    /// Discount factor (gamma)
    pub gamma: f64,
    /// Value assumed for unseen (state, action) pairs
    pub initial_value: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            gamma: 0.9,
            initial_value: 0.0,
        }
    }
}

impl LearningConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err("alpha must be in (0.0, 1.0]".to_string());
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err("gamma must be between 0.0 and 1.0".to_string());
        }
        Ok(())
    }
}
