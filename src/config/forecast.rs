//! Quota forecast configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Days projected forward
    pub horizon_days: u32,
    /// Days of history averaged into the daily rate
    pub lookback_days: u32,
    /// Exhaustion within this many days is flagged as imminent
    pub imminent_days: u32,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_days: 7,
            lookback_days: 7,
            imminent_days: 3,
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.lookback_days == 0 {
            return Err("lookback_days must be >= 1".to_string());
        }
        Ok(())
    }
}
