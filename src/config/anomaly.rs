//! Anomaly detection and circuit breaker configuration

use crate::telemetry::Severity;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Longest accepted breaker TTL (one year).
pub const MAX_CIRCUIT_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Thresholds for telemetry anomaly detection.
///
/// # Example
///
/// ```toml
/// [anomaly]
/// window_size = 40
/// min_samples = 8
/// latency_spike_ratio = 1.8
/// circuit_ttl_seconds = 900
/// auto_open_severity = "critical"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Samples retained per (role, model).
    ///
    /// Default: 40
    pub window_size: usize,

    /// Samples required before detection runs.
    ///
    /// Default: 8
    pub min_samples: usize,

    /// Newest latency above this multiple of the baseline is a spike.
    pub latency_spike_ratio: f64,

    /// Newest cost above this multiple of the baseline is a spike.
    pub cost_spike_ratio: f64,

    /// Newest fallback rate above this multiple of the baseline is a spike,
    /// subject to `fallback_floor`.
    pub fallback_spike_ratio: f64,

    /// Fallback rates at or below this never count as a spike.
    pub fallback_floor: f64,

    /// Success rates at or above this never count as a drop.
    pub success_ceiling: f64,

    /// Drop below the baseline success rate that counts as a regression.
    pub success_drop: f64,

    /// How long a breaker stays open after an automatic trip.
    ///
    /// Default: 900 seconds
    pub circuit_ttl_seconds: u64,

    /// Lowest severity that opens a breaker on ingestion. `None` disables
    /// automatic opening.
    pub auto_open_severity: Option<Severity>,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            window_size: 40,
            min_samples: 8,
            latency_spike_ratio: 1.8,
            cost_spike_ratio: 1.7,
            fallback_spike_ratio: 1.8,
            fallback_floor: 0.25,
            success_ceiling: 0.85,
            success_drop: 0.10,
            circuit_ttl_seconds: 900,
            auto_open_severity: Some(Severity::Critical),
        }
    }
}

impl AnomalyConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.window_size < 2 {
            return Err("window_size must be >= 2".to_string());
        }
        if self.min_samples > self.window_size {
            return Err("min_samples must not exceed window_size".to_string());
        }
        for (name, ratio) in [
            ("latency_spike_ratio", self.latency_spike_ratio),
            ("cost_spike_ratio", self.cost_spike_ratio),
            ("fallback_spike_ratio", self.fallback_spike_ratio),
        ] {
            if ratio <= 1.0 {
                return Err(format!("{} must be > 1.0", name));
            }
        }
        if self.circuit_ttl_seconds > MAX_CIRCUIT_TTL_SECONDS {
            return Err(format!(
                "circuit_ttl_seconds must be <= {}",
                MAX_CIRCUIT_TTL_SECONDS
            ));
        }
        Ok(())
    }

    /// Breaker TTL as a duration, saturating for values that bypassed
    /// validation.
    pub fn circuit_ttl(&self) -> Duration {
        i64::try_from(self.circuit_ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }
}
