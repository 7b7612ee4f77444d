//! Telemetry samples and bounded rolling windows.
//!
//! Samples are supplied by the host after a model has been invoked. The
//! engine keeps them in fixed-capacity windows and never persists them.

pub mod anomaly;

pub use anomaly::{Anomaly, AnomalyDetector, AnomalyKind, CircuitBreakerState, Severity};

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Whether a sample came from production or shadow traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrafficKind {
    #[default]
    Live,
    Shadow,
}

impl TrafficKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficKind::Live => "live",
            TrafficKind::Shadow => "shadow",
        }
    }
}

/// Experiment and variant a sample was produced under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentTag {
    pub experiment_id: String,
    pub variant_id: String,
}

/// Aggregated telemetry for one (role, model) over a reporting interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Fraction of successful calls (0.0-1.0)
    pub success_rate: f64,
    pub avg_latency_ms: f64,
    pub p95_latency_ms: f64,
    /// Average USD cost per call
    pub avg_cost: f64,
    /// Fraction of calls that fell through to a fallback model (0.0-1.0)
    pub fallback_rate: f64,
    pub sample_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment: Option<ExperimentTag>,
    #[serde(default)]
    pub traffic: TrafficKind,
}

impl TelemetrySample {
    /// A live sample with the core reliability figures.
    pub fn new(success_rate: f64, avg_latency_ms: f64, avg_cost: f64, fallback_rate: f64) -> Self {
        Self {
            success_rate,
            avg_latency_ms,
            p95_latency_ms: avg_latency_ms,
            avg_cost,
            fallback_rate,
            sample_count: 1,
            quality_score: None,
            experiment: None,
            traffic: TrafficKind::Live,
        }
    }

    pub fn with_experiment(mut self, experiment_id: &str, variant_id: &str) -> Self {
        self.experiment = Some(ExperimentTag {
            experiment_id: experiment_id.to_string(),
            variant_id: variant_id.to_string(),
        });
        self
    }

    pub fn shadow(mut self) -> Self {
        self.traffic = TrafficKind::Shadow;
        self
    }
}

/// Simple averages over a set of samples.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricSummary {
    /// Number of samples averaged
    pub samples: u32,
    pub success_rate: f64,
    pub avg_latency_ms: f64,
    pub avg_cost: f64,
    pub fallback_rate: f64,
}

impl MetricSummary {
    /// Average the given samples. All figures are zero when there are none.
    pub fn from_samples<'a>(samples: impl IntoIterator<Item = &'a TelemetrySample>) -> Self {
        let mut summary = MetricSummary::default();
        for sample in samples {
            summary.samples += 1;
            summary.success_rate += sample.success_rate;
            summary.avg_latency_ms += sample.avg_latency_ms;
            summary.avg_cost += sample.avg_cost;
            summary.fallback_rate += sample.fallback_rate;
        }
        if summary.samples > 0 {
            let n = f64::from(summary.samples);
            summary.success_rate /= n;
            summary.avg_latency_ms /= n;
            summary.avg_cost /= n;
            summary.fallback_rate /= n;
        }
        summary
    }
}

/// Fixed-capacity FIFO window; pushing past capacity evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct SampleWindow<T> {
    cap: usize,
    buf: VecDeque<T>,
}

impl<T> SampleWindow<T> {
    /// Create an empty window with capacity `cap` (minimum 1).
    pub fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            buf: VecDeque::new(),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn push(&mut self, item: T) {
        self.buf.push_back(item);
        while self.buf.len() > self.cap {
            self.buf.pop_front();
        }
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.buf.iter()
    }

    pub fn latest(&self) -> Option<&T> {
        self.buf.back()
    }
}
