//! A/B experiments over role assignments.
//!
//! Subjects are bucketed deterministically into variants; each variant may
//! override the model assigned to some roles. Telemetry tagged with an
//! experiment and variant accumulates per variant and feeds canary trend
//! evaluation.

pub mod canary;
mod error;
pub mod shadow;

pub use canary::{TrendAction, TrendDecision};
pub use error::ExperimentError;
pub use shadow::ShadowEvaluationEngine;

use crate::catalog::AgentRole;
use crate::config::{CanaryConfig, ExperimentsConfig};
use crate::telemetry::{MetricSummary, SampleWindow, TelemetrySample};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// One arm of an experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    #[serde(default)]
    pub description: String,
    /// Share of subjects routed to this variant, in percent
    pub allocation: f64,
    /// Per-role model assignments that replace the scored choice
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<AgentRole, String>,
}

impl Variant {
    pub fn new(id: &str, allocation: f64) -> Self {
        Self {
            id: id.to_string(),
            description: String::new(),
            allocation,
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, role: AgentRole, model: &str) -> Self {
        self.overrides.insert(role, model.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: String,
    pub name: String,
    /// Declaration order defines bucket ranges
    pub variants: Vec<Variant>,
    pub started_at: DateTime<Utc>,
}

impl Experiment {
    pub fn new(id: &str, name: &str, variants: Vec<Variant>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            variants,
            started_at: Utc::now(),
        }
    }

    pub fn variant(&self, variant_id: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }
}

/// Per-variant aggregate returned by [`ExperimentManager::summarize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantSummary {
    pub variant_id: String,
    pub metrics: MetricSummary,
}

/// Bucket in `0..100` for a subject within an experiment.
///
/// 32-bit polynomial rolling hash over the UTF-16 code units of
/// `"{experiment_id}|{subject_id}"`, wrapped to `i32` at every step, then
/// `abs(h) % 100`.
pub fn bucket_for(experiment_id: &str, subject_id: &str) -> u32 {
    let key = format!("{}|{}", experiment_id, subject_id);
    let mut h: i32 = 0;
    for unit in key.encode_utf16() {
        h = h.wrapping_mul(31).wrapping_add(i32::from(unit));
    }
    // i64 so that abs(i32::MIN) does not overflow
    (i64::from(h).abs() % 100) as u32
}

/// Merge a variant's overrides onto a base role assignment.
pub fn apply_variant_overrides(
    base: &BTreeMap<AgentRole, String>,
    variant: &Variant,
) -> BTreeMap<AgentRole, String> {
    let mut merged = base.clone();
    for (role, model) in &variant.overrides {
        merged.insert(*role, model.clone());
    }
    merged
}

/// Registry of running experiments and their per-variant telemetry.
#[derive(Debug)]
pub struct ExperimentManager {
    window_size: usize,
    experiments: HashMap<String, Experiment>,
    metrics: HashMap<(String, String), SampleWindow<TelemetrySample>>,
}

impl ExperimentManager {
    pub fn new(config: &ExperimentsConfig) -> Self {
        Self {
            window_size: config.window_size,
            experiments: HashMap::new(),
            metrics: HashMap::new(),
        }
    }

    /// Register (or replace) an experiment.
    ///
    /// Allocations must be non-negative and sum to 100 after rounding. Replacing an experiment
    /// discards its recorded metrics.
    pub fn register(&mut self, experiment: Experiment) -> Result<(), ExperimentError> {
        if experiment.variants.is_empty() {
            return Err(ExperimentError::NoVariants(experiment.id));
        }
        let mut seen = HashSet::new();
        for variant in &experiment.variants {
            if !seen.insert(variant.id.as_str()) {
                return Err(ExperimentError::DuplicateVariant {
                    experiment: experiment.id.clone(),
                    variant: variant.id.clone(),
                });
            }
            if !variant.allocation.is_finite() || variant.allocation < 0.0 {
                return Err(ExperimentError::InvalidAllocation {
                    experiment: experiment.id.clone(),
                    variant: variant.id.clone(),
                    allocation: variant.allocation,
                });
            }
        }
        let total: f64 = experiment.variants.iter().map(|v| v.allocation).sum();
        if total.round() != 100.0 {
            return Err(ExperimentError::AllocationMismatch {
                experiment: experiment.id,
                total,
            });
        }

        tracing::info!(
            experiment = %experiment.id,
            variants = experiment.variants.len(),
            "Registered experiment"
        );
        let id = experiment.id.clone();
        self.metrics.retain(|(exp, _), _| exp != &id);
        self.experiments.insert(id, experiment);
        Ok(())
    }

    pub fn get(&self, experiment_id: &str) -> Option<&Experiment> {
        self.experiments.get(experiment_id)
    }

    fn require(&self, experiment_id: &str) -> Result<&Experiment, ExperimentError> {
        self.experiments
            .get(experiment_id)
            .ok_or_else(|| ExperimentError::UnknownExperiment(experiment_id.to_string()))
    }

    /// Deterministically assign a subject to a variant.
    pub fn pick_variant(&self, experiment_id: &str, subject_id: &str) -> Result<&Variant, ExperimentError> {
        let experiment = self.require(experiment_id)?;
        let bucket = f64::from(bucket_for(experiment_id, subject_id));

        let mut upper = 0.0;
        for variant in &experiment.variants {
            upper += variant.allocation;
            if bucket < upper {
                return Ok(variant);
            }
        }
        // Rounding gap at the top of the range
        experiment
            .variants
            .first()
            .ok_or_else(|| ExperimentError::NoVariants(experiment_id.to_string()))
    }

    /// Append a sample to the (experiment, variant) window.
    pub fn record_variant_metrics(
        &mut self,
        experiment_id: &str,
        variant_id: &str,
        sample: TelemetrySample,
    ) -> Result<(), ExperimentError> {
        let experiment = self.require(experiment_id)?;
        if experiment.variant(variant_id).is_none() {
            return Err(ExperimentError::UnknownVariant {
                experiment: experiment_id.to_string(),
                variant: variant_id.to_string(),
            });
        }
        let window_size = self.window_size;
        self.metrics
            .entry((experiment_id.to_string(), variant_id.to_string()))
            .or_insert_with(|| SampleWindow::new(window_size))
            .push(sample);
        Ok(())
    }

    /// Per-variant averages in declaration order; zeroed for variants
    /// without samples.
    pub fn summarize(&self, experiment_id: &str) -> Result<Vec<VariantSummary>, ExperimentError> {
        let experiment = self.require(experiment_id)?;
        Ok(experiment
            .variants
            .iter()
            .map(|variant| {
                let key = (experiment_id.to_string(), variant.id.clone());
                let metrics = self
                    .metrics
                    .get(&key)
                    .map(|window| MetricSummary::from_samples(window.iter()))
                    .unwrap_or_default();
                VariantSummary {
                    variant_id: variant.id.clone(),
                    metrics,
                }
            })
            .collect())
    }

    /// Canary verdict for every variant against `baseline_variant`.
    pub fn evaluate_trends(
        &self,
        experiment_id: &str,
        baseline_variant: &str,
        config: &CanaryConfig,
    ) -> Result<Vec<TrendDecision>, ExperimentError> {
        let summaries = self.summarize(experiment_id)?;
        let baseline = summaries
            .iter()
            .find(|s| s.variant_id == baseline_variant)
            .map(|s| s.metrics)
            .ok_or_else(|| ExperimentError::UnknownVariant {
                experiment: experiment_id.to_string(),
                variant: baseline_variant.to_string(),
            })?;

        Ok(canary::evaluate_against_baseline(
            summaries.iter().map(|s| (s.variant_id.as_str(), &s.metrics)),
            baseline_variant,
            &baseline,
            config,
        ))
    }
}

impl Default for ExperimentManager {
    fn default() -> Self {
        Self::new(&ExperimentsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(control: f64, treatment: f64) -> Experiment {
        Experiment::new(
            "exp-routing",
            "Routing A/B",
            vec![
                Variant::new("control", control),
                Variant::new("treatment", treatment)
                    .with_override(AgentRole::Fixer, "zai/glm-4.6"),
            ],
        )
    }

    fn manager_with(experiment: Experiment) -> ExperimentManager {
        let mut manager = ExperimentManager::default();
        manager.register(experiment).unwrap();
        manager
    }

    #[test]
    fn register_rejects_allocations_not_summing_to_100() {
        let mut manager = ExperimentManager::default();
        let err = manager.register(split(40.0, 40.0)).unwrap_err();
        assert_eq!(
            err,
            ExperimentError::AllocationMismatch {
                experiment: "exp-routing".into(),
                total: 80.0
            }
        );
        assert!(manager.get("exp-routing").is_none());
    }

    #[test]
    fn register_rejects_negative_allocation_even_when_total_is_100() {
        let mut manager = ExperimentManager::default();
        let err = manager.register(split(150.0, -50.0)).unwrap_err();
        assert_eq!(
            err,
            ExperimentError::InvalidAllocation {
                experiment: "exp-routing".into(),
                variant: "treatment".into(),
                allocation: -50.0
            }
        );
        assert!(manager.get("exp-routing").is_none());
    }

    #[test]
    fn register_rejects_non_finite_allocation() {
        let mut manager = ExperimentManager::default();
        assert!(matches!(
            manager.register(split(f64::NAN, 100.0)),
            Err(ExperimentError::InvalidAllocation { .. })
        ));
        assert!(matches!(
            manager.register(split(f64::INFINITY, 0.0)),
            Err(ExperimentError::InvalidAllocation { .. })
        ));
    }

    #[test]
    fn register_accepts_rounded_total() {
        let mut manager = ExperimentManager::default();
        let experiment = Experiment::new(
            "thirds",
            "Thirds",
            vec![
                Variant::new("a", 33.33),
                Variant::new("b", 33.33),
                Variant::new("c", 33.33),
            ],
        );
        assert!(manager.register(experiment).is_ok());
    }

    #[test]
    fn register_rejects_empty_and_duplicate_variants() {
        let mut manager = ExperimentManager::default();
        assert!(matches!(
            manager.register(Experiment::new("empty", "Empty", vec![])),
            Err(ExperimentError::NoVariants(_))
        ));
        let dup = Experiment::new(
            "dup",
            "Dup",
            vec![Variant::new("a", 50.0), Variant::new("a", 50.0)],
        );
        assert!(matches!(
            manager.register(dup),
            Err(ExperimentError::DuplicateVariant { .. })
        ));
    }

    #[test]
    fn bucket_matches_reference_values() {
        // "a|b": (97 * 31 + 124) * 31 + 98 = 97159
        assert_eq!(bucket_for("a", "b"), 59);
        // Empty ids still hash the separator
        assert_eq!(bucket_for("", ""), 24);
    }

    #[test]
    fn bucket_wraps_to_signed_32_bit() {
        let long_subject = "subject-".repeat(64);
        let bucket = bucket_for("exp-routing", &long_subject);
        assert!(bucket < 100);
    }

    #[test]
    fn pick_variant_is_idempotent() {
        let manager = manager_with(split(50.0, 50.0));
        for subject in ["alice", "bob", "session-42", "ünïcödé"] {
            let first = manager.pick_variant("exp-routing", subject).unwrap().id.clone();
            let second = manager.pick_variant("exp-routing", subject).unwrap().id.clone();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn pick_variant_follows_allocation_ranges() {
        let manager = manager_with(split(100.0, 0.0));
        for subject in ["alice", "bob", "carol"] {
            assert_eq!(manager.pick_variant("exp-routing", subject).unwrap().id, "control");
        }

        let manager = manager_with(split(0.0, 100.0));
        for subject in ["alice", "bob", "carol"] {
            assert_eq!(manager.pick_variant("exp-routing", subject).unwrap().id, "treatment");
        }
    }

    #[test]
    fn pick_variant_covers_top_bucket_with_fractional_allocations() {
        let experiment = Experiment::new(
            "thirds",
            "Thirds",
            vec![
                Variant::new("a", 33.33),
                Variant::new("b", 33.33),
                Variant::new("c", 33.34),
            ],
        );
        let manager = manager_with(experiment);
        let subject = (0..10_000)
            .map(|i| format!("s{}", i))
            .find(|s| bucket_for("thirds", s) == 99)
            .unwrap();
        assert_eq!(manager.pick_variant("thirds", &subject).unwrap().id, "c");
    }

    #[test]
    fn pick_variant_unknown_experiment_fails() {
        let manager = ExperimentManager::default();
        assert_eq!(
            manager.pick_variant("missing", "alice").unwrap_err(),
            ExperimentError::UnknownExperiment("missing".into())
        );
    }

    #[test]
    fn overrides_merge_onto_base() {
        let base = BTreeMap::from([
            (AgentRole::Fixer, "openai/gpt-5-mini".to_string()),
            (AgentRole::Oracle, "openai/gpt-5".to_string()),
        ]);
        let variant = Variant::new("treatment", 50.0).with_override(AgentRole::Fixer, "zai/glm-4.6");
        let merged = apply_variant_overrides(&base, &variant);
        assert_eq!(merged[&AgentRole::Fixer], "zai/glm-4.6");
        assert_eq!(merged[&AgentRole::Oracle], "openai/gpt-5");
    }

    #[test]
    fn summarize_zeroes_variants_without_samples() {
        let mut manager = manager_with(split(50.0, 50.0));
        manager
            .record_variant_metrics("exp-routing", "treatment", TelemetrySample::new(0.9, 800.0, 0.01, 0.1))
            .unwrap();
        manager
            .record_variant_metrics("exp-routing", "treatment", TelemetrySample::new(0.7, 1200.0, 0.03, 0.3))
            .unwrap();

        let summaries = manager.summarize("exp-routing").unwrap();
        assert_eq!(summaries[0].variant_id, "control");
        assert_eq!(summaries[0].metrics, MetricSummary::default());
        assert_eq!(summaries[1].metrics.samples, 2);
        assert!((summaries[1].metrics.success_rate - 0.8).abs() < 1e-9);
        assert!((summaries[1].metrics.avg_latency_ms - 1000.0).abs() < 1e-9);
        assert!((summaries[1].metrics.fallback_rate - 0.2).abs() < 1e-9);
    }

    #[test]
    fn variant_window_is_bounded() {
        let mut manager = ExperimentManager::new(&ExperimentsConfig { window_size: 3 });
        manager.register(split(50.0, 50.0)).unwrap();
        for _ in 0..10 {
            manager
                .record_variant_metrics("exp-routing", "control", TelemetrySample::new(1.0, 100.0, 0.0, 0.0))
                .unwrap();
        }
        assert_eq!(manager.summarize("exp-routing").unwrap()[0].metrics.samples, 3);
    }

    #[test]
    fn record_rejects_unknown_variant() {
        let mut manager = manager_with(split(50.0, 50.0));
        let err = manager
            .record_variant_metrics("exp-routing", "ghost", TelemetrySample::new(1.0, 1.0, 0.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, ExperimentError::UnknownVariant { .. }));
    }

    #[test]
    fn evaluate_trends_rolls_back_regressed_variant() {
        let mut manager = manager_with(split(50.0, 50.0));
        for _ in 0..25 {
            manager
                .record_variant_metrics("exp-routing", "control", TelemetrySample::new(0.97, 900.0, 0.01, 0.02))
                .unwrap();
            manager
                .record_variant_metrics("exp-routing", "treatment", TelemetrySample::new(0.75, 2100.0, 0.02, 0.3))
                .unwrap();
        }
        let decisions = manager
            .evaluate_trends("exp-routing", "control", &CanaryConfig::default())
            .unwrap();
        assert_eq!(decisions.len(), 2);
        assert_eq!(decisions[0].action, TrendAction::Hold);
        assert_eq!(decisions[1].subject, "treatment");
        assert_eq!(decisions[1].action, TrendAction::Rollback);
    }

    #[test]
    fn evaluate_trends_unknown_baseline_fails() {
        let manager = manager_with(split(50.0, 50.0));
        assert!(matches!(
            manager.evaluate_trends("exp-routing", "nope", &CanaryConfig::default()),
            Err(ExperimentError::UnknownVariant { .. })
        ));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn bucket_is_stable_and_in_range(exp in ".{0,24}", subject in ".{0,48}") {
                let bucket = bucket_for(&exp, &subject);
                prop_assert!(bucket < 100);
                prop_assert_eq!(bucket, bucket_for(&exp, &subject));
            }
        }
    }
}
