//! Merge reward updates computed by independent learners.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One participant's contribution.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FederatedUpdate {
    /// Reward estimate per model id
    #[serde(default)]
    pub model_rewards: HashMap<String, f64>,
    /// Adjustment per scoring feature
    #[serde(default)]
    pub feature_adjustments: HashMap<String, f64>,
    pub sample_count: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FederatedAggregate {
    pub participants: usize,
    pub model_rewards: BTreeMap<String, f64>,
    pub feature_adjustments: BTreeMap<String, f64>,
}

/// Sample-weighted average per key, over only the updates that carry the key.
///
/// If every update carrying a key reports zero samples, the key gets the
/// plain mean of their values.
pub fn aggregate(updates: &[FederatedUpdate]) -> FederatedAggregate {
    let aggregate = FederatedAggregate {
        participants: updates.len(),
        model_rewards: weighted_average(updates.iter().map(|u| (&u.model_rewards, u.sample_count))),
        feature_adjustments: weighted_average(
            updates
                .iter()
                .map(|u| (&u.feature_adjustments, u.sample_count)),
        ),
    };
    tracing::debug!(
        participants = aggregate.participants,
        models = aggregate.model_rewards.len(),
        features = aggregate.feature_adjustments.len(),
        "Aggregated federated updates"
    );
    aggregate
}

#[derive(Default)]
struct Accumulator {
    weighted_sum: f64,
    weight: f64,
    plain_sum: f64,
    count: usize,
}

fn weighted_average<'a>(
    entries: impl Iterator<Item = (&'a HashMap<String, f64>, u64)>,
) -> BTreeMap<String, f64> {
    let mut acc: BTreeMap<String, Accumulator> = BTreeMap::new();
    for (values, samples) in entries {
        let weight = samples as f64;
        for (key, value) in values {
            let slot = acc.entry(key.clone()).or_default();
            slot.weighted_sum += value * weight;
            slot.weight += weight;
            slot.plain_sum += value;
            slot.count += 1;
        }
    }

    acc.into_iter()
        .map(|(key, slot)| {
            let value = if slot.weight > 0.0 {
                slot.weighted_sum / slot.weight
            } else {
                slot.plain_sum / slot.count as f64
            };
            (key, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(rewards: &[(&str, f64)], features: &[(&str, f64)], samples: u64) -> FederatedUpdate {
        FederatedUpdate {
            model_rewards: rewards.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            feature_adjustments: features.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            sample_count: samples,
        }
    }

    #[test]
    fn weights_by_sample_count() {
        let result = aggregate(&[
            update(&[("openai/gpt-5", 0.8)], &[], 100),
            update(&[("openai/gpt-5", 0.6)], &[], 50),
        ]);
        assert_eq!(result.participants, 2);
        assert!((result.model_rewards["openai/gpt-5"] - 0.7333).abs() < 1e-3);
    }

    #[test]
    fn keys_average_only_over_updates_that_mention_them() {
        let result = aggregate(&[
            update(&[("a/m", 1.0)], &[("cost", 0.1)], 10),
            update(&[("b/m", 0.4)], &[], 90),
        ]);
        assert_eq!(result.model_rewards["a/m"], 1.0);
        assert_eq!(result.model_rewards["b/m"], 0.4);
        assert_eq!(result.feature_adjustments["cost"], 0.1);
        assert_eq!(result.feature_adjustments.len(), 1);
    }

    #[test]
    fn zero_samples_fall_back_to_plain_mean() {
        let result = aggregate(&[
            update(&[("a/m", 1.0)], &[], 0),
            update(&[("a/m", 0.5)], &[], 0),
        ]);
        assert_eq!(result.model_rewards["a/m"], 0.75);
    }

    #[test]
    fn empty_input() {
        let result = aggregate(&[]);
        assert_eq!(result, FederatedAggregate::default());
    }
}
