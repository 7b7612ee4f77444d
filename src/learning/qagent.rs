//! Tabular Q-learning over routing decisions.
//!
//! A state is the role being served, how healthy the quota is and a coarse
//! task bucket. An action is the model chosen together with how it is paid
//! for. Unseen (state, action) pairs read as the configured initial value.

use crate::catalog::{AgentRole, Model};
use crate::config::LearningConfig;
use crate::routing::policy::{PacingPolicy, QuotaStatus, RoutingPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Quota pressure bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaHealth {
    Healthy,
    Constrained,
    Critical,
}

impl QuotaHealth {
    /// Bucket by monthly pressure; an exhausted daily cap is always critical.
    pub fn classify(quota: &QuotaStatus, policy: &RoutingPolicy) -> Self {
        let daily_capped = policy.budget.and_then(|b| b.daily_requests).is_some();
        if daily_capped && quota.daily_remaining == 0 {
            return QuotaHealth::Critical;
        }
        let pressure = quota.pressure(policy);
        if pressure >= 0.85 {
            QuotaHealth::Critical
        } else if pressure >= 0.5 {
            QuotaHealth::Constrained
        } else {
            QuotaHealth::Healthy
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// Short lookups and edits
    Quick,
    #[default]
    Standard,
    /// Long multi-step work
    Complex,
}

impl TaskType {
    /// Bucket a task by its expected prompt size.
    pub fn from_prompt_tokens(tokens: u64) -> Self {
        match tokens {
            0..=2_000 => TaskType::Quick,
            2_001..=32_000 => TaskType::Standard,
            _ => TaskType::Complex,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BillingMode {
    PayPerUse,
    Subscription,
    Free,
}

impl BillingMode {
    /// Free-tier models are `Free`; models of the paced provider are
    /// covered by its subscription; everything else is pay-per-use.
    pub fn for_model(model: &Model, pacing: Option<&PacingPolicy>) -> Self {
        if model.is_free() {
            BillingMode::Free
        } else if pacing.is_some_and(|p| p.provider == model.provider()) {
            BillingMode::Subscription
        } else {
            BillingMode::PayPerUse
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QState {
    pub role: AgentRole,
    pub quota: QuotaHealth,
    pub task: TaskType,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QAction {
    pub model: String,
    pub billing: BillingMode,
}

impl QAction {
    pub fn new(model: &str, billing: BillingMode) -> Self {
        Self {
            model: model.to_string(),
            billing,
        }
    }
}

/// Observed outcome of one decision.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Reward {
    pub success: f64,
    #[serde(default)]
    pub quality_bonus: f64,
    #[serde(default)]
    pub latency_penalty: f64,
    #[serde(default)]
    pub cost_penalty: f64,
}

impl Reward {
    pub fn total(&self) -> f64 {
        self.success + self.quality_bonus - self.latency_penalty - self.cost_penalty
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QUpdate {
    pub state: QState,
    pub action: QAction,
    pub reward: Reward,
    pub next_state: QState,
    /// Actions available from `next_state`; empty means terminal
    #[serde(default)]
    pub available_next_actions: Vec<QAction>,
}

/// One table entry, as exposed by [`RoutingQAgent::snapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QEntry {
    pub state: QState,
    pub action: QAction,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub struct RoutingQAgent {
    config: LearningConfig,
    table: HashMap<(QState, QAction), f64>,
}

impl RoutingQAgent {
    pub fn new(config: LearningConfig) -> Self {
        Self {
            config,
            table: HashMap::new(),
        }
    }

    pub fn value(&self, state: &QState, action: &QAction) -> f64 {
        self.table
            .get(&(*state, action.clone()))
            .copied()
            .unwrap_or(self.config.initial_value)
    }

    /// Apply one Q-learning step and return the updated value.
    ///
    /// `Q(s,a) += alpha * (r + gamma * max_a' Q(s',a') - Q(s,a))`, where the
    /// max is zero when no next actions are available.
    pub fn update(&mut self, update: &QUpdate) -> f64 {
        let current = self.value(&update.state, &update.action);
        let next_best = update
            .available_next_actions
            .iter()
            .map(|a| self.value(&update.next_state, a))
            .fold(None, |best: Option<f64>, v| Some(best.map_or(v, |b| b.max(v))))
            .unwrap_or(0.0);

        let reward = update.reward.total();
        let target = reward + self.config.gamma * next_best;
        let value = current + self.config.alpha * (target - current);

        tracing::trace!(
            role = %update.state.role,
            model = %update.action.model,
            reward,
            value,
            "Q-value updated"
        );

        self.table
            .insert((update.state, update.action.clone()), value);
        value
    }

    /// Every stored entry, ordered by state then action.
    pub fn snapshot(&self) -> Vec<QEntry> {
        let mut entries: Vec<QEntry> = self
            .table
            .iter()
            .map(|((state, action), value)| QEntry {
                state: *state,
                action: action.clone(),
                value: *value,
            })
            .collect();
        entries.sort_by(|a, b| (a.state, &a.action).cmp(&(b.state, &b.action)));
        entries
    }

    /// Highest-valued stored action for `state`; ties go to the smaller action.
    pub fn best_action(&self, state: &QState) -> Option<QEntry> {
        self.snapshot()
            .into_iter()
            .filter(|e| e.state == *state)
            .fold(None, |best: Option<QEntry>, entry| match best {
                Some(b) if b.value >= entry.value => Some(b),
                _ => Some(entry),
            })
    }

    /// Per-model bias for scoring: the best value across billing modes.
    pub fn bias_for(&self, state: &QState) -> HashMap<String, f64> {
        let mut bias: HashMap<String, f64> = HashMap::new();
        for ((s, action), value) in &self.table {
            if s != state {
                continue;
            }
            bias.entry(action.model.clone())
                .and_modify(|v| *v = v.max(*value))
                .or_insert(*value);
        }
        bias
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for RoutingQAgent {
    fn default() -> Self {
        Self::new(LearningConfig::default())
    }
}
