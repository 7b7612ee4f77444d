//! Running USD spend against configured daily and monthly limits.

use crate::catalog::Model;
use crate::config::{BudgetConfig, EnforcementMode};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Token counts of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }
}

/// Whether a model may still be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostVerdict {
    Allow,
    /// A limit is exceeded but enforcement is `warn`
    Warn,
    /// A limit is exceeded and enforcement is `block`; paid models only
    Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendSnapshot {
    pub day: NaiveDate,
    pub daily_usd: f64,
    pub monthly_usd: f64,
    pub daily_limit_usd: Option<f64>,
    pub monthly_limit_usd: Option<f64>,
    pub enforcement: EnforcementMode,
    /// Monthly spend per model id
    pub by_model: HashMap<String, f64>,
}

impl SpendSnapshot {
    pub fn daily_exceeded(&self) -> bool {
        self.daily_limit_usd.is_some_and(|limit| self.daily_usd > limit)
    }

    pub fn monthly_exceeded(&self) -> bool {
        self.monthly_limit_usd
            .is_some_and(|limit| self.monthly_usd > limit)
    }
}

#[derive(Debug, Clone)]
pub struct CostTracker {
    config: BudgetConfig,
    day: NaiveDate,
    daily_usd: f64,
    monthly_usd: f64,
    by_model: HashMap<String, f64>,
}

impl CostTracker {
    pub fn new(config: BudgetConfig) -> Self {
        Self::starting(config, Utc::now().date_naive())
    }

    fn starting(config: BudgetConfig, day: NaiveDate) -> Self {
        Self {
            config,
            day,
            daily_usd: 0.0,
            monthly_usd: 0.0,
            by_model: HashMap::new(),
        }
    }

    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    /// Reset counters whose period ended before `today`.
    fn roll_over(&mut self, today: NaiveDate) {
        if today == self.day {
            return;
        }
        if (today.year(), today.month()) != (self.day.year(), self.day.month()) {
            tracing::debug!(previous = %self.day, monthly_usd = self.monthly_usd, "Monthly spend reset");
            self.monthly_usd = 0.0;
            self.by_model.clear();
        }
        self.daily_usd = 0.0;
        self.day = today;
    }

    /// Add the cost of `usage` on `model`, returning the USD amount.
    pub fn record(&mut self, model: &Model, usage: TokenUsage) -> f64 {
        self.record_at(model, usage, Utc::now())
    }

    pub fn record_at(&mut self, model: &Model, usage: TokenUsage, now: DateTime<Utc>) -> f64 {
        self.roll_over(now.date_naive());
        let cost = model
            .cost
            .map(|c| c.calculate(usage.input_tokens, usage.output_tokens))
            .unwrap_or(0.0);
        if cost <= 0.0 {
            return 0.0;
        }

        self.daily_usd += cost;
        self.monthly_usd += cost;
        *self.by_model.entry(model.id.clone()).or_default() += cost;

        crate::metrics::record_spend("daily", self.daily_usd);
        crate::metrics::record_spend("monthly", self.monthly_usd);
        tracing::trace!(model = %model.id, cost, daily_usd = self.daily_usd, "Spend recorded");
        cost
    }

    pub fn snapshot(&mut self) -> SpendSnapshot {
        self.snapshot_at(Utc::now())
    }

    pub fn snapshot_at(&mut self, now: DateTime<Utc>) -> SpendSnapshot {
        self.roll_over(now.date_naive());
        SpendSnapshot {
            day: self.day,
            daily_usd: self.daily_usd,
            monthly_usd: self.monthly_usd,
            daily_limit_usd: self.config.daily_limit_usd,
            monthly_limit_usd: self.config.monthly_limit_usd,
            enforcement: self.config.enforcement,
            by_model: self.by_model.clone(),
        }
    }

    /// Verdict for routing another request to `model`.
    ///
    /// Free models are always allowed.
    pub fn check(&mut self, model: &Model) -> CostVerdict {
        self.check_at(model, Utc::now())
    }

    pub fn check_at(&mut self, model: &Model, now: DateTime<Utc>) -> CostVerdict {
        self.roll_over(now.date_naive());
        if model.is_free() {
            return CostVerdict::Allow;
        }
        let daily = self.config.daily_limit_usd.is_some_and(|l| self.daily_usd > l);
        let monthly = self
            .config
            .monthly_limit_usd
            .is_some_and(|l| self.monthly_usd > l);
        if !(daily || monthly) {
            return CostVerdict::Allow;
        }

        let verdict = match self.config.enforcement {
            EnforcementMode::Warn => CostVerdict::Warn,
            EnforcementMode::Block => CostVerdict::Block,
        };
        tracing::warn!(
            model = %model.id,
            daily_usd = self.daily_usd,
            monthly_usd = self.monthly_usd,
            verdict = ?verdict,
            "Spend limit exceeded"
        );
        verdict
    }
}

impl Default for CostTracker {
    fn default() -> Self {
        Self::new(BudgetConfig::default())
    }
}
