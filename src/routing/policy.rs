//! Policy, quota and pacing inputs supplied by the host.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Overall routing preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingMode {
    /// Favor cheap models, accept weaker capability fit
    CostFirst,
    /// Favor capability fit, accept higher cost
    QualityFirst,
    /// Balance capability and cost per role
    #[default]
    Hybrid,
}

impl RoutingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingMode::CostFirst => "cost-first",
            RoutingMode::QualityFirst => "quality-first",
            RoutingMode::Hybrid => "hybrid",
        }
    }

    /// Shift applied to a role's capability emphasis.
    pub(crate) fn capability_bias(&self) -> f64 {
        match self {
            RoutingMode::CostFirst => -0.25,
            RoutingMode::QualityFirst => 0.2,
            RoutingMode::Hybrid => 0.0,
        }
    }
}

impl FromStr for RoutingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "cost-first" => Ok(RoutingMode::CostFirst),
            "quality-first" => Ok(RoutingMode::QualityFirst),
            "hybrid" => Ok(RoutingMode::Hybrid),
            _ => Err(format!("Unknown routing mode: {}", s)),
        }
    }
}

impl std::fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How strictly a subscription budget is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Enforcement {
    /// Penalize but keep routing
    #[default]
    Soft,
    /// Stop routing paid models once exhausted
    Hard,
}

/// Request caps of a subscription plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SubscriptionBudget {
    pub daily_requests: Option<u32>,
    pub monthly_requests: Option<u32>,
    pub enforcement: Enforcement,
}

/// Routing policy chosen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RoutingPolicy {
    pub mode: RoutingMode,
    pub budget: Option<SubscriptionBudget>,
}

impl RoutingPolicy {
    pub fn new(mode: RoutingMode) -> Self {
        Self { mode, budget: None }
    }

    pub fn with_budget(mut self, budget: SubscriptionBudget) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn monthly_budget(&self) -> Option<u32> {
        self.budget.and_then(|b| b.monthly_requests)
    }

    pub fn is_hard(&self) -> bool {
        self.budget
            .map(|b| b.enforcement == Enforcement::Hard)
            .unwrap_or(false)
    }
}

/// Remaining request quota, as last reported by the quota collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub daily_remaining: u32,
    pub monthly_remaining: u32,
    pub last_checked: DateTime<Utc>,
}

impl QuotaStatus {
    pub fn new(daily_remaining: u32, monthly_remaining: u32) -> Self {
        Self {
            daily_remaining,
            monthly_remaining,
            last_checked: Utc::now(),
        }
    }

    /// Fraction of the monthly budget already consumed (0.0-1.0).
    ///
    /// Zero when the policy has no monthly budget.
    pub fn pressure(&self, policy: &RoutingPolicy) -> f64 {
        match policy.monthly_budget() {
            Some(budget) if budget > 0 => {
                let ratio = (self.monthly_remaining as f64 / budget as f64).clamp(0.0, 1.0);
                1.0 - ratio
            }
            _ => 0.0,
        }
    }
}

/// Provider pacing preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PacingMode {
    /// Stretch the monthly budget
    Economy,
    #[default]
    Balanced,
    /// Spend for the best model
    QualityFirst,
}

impl PacingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PacingMode::Economy => "economy",
            PacingMode::Balanced => "balanced",
            PacingMode::QualityFirst => "quality-first",
        }
    }
}

impl std::fmt::Display for PacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_pacing_provider() -> String {
    "chutes".to_string()
}

/// Provider-specific pacing policy; only affects models of `provider`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacingPolicy {
    #[serde(default = "default_pacing_provider")]
    pub provider: String,
    pub mode: PacingMode,
    #[serde(default)]
    pub monthly_budget: f64,
    #[serde(default)]
    pub monthly_used: f64,
}

impl PacingPolicy {
    pub fn new(mode: PacingMode) -> Self {
        Self {
            provider: default_pacing_provider(),
            mode,
            monthly_budget: 0.0,
            monthly_used: 0.0,
        }
    }

    /// Fraction of the pacing budget already used (0.0-1.0).
    pub fn burn_ratio(&self) -> f64 {
        if self.monthly_budget > 0.0 {
            (self.monthly_used / self.monthly_budget).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// One entry of historical usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub timestamp: DateTime<Utc>,
    /// Full model identifier
    pub model: String,
    pub requests: u32,
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

impl UsageRecord {
    pub fn provider(&self) -> &str {
        self.model.split('/').next().unwrap_or(&self.model)
    }
}

/// Sum requests per provider across the usage history.
pub fn provider_usage(history: &[UsageRecord]) -> HashMap<String, u32> {
    let mut usage: HashMap<String, u32> = HashMap::new();
    for record in history {
        *usage.entry(record.provider().to_string()).or_default() += record.requests;
    }
    usage
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_mode_default_is_hybrid() {
        assert_eq!(RoutingMode::default(), RoutingMode::Hybrid);
    }

    #[test]
    fn routing_mode_from_str() {
        assert_eq!(
            "cost-first".parse::<RoutingMode>().unwrap(),
            RoutingMode::CostFirst
        );
        assert_eq!(
            "QUALITY_FIRST".parse::<RoutingMode>().unwrap(),
            RoutingMode::QualityFirst
        );
        assert!("cheapest".parse::<RoutingMode>().is_err());
    }

    #[test]
    fn pressure_without_budget_is_zero() {
        let policy = RoutingPolicy::new(RoutingMode::Hybrid);
        let quota = QuotaStatus::new(10, 10);
        assert_eq!(quota.pressure(&policy), 0.0);
    }

    #[test]
    fn pressure_grows_as_remaining_shrinks() {
        let policy = RoutingPolicy::new(RoutingMode::Hybrid).with_budget(SubscriptionBudget {
            monthly_requests: Some(1000),
            ..Default::default()
        });
        let full = QuotaStatus::new(100, 1000).pressure(&policy);
        let half = QuotaStatus::new(100, 500).pressure(&policy);
        let empty = QuotaStatus::new(100, 0).pressure(&policy);
        assert_eq!(full, 0.0);
        assert!((half - 0.5).abs() < 1e-9);
        assert_eq!(empty, 1.0);
    }

    #[test]
    fn pressure_clamps_when_remaining_exceeds_budget() {
        let policy = RoutingPolicy::new(RoutingMode::Hybrid).with_budget(SubscriptionBudget {
            monthly_requests: Some(100),
            ..Default::default()
        });
        assert_eq!(QuotaStatus::new(0, 5000).pressure(&policy), 0.0);
    }

    #[test]
    fn pacing_policy_defaults_to_chutes() {
        let pacing: PacingPolicy = serde_json::from_str(r#"{"mode": "economy"}"#).unwrap();
        assert_eq!(pacing.provider, "chutes");
        assert_eq!(pacing.mode, PacingMode::Economy);
        assert_eq!(pacing.burn_ratio(), 0.0);
    }

    #[test]
    fn pacing_burn_ratio_is_clamped() {
        let mut pacing = PacingPolicy::new(PacingMode::Balanced);
        pacing.monthly_budget = 100.0;
        pacing.monthly_used = 250.0;
        assert_eq!(pacing.burn_ratio(), 1.0);
    }

    #[test]
    fn provider_usage_sums_requests() {
        let now = Utc::now();
        let history = vec![
            UsageRecord {
                timestamp: now,
                model: "openai/gpt-5".into(),
                requests: 3,
                input_tokens: 0,
                output_tokens: 0,
            },
            UsageRecord {
                timestamp: now,
                model: "openai/gpt-5-mini".into(),
                requests: 2,
                input_tokens: 0,
                output_tokens: 0,
            },
            UsageRecord {
                timestamp: now,
                model: "anthropic/claude-sonnet-4".into(),
                requests: 4,
                input_tokens: 0,
                output_tokens: 0,
            },
        ];
        let usage = provider_usage(&history);
        assert_eq!(usage.get("openai"), Some(&5));
        assert_eq!(usage.get("anthropic"), Some(&4));
    }
}
