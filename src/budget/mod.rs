//! Spend tracking and quota forecasting.

pub mod cost;
pub mod forecast;

pub use cost::{CostTracker, CostVerdict, SpendSnapshot, TokenUsage};
pub use forecast::{forecast_quota, ForecastOptions, ForecastPoint, QuotaForecast};
