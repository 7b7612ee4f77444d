//! Quota exhaustion forecasting.
//!
//! Projects the recent average daily request rate forward over a fixed
//! horizon and reports when the monthly quota would run out.

use crate::config::ForecastConfig;
use crate::routing::policy::{QuotaStatus, UsageRecord};
use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastOptions {
    pub horizon_days: u32,
    pub lookback_days: u32,
    pub imminent_days: u32,
    /// Day the forecast is made on; the first point is the day after
    pub today: NaiveDate,
}

impl ForecastOptions {
    pub fn from_config(config: &ForecastConfig, today: NaiveDate) -> Self {
        Self {
            horizon_days: config.horizon_days,
            lookback_days: config.lookback_days,
            imminent_days: config.imminent_days,
            today,
        }
    }
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self::from_config(&ForecastConfig::default(), Utc::now().date_naive())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    /// Requests expected on this day
    pub projected_requests: f64,
    /// Monthly quota left at the end of this day
    pub projected_remaining: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaForecast {
    pub average_daily_requests: f64,
    pub points: Vec<ForecastPoint>,
    /// First day the projected remaining quota reaches zero, within the horizon
    pub exhaustion_date: Option<NaiveDate>,
    pub recommendations: Vec<String>,
}

/// Forecast monthly quota over `options.horizon_days` days.
///
/// The daily rate is the request total of the last `lookback_days` days
/// (today included) divided by `lookback_days`. Always returns exactly
/// `horizon_days` points.
pub fn forecast_quota(history: &[UsageRecord], quota: &QuotaStatus, options: &ForecastOptions) -> QuotaForecast {
    let lookback = options.lookback_days.max(1);
    let window_start = options
        .today
        .checked_sub_days(Days::new(u64::from(lookback - 1)))
        .unwrap_or(NaiveDate::MIN);
    let recent: u64 = history
        .iter()
        .filter(|r| {
            let day = r.timestamp.date_naive();
            day >= window_start && day <= options.today
        })
        .map(|r| u64::from(r.requests))
        .sum();
    let average = recent as f64 / f64::from(lookback);

    let remaining = f64::from(quota.monthly_remaining);
    let mut exhaustion_date = None;
    let mut exhaustion_day = None;
    let mut points = Vec::with_capacity(options.horizon_days as usize);
    for day in 1..=options.horizon_days {
        let Some(date) = options.today.checked_add_days(Days::new(u64::from(day))) else {
            break;
        };
        let projected_remaining = remaining - average * f64::from(day);
        if exhaustion_date.is_none() && average > 0.0 && projected_remaining <= 0.0 {
            exhaustion_date = Some(date);
            exhaustion_day = Some(day);
        }
        points.push(ForecastPoint {
            date,
            projected_requests: average,
            projected_remaining: projected_remaining.max(0.0),
        });
    }

    let mut recommendations = Vec::new();
    match (exhaustion_date, exhaustion_day) {
        (Some(date), Some(day)) if day <= options.imminent_days => {
            recommendations.push(format!(
                "Monthly quota runs out in {} day(s) ({}); switch pacing to economy or route to free models",
                day, date
            ));
        }
        (Some(date), _) => {
            recommendations.push(format!(
                "Monthly quota projected to run out on {}; consider a cost-first routing mode",
                date
            ));
        }
        _ => {}
    }
    if average > 0.0 && f64::from(quota.daily_remaining) < average {
        recommendations.push(format!(
            "Daily quota remaining ({}) is below average daily usage ({:.0})",
            quota.daily_remaining, average
        ));
    }

    if exhaustion_date.is_some() {
        tracing::warn!(
            exhaustion = ?exhaustion_date,
            average_daily = average,
            "Quota exhaustion forecast within horizon"
        );
    }

    QuotaForecast {
        average_daily_requests: average,
        points,
        exhaustion_date,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn on(day: u32, requests: u32) -> UsageRecord {
        let timestamp: DateTime<Utc> = Utc.with_ymd_and_hms(2026, 3, day, 9, 0, 0).unwrap();
        UsageRecord {
            timestamp,
            model: "chutes/deepseek-v3".to_string(),
            requests,
            input_tokens: 0,
            output_tokens: 0,
        }
    }

    fn options(horizon_days: u32) -> ForecastOptions {
        ForecastOptions {
            horizon_days,
            lookback_days: 7,
            imminent_days: 3,
            today: today(),
        }
    }

    fn week(per_day: u32) -> Vec<UsageRecord> {
        (4..=10).map(|d| on(d, per_day)).collect()
    }

    #[test]
    fn returns_exactly_horizon_points() {
        for horizon in [0, 1, 7, 30] {
            let forecast = forecast_quota(&week(10), &QuotaStatus::new(100, 1000), &options(horizon));
            assert_eq!(forecast.points.len(), horizon as usize);
        }
    }

    #[test]
    fn no_exhaustion_when_quota_outlasts_horizon() {
        let forecast = forecast_quota(&week(10), &QuotaStatus::new(100, 1000), &options(7));
        assert_eq!(forecast.average_daily_requests, 10.0);
        assert!(forecast.exhaustion_date.is_none());
        assert!(forecast.recommendations.is_empty());
        assert_eq!(forecast.points[0].date, NaiveDate::from_ymd_opt(2026, 3, 11).unwrap());
        assert_eq!(forecast.points[6].projected_remaining, 930.0);
    }

    #[test]
    fn exhaustion_date_marks_first_day_at_zero() {
        let forecast = forecast_quota(&week(100), &QuotaStatus::new(500, 500), &options(7));
        // 500 - 100 * 5 = 0 on the fifth day
        assert_eq!(forecast.exhaustion_date, NaiveDate::from_ymd_opt(2026, 3, 15));
        assert_eq!(forecast.points[6].projected_remaining, 0.0);
        assert!(forecast.recommendations[0].contains("2026-03-15"));
    }

    #[test]
    fn imminent_exhaustion_recommends_economy() {
        let forecast = forecast_quota(&week(100), &QuotaStatus::new(500, 250), &options(7));
        assert_eq!(forecast.exhaustion_date, NaiveDate::from_ymd_opt(2026, 3, 13));
        assert!(forecast.recommendations[0].contains("economy"));
    }

    #[test]
    fn no_usage_never_exhausts() {
        let forecast = forecast_quota(&[], &QuotaStatus::new(0, 0), &options(7));
        assert_eq!(forecast.average_daily_requests, 0.0);
        assert!(forecast.exhaustion_date.is_none());
    }

    #[test]
    fn history_outside_lookback_is_ignored() {
        let mut history = week(10);
        history.push(on(1, 10_000));
        let forecast = forecast_quota(&history, &QuotaStatus::new(100, 1000), &options(7));
        assert_eq!(forecast.average_daily_requests, 10.0);
    }

    #[test]
    fn low_daily_quota_is_flagged() {
        let forecast = forecast_quota(&week(50), &QuotaStatus::new(20, 10_000), &options(7));
        assert!(forecast.exhaustion_date.is_none());
        assert_eq!(forecast.recommendations.len(), 1);
        assert!(forecast.recommendations[0].contains("Daily quota"));
    }
}
