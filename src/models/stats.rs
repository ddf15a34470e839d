//! Daily gamification stats per user.
//!
//! One row per user per calendar day. Rows are recomputed from the day's
//! activities on every update, so re-running for the same day is idempotent.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::ActivityKind;

/// Points thresholds (kg CO2e per day).
const LOW_EMISSION_KG: f64 = 5.0;
const MODERATE_EMISSION_KG: f64 = 10.0;

/// Daily stats row.
///
/// Stored at: `user_stats/{user_id}_{YYYY-MM-DD}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserStatsRow {
    pub user_id: String,
    /// Calendar day (UTC)
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub date: NaiveDate,
    /// Total emissions logged that day
    pub daily_co2_kg: f64,
    pub points: u32,
    /// Consecutive days without an increase in emissions
    pub streak: u32,
    /// Last recomputation (ISO 8601)
    #[serde(default)]
    pub updated_at: String,
}

impl UserStatsRow {
    /// Document ID for a user's row on a given day.
    pub fn document_id(user_id: &str, date: NaiveDate) -> String {
        format!("{}_{}", user_id, date.format("%Y-%m-%d"))
    }

    /// Build the row for `date` from the day's total and the previous day's row.
    ///
    /// `yesterday` must be the row for exactly `date - 1`, or `None`.
    pub fn compute(
        user_id: &str,
        date: NaiveDate,
        daily_co2_kg: f64,
        yesterday: Option<&UserStatsRow>,
        now: &str,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            date,
            daily_co2_kg,
            points: calculate_points(daily_co2_kg),
            streak: next_streak(yesterday, daily_co2_kg),
            updated_at: now.to_string(),
        }
    }
}

/// Points awarded for a day's total emissions.
pub fn calculate_points(daily_co2_kg: f64) -> u32 {
    if daily_co2_kg <= LOW_EMISSION_KG {
        10
    } else if daily_co2_kg <= MODERATE_EMISSION_KG {
        5
    } else {
        0
    }
}

/// Streak for today given yesterday's row.
pub fn next_streak(yesterday: Option<&UserStatsRow>, today_co2_kg: f64) -> u32 {
    match yesterday {
        Some(prev) if today_co2_kg <= prev.daily_co2_kg => prev.streak.saturating_add(1),
        _ => 1,
    }
}

/// Seven-day summary of a user's behavior, used to personalise AI suggestions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserContext {
    /// Average daily emissions over the last 7 days
    pub avg_daily_7d: f64,
    /// Activity type with the largest share of emissions
    pub top_activity_type: ActivityKind,
    pub streak: u32,
    pub points: u32,
}

impl Default for UserContext {
    fn default() -> Self {
        Self {
            avg_daily_7d: 0.0,
            top_activity_type: ActivityKind::Travel,
            streak: 0,
            points: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: NaiveDate, daily_co2_kg: f64, streak: u32) -> UserStatsRow {
        UserStatsRow {
            user_id: "alice".to_string(),
            date,
            daily_co2_kg,
            points: calculate_points(daily_co2_kg),
            streak,
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_points_thresholds() {
        assert_eq!(calculate_points(0.0), 10);
        assert_eq!(calculate_points(5.0), 10);
        assert_eq!(calculate_points(5.01), 5);
        assert_eq!(calculate_points(10.0), 5);
        assert_eq!(calculate_points(10.5), 0);
    }

    #[test]
    fn test_streak_continues_when_emissions_do_not_rise() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let yesterday = row(d, 10.0, 3);

        assert_eq!(next_streak(Some(&yesterday), 8.0), 4);
        assert_eq!(next_streak(Some(&yesterday), 10.0), 4);
    }

    #[test]
    fn test_streak_resets_when_emissions_rise() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let yesterday = row(d, 10.0, 3);

        assert_eq!(next_streak(Some(&yesterday), 12.0), 1);
        assert_eq!(next_streak(None, 0.0), 1);
    }

    #[test]
    fn test_document_id_is_per_day() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(UserStatsRow::document_id("alice", d), "alice_2024-03-09");
    }

    #[test]
    fn test_compute_fills_points_and_streak() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let yesterday = row(today.pred_opt().unwrap(), 10.0, 3);

        let stats = UserStatsRow::compute("alice", today, 8.0, Some(&yesterday), "now");

        assert_eq!(stats.points, 5);
        assert_eq!(stats.streak, 4);
        assert_eq!(stats.date, today);
    }
}
