// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Gamification: daily points and streaks, plus the 7-day user context.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::db::RecordStore;
use crate::error::AppError;
use crate::models::{ActivityKind, UserContext, UserStatsRow};
use crate::services::emissions::round_kg;
use crate::time_utils::{day_bounds, format_utc_rfc3339, previous_day};

/// Days covered by the user context.
const CONTEXT_DAYS: i64 = 7;

/// Folds a user's activities into per-day stats rows.
#[derive(Clone)]
pub struct GamificationAggregator {
    store: Arc<dyn RecordStore>,
}

impl GamificationAggregator {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Recompute and store the stats row for `user_id` on `date`.
    ///
    /// Always recomputes from the full day, so repeated calls converge on
    /// the same row. Storage errors are returned to the caller.
    pub async fn update_for(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<UserStatsRow, AppError> {
        let (start, end) = day_bounds(date);
        let activities = self
            .store
            .activities_between(user_id, &start, Some(&end))
            .await?;
        let daily_co2_kg = round_kg(activities.iter().map(|a| a.co2_kg).sum());

        let yesterday = match previous_day(date) {
            Some(prev) => self.store.get_user_stats(user_id, prev).await?,
            None => None,
        };

        let now = format_utc_rfc3339(Utc::now());
        let row = UserStatsRow::compute(user_id, date, daily_co2_kg, yesterday.as_ref(), &now);
        self.store.upsert_user_stats(&row).await?;

        tracing::debug!(
            user_id,
            date = %date,
            daily_co2_kg,
            points = row.points,
            streak = row.streak,
            "User stats updated"
        );

        Ok(row)
    }

    /// Seven-day context used to personalise AI suggestions.
    pub async fn user_context(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UserContext, AppError> {
        let since = format_utc_rfc3339(now - chrono::Duration::days(CONTEXT_DAYS));
        let activities = self.store.activities_between(user_id, &since, None).await?;

        let total: f64 = activities.iter().map(|a| a.co2_kg).sum();
        let avg_daily_7d = (total / CONTEXT_DAYS as f64 * 100.0).round() / 100.0;

        let mut by_kind: HashMap<ActivityKind, f64> = HashMap::new();
        for activity in &activities {
            *by_kind.entry(activity.kind).or_insert(0.0) += activity.co2_kg;
        }
        let top_activity_type = by_kind
            .into_iter()
            .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.as_str().cmp(a.0.as_str())))
            .map(|(kind, _)| kind)
            .unwrap_or(ActivityKind::Travel);

        let latest = self.store.latest_user_stats(user_id).await?;

        Ok(UserContext {
            avg_daily_7d,
            top_activity_type,
            streak: latest.as_ref().map_or(0, |s| s.streak),
            points: latest.as_ref().map_or(0, |s| s.points),
        })
    }
}
