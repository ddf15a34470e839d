// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public API routes: logging activities and reading results.

use crate::error::{AppError, Result};
use crate::models::{
    Activity, ActivityKind, CalculationSource, EmissionSummary, NewActivity, Suggestion,
    SummaryPeriod, UserStatsRow,
};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 200;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities", get(list_activities).post(create_activity))
        .route("/api/suggestions/users/{user_id}", get(list_suggestions))
        .route("/api/gamification/users/{user_id}", get(get_gamification))
        .route("/api/summary/users/{user_id}", get(get_summary))
}

// ─── Activities ──────────────────────────────────────────────

/// Response for a newly logged activity.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CreateActivityResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub activity_id: u64,
    pub co2_kg: f64,
    pub calculation_source: CalculationSource,
    /// Whether the event reached the queue; suggestions refine later only if so
    pub published: bool,
    /// Rule-based suggestions available immediately
    pub suggestions: Vec<Suggestion>,
}

/// Required fields per activity type; negative amounts are rejected.
fn validate(input: &NewActivity) -> Result<()> {
    if input.user_id.trim().is_empty() {
        return Err(AppError::BadRequest("user_id is required".to_string()));
    }

    match input.kind {
        ActivityKind::Travel => {
            if input.mode.is_none() || input.distance_km.is_none() {
                return Err(AppError::BadRequest(
                    "travel requires mode and distance_km".to_string(),
                ));
            }
        }
        ActivityKind::Electricity => {
            if input.kwh.is_none() {
                return Err(AppError::BadRequest("electricity requires kwh".to_string()));
            }
        }
        ActivityKind::Food => {}
    }

    for (name, value) in [("distance_km", input.distance_km), ("kwh", input.kwh)] {
        if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
            return Err(AppError::BadRequest(format!(
                "{} must be a non-negative number",
                name
            )));
        }
    }

    Ok(())
}

async fn create_activity(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewActivity>,
) -> Result<Json<CreateActivityResponse>> {
    validate(&input)?;

    let outcome = state.producer.record_activity(input).await?;

    Ok(Json(CreateActivityResponse {
        activity_id: outcome.activity.id,
        co2_kg: outcome.activity.co2_kg,
        calculation_source: outcome.activity.calculation_source,
        published: outcome.published,
        suggestions: outcome.fallback.unwrap_or_default(),
    }))
}

#[derive(Deserialize)]
struct ActivitiesQuery {
    user_id: String,
    limit: Option<u32>,
}

/// A user's recent activities, newest first.
async fn list_activities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ActivitiesQuery>,
) -> Result<Json<Vec<Activity>>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let activities = state
        .store
        .recent_activities(&params.user_id, limit)
        .await?;
    Ok(Json(activities))
}

// ─── Suggestions ─────────────────────────────────────────────

async fn list_suggestions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Suggestion>>> {
    let suggestions = state
        .store
        .suggestions_for_user(&user_id, DEFAULT_LIMIT)
        .await?;
    Ok(Json(suggestions))
}

// ─── Gamification ────────────────────────────────────────────

/// Latest points and streak for a user.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GamificationResponse {
    pub user_id: String,
    /// Day of the latest stats row, if any (YYYY-MM-DD)
    pub date: Option<String>,
    pub daily_co2_kg: f64,
    pub points: u32,
    pub streak: u32,
}

impl GamificationResponse {
    fn from_row(user_id: String, row: Option<UserStatsRow>) -> Self {
        match row {
            Some(row) => Self {
                user_id,
                date: Some(row.date.format("%Y-%m-%d").to_string()),
                daily_co2_kg: row.daily_co2_kg,
                points: row.points,
                streak: row.streak,
            },
            None => Self {
                user_id,
                date: None,
                daily_co2_kg: 0.0,
                points: 0,
                streak: 0,
            },
        }
    }
}

async fn get_gamification(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<GamificationResponse>> {
    let latest = state.store.latest_user_stats(&user_id).await?;
    Ok(Json(GamificationResponse::from_row(user_id, latest)))
}

// ─── Summary ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct SummaryQuery {
    #[serde(default)]
    period: SummaryPeriod,
}

/// Emission totals over the trailing day, week or month.
async fn get_summary(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(params): Query<SummaryQuery>,
) -> Result<Json<EmissionSummary>> {
    let start = format_utc_rfc3339(chrono::Utc::now() - params.period.duration());
    let activities = state
        .store
        .activities_between(&user_id, &start, None)
        .await?;

    Ok(Json(EmissionSummary::from_activities(
        &user_id,
        params.period,
        start,
        &activities,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(kind: ActivityKind) -> NewActivity {
        NewActivity {
            user_id: "alice".to_string(),
            kind,
            mode: None,
            distance_km: None,
            kwh: None,
            food_category: None,
        }
    }

    #[test]
    fn test_travel_needs_mode_and_distance() {
        let mut travel = input(ActivityKind::Travel);
        travel.distance_km = Some(3.0);
        assert!(validate(&travel).is_err());

        travel.mode = Some("bus".to_string());
        assert!(validate(&travel).is_ok());
    }

    #[test]
    fn test_negative_kwh_rejected() {
        let mut power = input(ActivityKind::Electricity);
        power.kwh = Some(-2.0);
        assert!(matches!(validate(&power), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_food_needs_nothing() {
        assert!(validate(&input(ActivityKind::Food)).is_ok());
        assert!(validate(&NewActivity {
            user_id: " ".to_string(),
            ..input(ActivityKind::Food)
        })
        .is_err());
    }
}
