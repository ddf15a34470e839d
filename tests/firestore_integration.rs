// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running and
//! FIRESTORE_EMULATOR_HOST to point at it.

use carbon_tracker::db::RecordStore;
use carbon_tracker::models::{
    ActivityKind, DeadLetter, DeadLetterReason, Difficulty, NewSuggestion, SuggestionCandidate,
    SuggestionSource, UserStatsRow,
};
use chrono::NaiveDate;

mod common;
use common::test_db;

/// Generate a unique user ID for test isolation.
fn unique_user_id(prefix: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}", prefix, nanos)
}

fn candidates(texts: &[&str]) -> Vec<SuggestionCandidate> {
    texts
        .iter()
        .map(|t| SuggestionCandidate::new(*t, Difficulty::Easy))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// ACTIVITY TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_activity_insert_and_range_queries() {
    require_emulator!();

    let db = test_db().await;
    let user = unique_user_id("activities");

    for (co2, at) in [
        (1.0, "2024-03-09T23:59:59Z"),
        (2.0, "2024-03-10T00:00:00Z"),
        (3.0, "2024-03-10T18:30:00Z"),
        (4.0, "2024-03-11T00:00:00Z"),
    ] {
        db.insert_activity(common::draft(&user, ActivityKind::Food, co2, at))
            .await
            .unwrap();
    }

    let day = db
        .activities_between(&user, "2024-03-10T00:00:00Z", Some("2024-03-11T00:00:00Z"))
        .await
        .unwrap();
    let mut totals: Vec<f64> = day.iter().map(|a| a.co2_kg).collect();
    totals.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(totals, vec![2.0, 3.0]);

    let recent = db.recent_activities(&user, 2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].created_at, "2024-03-11T00:00:00Z");
    assert_ne!(recent[0].id, recent[1].id);
}

// ═══════════════════════════════════════════════════════════════════════════
// SUGGESTION TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_replace_suggestions_removes_fallback_rows() {
    require_emulator!();

    let db = test_db().await;
    let user = unique_user_id("suggestions");
    let activity = db
        .insert_activity(common::draft(&user, ActivityKind::Travel, 3.4, "2024-03-10T08:00:00Z"))
        .await
        .unwrap();

    db.insert_suggestions(NewSuggestion::from_candidates(
        activity.id,
        &user,
        &candidates(&["a", "b", "c"]),
        SuggestionSource::Fallback,
    ))
    .await
    .unwrap();

    let replaced = db
        .replace_suggestions(
            activity.id,
            NewSuggestion::from_candidates(
                activity.id,
                &user,
                &candidates(&["rule"]),
                SuggestionSource::Rule,
            ),
        )
        .await
        .unwrap();
    assert_eq!(replaced.len(), 1);

    let stored = db.suggestions_for_activity(activity.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].source, SuggestionSource::Rule);
    assert_eq!(stored[0].id, format!("{}-rule-0", activity.id));

    // Rewriting the same set is idempotent
    db.replace_suggestions(
        activity.id,
        NewSuggestion::from_candidates(
            activity.id,
            &user,
            &candidates(&["rule"]),
            SuggestionSource::Rule,
        ),
    )
    .await
    .unwrap();
    assert_eq!(db.suggestions_for_activity(activity.id).await.unwrap().len(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// USER STATS TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_user_stats_upsert_and_latest() {
    require_emulator!();

    let db = test_db().await;
    let user = unique_user_id("stats");
    let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();

    assert!(db.latest_user_stats(&user).await.unwrap().is_none());

    for (date, streak) in [(day.pred_opt().unwrap(), 1), (day, 2)] {
        let row = UserStatsRow {
            user_id: user.clone(),
            date,
            daily_co2_kg: 4.0,
            points: 10,
            streak,
            updated_at: "2024-03-10T12:00:00Z".to_string(),
        };
        db.upsert_user_stats(&row).await.unwrap();
        // Second write overwrites the same row
        db.upsert_user_stats(&row).await.unwrap();
    }

    let today = db.get_user_stats(&user, day).await.unwrap().unwrap();
    assert_eq!(today.streak, 2);

    let latest = db.latest_user_stats(&user).await.unwrap().unwrap();
    assert_eq!(latest.date, day);
}

#[tokio::test]
async fn test_dead_letter_recorded() {
    require_emulator!();

    let db = test_db().await;
    let letter = DeadLetter::new(
        Some(chrono::Utc::now().timestamp_micros() as u64),
        "{}".to_string(),
        DeadLetterReason::RetriesExhausted,
        "store unavailable".to_string(),
        5,
        chrono::Utc::now(),
    );

    db.record_dead_letter(&letter).await.unwrap();
    // A repeated write of the same letter lands on the same document
    db.record_dead_letter(&letter).await.unwrap();
}

#[tokio::test]
async fn test_offline_client_reports_database_error() {
    let db = carbon_tracker::db::FirestoreDb::new_mock();
    let err = db.recent_activities("nobody", 1).await.unwrap_err();
    assert!(matches!(err, carbon_tracker::error::AppError::Database(_)));
}
