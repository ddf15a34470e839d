// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore implementation of [`RecordStore`].
//!
//! Collections:
//! - `activities/{id}` where `id` is derived from the insert time in microseconds
//! - `suggestions/{activity_id}-{source}-{index}`
//! - `user_stats/{user_id}_{YYYY-MM-DD}`
//! - `dead_letters/{activity_id}_{reason}_{attempts}`

use crate::db::{collections, RecordStore};
use crate::error::AppError;
use crate::models::{
    Activity, ActivityDraft, DeadLetter, NewSuggestion, Suggestion, UserStatsRow,
};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;

/// Attempts at finding a free activity ID before giving up.
const MAX_ID_ATTEMPTS: u64 = 3;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client; every operation returns a database error.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Upsert suggestion rows into an open transaction.
    fn add_suggestions_to_transaction(
        &self,
        rows: &[Suggestion],
        transaction: &mut firestore::FirestoreTransaction<'_>,
    ) -> Result<(), AppError> {
        for row in rows {
            self.get_client()?
                .fluent()
                .update()
                .in_col(collections::SUGGESTIONS)
                .document_id(&row.id)
                .object(row)
                .add_to_transaction(transaction)
                .map_err(|e| {
                    AppError::Database(format!(
                        "Failed to add suggestion to transaction: {}",
                        e
                    ))
                })?;
        }
        Ok(())
    }
}

fn materialise(suggestions: Vec<NewSuggestion>) -> Vec<Suggestion> {
    let now = format_utc_rfc3339(chrono::Utc::now());
    suggestions
        .into_iter()
        .enumerate()
        .map(|(index, s)| s.into_suggestion(index, &now))
        .collect()
}

#[async_trait]
impl RecordStore for FirestoreDb {
    // ─── Activities ──────────────────────────────────────────────

    async fn insert_activity(&self, draft: ActivityDraft) -> Result<Activity, AppError> {
        let base = chrono::Utc::now().timestamp_micros().max(1) as u64;
        let mut last_error = String::new();

        // Insert is create-only, so an ID collision fails rather than overwriting.
        for offset in 0..MAX_ID_ATTEMPTS {
            let activity = draft.clone().into_activity(base + offset);
            let result: Result<Activity, _> = self
                .get_client()?
                .fluent()
                .insert()
                .into(collections::ACTIVITIES)
                .document_id(activity.id.to_string())
                .object(&activity)
                .execute()
                .await;

            match result {
                Ok(_) => return Ok(activity),
                Err(e) => {
                    tracing::debug!(activity_id = activity.id, error = %e, "Activity insert failed");
                    last_error = e.to_string();
                }
            }
        }

        Err(AppError::Database(format!(
            "Failed to insert activity: {}",
            last_error
        )))
    }

    async fn recent_activities(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<Activity>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn activities_between(
        &self,
        user_id: &str,
        start: &str,
        end: Option<&str>,
    ) -> Result<Vec<Activity>, AppError> {
        let user_id = user_id.to_string();
        let start = start.to_string();
        let end = end.map(str::to_string);

        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    q.field("created_at").greater_than_or_equal(start.clone()),
                    end.clone()
                        .and_then(|end| q.field("created_at").less_than(end)),
                ])
            })
            .order_by([("created_at", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Suggestions ─────────────────────────────────────────────

    async fn insert_suggestions(
        &self,
        suggestions: Vec<NewSuggestion>,
    ) -> Result<Vec<Suggestion>, AppError> {
        let rows = materialise(suggestions);
        if rows.is_empty() {
            return Ok(rows);
        }

        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        self.add_suggestions_to_transaction(&rows, &mut transaction)?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(rows)
    }

    async fn replace_suggestions(
        &self,
        activity_id: u64,
        suggestions: Vec<NewSuggestion>,
    ) -> Result<Vec<Suggestion>, AppError> {
        let existing = self.suggestions_for_activity(activity_id).await?;
        let rows = materialise(suggestions);

        // A commit may write each document once, so rows being rewritten are
        // overwritten rather than deleted first.
        let rewritten: HashSet<&str> = rows.iter().map(|r| r.id.as_str()).collect();

        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        for old in existing.iter().filter(|s| !rewritten.contains(s.id.as_str())) {
            self.get_client()?
                .fluent()
                .delete()
                .from(collections::SUGGESTIONS)
                .document_id(&old.id)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!(
                        "Failed to add deletion to transaction for {}: {}",
                        collections::SUGGESTIONS,
                        e
                    ))
                })?;
        }

        self.add_suggestions_to_transaction(&rows, &mut transaction)?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::debug!(
            activity_id,
            removed = existing.len(),
            written = rows.len(),
            "Suggestions replaced"
        );

        Ok(rows)
    }

    async fn suggestions_for_activity(
        &self,
        activity_id: u64,
    ) -> Result<Vec<Suggestion>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SUGGESTIONS)
            .filter(move |q| q.for_all([q.field("activity_id").eq(activity_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn suggestions_for_user(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<Suggestion>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SUGGESTIONS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── User Stats ──────────────────────────────────────────────

    async fn get_user_stats(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<UserStatsRow>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_STATS)
            .obj()
            .one(&UserStatsRow::document_id(user_id, date))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn latest_user_stats(&self, user_id: &str) -> Result<Option<UserStatsRow>, AppError> {
        let user_id = user_id.to_string();
        let rows: Vec<UserStatsRow> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USER_STATS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            // ISO dates sort chronologically as strings
            .order_by([("date", firestore::FirestoreQueryDirection::Descending)])
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().next())
    }

    async fn upsert_user_stats(&self, stats: &UserStatsRow) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USER_STATS)
            .document_id(UserStatsRow::document_id(&stats.user_id, stats.date))
            .object(stats)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Dead Letters ────────────────────────────────────────────

    async fn record_dead_letter(&self, letter: &DeadLetter) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::DEAD_LETTERS)
            .document_id(&letter.id)
            .object(letter)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
