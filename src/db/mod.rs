// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! The pipeline talks to storage only through [`RecordStore`]. Production
//! uses Firestore; tests and local runs use the in-memory store.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::{MemoryStore, StoreOp};

use crate::error::AppError;
use crate::models::{
    Activity, ActivityDraft, DeadLetter, NewSuggestion, Suggestion, UserStatsRow,
};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Collection names as constants.
pub mod collections {
    pub const ACTIVITIES: &str = "activities";
    pub const SUGGESTIONS: &str = "suggestions";
    /// Daily stats rows (keyed by `{user_id}_{date}`)
    pub const USER_STATS: &str = "user_stats";
    pub const DEAD_LETTERS: &str = "dead_letters";
}

/// Narrow record-store interface used by the producer, worker and aggregator.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // ─── Activities ──────────────────────────────────────────────

    /// Persist a new activity and return it with its assigned ID.
    async fn insert_activity(&self, draft: ActivityDraft) -> Result<Activity, AppError>;

    /// A user's most recent activities, newest first.
    async fn recent_activities(&self, user_id: &str, limit: u32)
        -> Result<Vec<Activity>, AppError>;

    /// A user's activities with `start <= created_at < end` (`end` open if `None`).
    async fn activities_between(
        &self,
        user_id: &str,
        start: &str,
        end: Option<&str>,
    ) -> Result<Vec<Activity>, AppError>;

    // ─── Suggestions ─────────────────────────────────────────────

    /// Append suggestions without touching existing rows.
    async fn insert_suggestions(
        &self,
        suggestions: Vec<NewSuggestion>,
    ) -> Result<Vec<Suggestion>, AppError>;

    /// Atomically replace every suggestion of an activity with `suggestions`.
    ///
    /// Either all prior rows are gone and all new rows exist, or nothing changed.
    async fn replace_suggestions(
        &self,
        activity_id: u64,
        suggestions: Vec<NewSuggestion>,
    ) -> Result<Vec<Suggestion>, AppError>;

    async fn suggestions_for_activity(&self, activity_id: u64)
        -> Result<Vec<Suggestion>, AppError>;

    /// A user's most recent suggestions, newest first.
    async fn suggestions_for_user(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<Suggestion>, AppError>;

    // ─── User Stats ──────────────────────────────────────────────

    /// The stats row for exactly `date`.
    async fn get_user_stats(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<UserStatsRow>, AppError>;

    /// The user's most recent stats row.
    async fn latest_user_stats(&self, user_id: &str) -> Result<Option<UserStatsRow>, AppError>;

    /// Insert or overwrite the row for `(stats.user_id, stats.date)`.
    async fn upsert_user_stats(&self, stats: &UserStatsRow) -> Result<(), AppError>;

    // ─── Dead Letters ────────────────────────────────────────────

    async fn record_dead_letter(&self, letter: &DeadLetter) -> Result<(), AppError>;
}
