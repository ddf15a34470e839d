// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory record store for tests and local runs.
//!
//! All tables sit behind one mutex, so every trait method is atomic. Individual
//! operations can be made to fail to simulate a storage outage.

use crate::db::RecordStore;
use crate::error::AppError;
use crate::models::{
    Activity, ActivityDraft, DeadLetter, NewSuggestion, Suggestion, UserStatsRow,
};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    InsertActivity,
    ReadActivities,
    InsertSuggestions,
    ReplaceSuggestions,
    ReadSuggestions,
    ReadUserStats,
    UpsertUserStats,
    RecordDeadLetter,
}

#[derive(Default)]
struct Tables {
    next_activity_id: u64,
    activities: BTreeMap<u64, Activity>,
    suggestions: BTreeMap<String, Suggestion>,
    user_stats: BTreeMap<String, UserStatsRow>,
    dead_letters: Vec<DeadLetter>,
}

/// Mutex-guarded in-memory implementation of [`RecordStore`].
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing: Mutex<HashSet<StoreOp>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `op` fail (or succeed again) until changed.
    pub fn set_failing(&self, op: StoreOp, failing: bool) {
        let mut guard = self.failing.lock().unwrap_or_else(|e| e.into_inner());
        if failing {
            guard.insert(op);
        } else {
            guard.remove(&op);
        }
    }

    /// Snapshot of recorded dead letters.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.tables
            .lock()
            .map(|t| t.dead_letters.clone())
            .unwrap_or_default()
    }

    /// Number of stats rows stored for a user across all days.
    pub fn user_stats_row_count(&self, user_id: &str) -> usize {
        self.tables
            .lock()
            .map(|t| t.user_stats.values().filter(|r| r.user_id == user_id).count())
            .unwrap_or_default()
    }

    /// Insert an activity with a fixed timestamp, bypassing the producer.
    pub fn seed_activity(&self, draft: ActivityDraft) -> Activity {
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        tables.next_activity_id += 1;
        let activity = draft.into_activity(tables.next_activity_id);
        tables.activities.insert(activity.id, activity.clone());
        activity
    }

    fn check(&self, op: StoreOp) -> Result<(), AppError> {
        let failing = self.failing.lock().unwrap_or_else(|e| e.into_inner());
        if failing.contains(&op) {
            return Err(AppError::Database(format!(
                "Store unavailable ({:?})",
                op
            )));
        }
        Ok(())
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::Database("Store lock poisoned".to_string()))
    }
}

/// Newest first, ties broken by ID for a stable order.
fn newest_first_suggestions(rows: &mut [Suggestion]) {
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_activity(&self, draft: ActivityDraft) -> Result<Activity, AppError> {
        self.check(StoreOp::InsertActivity)?;
        let mut tables = self.tables()?;
        tables.next_activity_id += 1;
        let activity = draft.into_activity(tables.next_activity_id);
        tables.activities.insert(activity.id, activity.clone());
        Ok(activity)
    }

    async fn recent_activities(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<Activity>, AppError> {
        self.check(StoreOp::ReadActivities)?;
        let tables = self.tables()?;
        let mut rows: Vec<Activity> = tables
            .activities
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn activities_between(
        &self,
        user_id: &str,
        start: &str,
        end: Option<&str>,
    ) -> Result<Vec<Activity>, AppError> {
        self.check(StoreOp::ReadActivities)?;
        let tables = self.tables()?;
        Ok(tables
            .activities
            .values()
            .filter(|a| a.user_id == user_id)
            .filter(|a| a.created_at.as_str() >= start)
            .filter(|a| end.map_or(true, |end| a.created_at.as_str() < end))
            .cloned()
            .collect())
    }

    async fn insert_suggestions(
        &self,
        suggestions: Vec<NewSuggestion>,
    ) -> Result<Vec<Suggestion>, AppError> {
        self.check(StoreOp::InsertSuggestions)?;
        let now = format_utc_rfc3339(chrono::Utc::now());
        let mut tables = self.tables()?;

        let mut stored = Vec::with_capacity(suggestions.len());
        for (index, new) in suggestions.into_iter().enumerate() {
            let suggestion = new.into_suggestion(index, &now);
            tables
                .suggestions
                .insert(suggestion.id.clone(), suggestion.clone());
            stored.push(suggestion);
        }
        Ok(stored)
    }

    async fn replace_suggestions(
        &self,
        activity_id: u64,
        suggestions: Vec<NewSuggestion>,
    ) -> Result<Vec<Suggestion>, AppError> {
        self.check(StoreOp::ReplaceSuggestions)?;
        let now = format_utc_rfc3339(chrono::Utc::now());
        let mut tables = self.tables()?;

        tables.suggestions.retain(|_, s| s.activity_id != activity_id);

        let mut stored = Vec::with_capacity(suggestions.len());
        for (index, new) in suggestions.into_iter().enumerate() {
            let suggestion = new.into_suggestion(index, &now);
            tables
                .suggestions
                .insert(suggestion.id.clone(), suggestion.clone());
            stored.push(suggestion);
        }
        Ok(stored)
    }

    async fn suggestions_for_activity(
        &self,
        activity_id: u64,
    ) -> Result<Vec<Suggestion>, AppError> {
        self.check(StoreOp::ReadSuggestions)?;
        let tables = self.tables()?;
        Ok(tables
            .suggestions
            .values()
            .filter(|s| s.activity_id == activity_id)
            .cloned()
            .collect())
    }

    async fn suggestions_for_user(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<Suggestion>, AppError> {
        self.check(StoreOp::ReadSuggestions)?;
        let tables = self.tables()?;
        let mut rows: Vec<Suggestion> = tables
            .suggestions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        newest_first_suggestions(&mut rows);
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn get_user_stats(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<UserStatsRow>, AppError> {
        self.check(StoreOp::ReadUserStats)?;
        let tables = self.tables()?;
        Ok(tables
            .user_stats
            .get(&UserStatsRow::document_id(user_id, date))
            .cloned())
    }

    async fn latest_user_stats(&self, user_id: &str) -> Result<Option<UserStatsRow>, AppError> {
        self.check(StoreOp::ReadUserStats)?;
        let tables = self.tables()?;
        Ok(tables
            .user_stats
            .values()
            .filter(|r| r.user_id == user_id)
            .max_by_key(|r| r.date)
            .cloned())
    }

    async fn upsert_user_stats(&self, stats: &UserStatsRow) -> Result<(), AppError> {
        self.check(StoreOp::UpsertUserStats)?;
        let mut tables = self.tables()?;
        tables.user_stats.insert(
            UserStatsRow::document_id(&stats.user_id, stats.date),
            stats.clone(),
        );
        Ok(())
    }

    async fn record_dead_letter(&self, letter: &DeadLetter) -> Result<(), AppError> {
        self.check(StoreOp::RecordDeadLetter)?;
        let mut tables = self.tables()?;
        match tables.dead_letters.iter_mut().find(|l| l.id == letter.id) {
            Some(existing) => *existing = letter.clone(),
            None => tables.dead_letters.push(letter.clone()),
        }
        Ok(())
    }
}
