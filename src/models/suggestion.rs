// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Suggestion model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// How hard a suggestion is to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Parse a difficulty label; anything unrecognised is `Medium`.
    pub fn parse_or_medium(label: Option<&str>) -> Self {
        match label.map(|l| l.trim().to_ascii_lowercase()).as_deref() {
            Some("easy") => Difficulty::Easy,
            Some("hard") => Difficulty::Hard,
            _ => Difficulty::Medium,
        }
    }
}

/// Which path produced a suggestion.
///
/// `Fallback` rows are written by the producer and replaced by the worker
/// with `Rule` or `Ai` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSource {
    Fallback,
    Rule,
    Ai,
}

impl SuggestionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionSource::Fallback => "fallback",
            SuggestionSource::Rule => "rule",
            SuggestionSource::Ai => "ai",
        }
    }
}

/// A suggestion produced by the generator, not yet tied to an activity.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionCandidate {
    pub text: String,
    pub difficulty: Difficulty,
    pub est_saving_kg: Option<f64>,
}

impl SuggestionCandidate {
    pub fn new(text: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            text: text.into(),
            difficulty,
            est_saving_kg: None,
        }
    }
}

/// Suggestion ready to be written; the store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewSuggestion {
    pub activity_id: u64,
    pub user_id: String,
    pub text: String,
    pub est_saving_kg: Option<f64>,
    pub difficulty: Difficulty,
    pub source: SuggestionSource,
}

impl NewSuggestion {
    /// Attach candidates to an activity with the given source tag.
    pub fn from_candidates(
        activity_id: u64,
        user_id: &str,
        candidates: &[SuggestionCandidate],
        source: SuggestionSource,
    ) -> Vec<Self> {
        candidates
            .iter()
            .map(|c| Self {
                activity_id,
                user_id: user_id.to_string(),
                text: c.text.clone(),
                est_saving_kg: c.est_saving_kg,
                difficulty: c.difficulty,
                source,
            })
            .collect()
    }

    /// Deterministic document ID, so rewriting the same set is idempotent.
    pub fn document_id(&self, index: usize) -> String {
        format!("{}-{}-{}", self.activity_id, self.source.as_str(), index)
    }

    /// Materialise the stored record.
    pub fn into_suggestion(self, index: usize, created_at: &str) -> Suggestion {
        Suggestion {
            id: self.document_id(index),
            activity_id: self.activity_id,
            user_id: self.user_id,
            text: self.text,
            est_saving_kg: self.est_saving_kg,
            difficulty: self.difficulty,
            source: self.source,
            created_at: created_at.to_string(),
        }
    }
}

/// Stored suggestion record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Suggestion {
    /// `{activity_id}-{source}-{index}`, also used as document ID
    pub id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub activity_id: u64,
    pub user_id: String,
    pub text: String,
    pub est_saving_kg: Option<f64>,
    pub difficulty: Difficulty,
    pub source: SuggestionSource,
    /// RFC3339, UTC
    pub created_at: String,
}
