// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod dead_letter;
pub mod stats;
pub mod suggestion;
pub mod summary;

pub use activity::{
    Activity, ActivityDraft, ActivityEvent, ActivityKind, CalculationSource, FoodCategory,
    NewActivity, TravelMode,
};
pub use dead_letter::{DeadLetter, DeadLetterReason};
pub use stats::{UserContext, UserStatsRow};
pub use suggestion::{
    Difficulty, NewSuggestion, Suggestion, SuggestionCandidate, SuggestionSource,
};
pub use summary::{EmissionSummary, SummaryPeriod};
