// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Suggestion generation.
//!
//! The rule path is deterministic and always available. The AI path makes a
//! single Gemini call and accepts only well-formed JSON output; anything else
//! is treated as "no AI suggestions" and the rule path is used instead.

use std::sync::Arc;

use crate::models::{
    ActivityEvent, ActivityKind, Difficulty, FoodCategory, SuggestionCandidate, SuggestionSource,
    TravelMode, UserContext,
};
use crate::services::gemini::TextGenerator;

/// Most suggestions kept per activity.
pub const MAX_SUGGESTIONS: usize = 2;

const GENERIC_TIP: &str =
    "Small daily choices like saving energy and reducing travel add up over time.";

/// Deterministic suggestions for an activity. Always returns 1 or 2 items.
pub fn rule_based_suggestions(event: &ActivityEvent) -> Vec<SuggestionCandidate> {
    let mut out = match event.kind {
        ActivityKind::Travel => travel_rules(
            event.mode.as_deref().and_then(TravelMode::parse),
            event.distance_km.unwrap_or(0.0),
        ),
        ActivityKind::Electricity => electricity_rules(event.kwh.unwrap_or(0.0)),
        ActivityKind::Food => food_rules(event.food_category.as_deref().and_then(FoodCategory::parse)),
    };

    if out.is_empty() {
        out.push(SuggestionCandidate::new(GENERIC_TIP, Difficulty::Easy));
    }
    out.truncate(MAX_SUGGESTIONS);
    out
}

fn travel_rules(mode: Option<TravelMode>, distance_km: f64) -> Vec<SuggestionCandidate> {
    use Difficulty::*;

    let Some(mode) = mode else {
        return Vec::new();
    };

    match mode {
        TravelMode::Bicycle => vec![
            SuggestionCandidate::new(
                format!(
                    "Cycling for {:.1} km is a low-carbon choice. Keep using it for short daily trips.",
                    distance_km
                ),
                Easy,
            ),
            SuggestionCandidate::new(
                "You could replace another short trip this week with cycling to maintain this habit.",
                Easy,
            ),
        ],
        TravelMode::Walk => vec![SuggestionCandidate::new(
            "Walking produces almost zero emissions. Consider using it for all trips under 2 km.",
            Easy,
        )],
        TravelMode::Train => vec![SuggestionCandidate::new(
            "Train travel has lower emissions per km. Continue using it for medium-distance travel.",
            Easy,
        )],
        TravelMode::Bus => vec![SuggestionCandidate::new(
            "Public transport reduces per-person emissions. Prefer buses over private vehicles when possible.",
            Easy,
        )],
        TravelMode::Car | TravelMode::Motorbike => {
            let candidate = if distance_km <= 5.0 {
                SuggestionCandidate::new(
                    format!(
                        "For trips under {} km, walking or cycling could fully avoid emissions.",
                        distance_km.trunc() as i64
                    ),
                    Easy,
                )
            } else if distance_km <= 15.0 {
                SuggestionCandidate::new(
                    "For medium trips, carpooling or public transport can reduce emissions significantly.",
                    Medium,
                )
            } else {
                SuggestionCandidate::new(
                    "For long trips, combining errands into one journey can lower total emissions.",
                    Medium,
                )
            };
            vec![candidate]
        }
    }
}

fn electricity_rules(kwh: f64) -> Vec<SuggestionCandidate> {
    let candidate = if kwh <= 2.0 {
        SuggestionCandidate::new(
            "Your electricity usage is relatively low. Continue switching off unused devices.",
            Difficulty::Easy,
        )
    } else if kwh <= 6.0 {
        SuggestionCandidate::new(
            "Reducing standby power and using LED lighting can cut daily electricity usage.",
            Difficulty::Easy,
        )
    } else {
        SuggestionCandidate::new(
            "High electricity usage detected. Limiting AC usage and unplugging idle devices can help.",
            Difficulty::Medium,
        )
    };
    vec![candidate]
}

fn food_rules(category: Option<FoodCategory>) -> Vec<SuggestionCandidate> {
    match category {
        Some(FoodCategory::Veg) => vec![
            SuggestionCandidate::new(
                "Vegetarian meals have lower carbon impact. Maintaining this diet reduces emissions.",
                Difficulty::Easy,
            ),
            SuggestionCandidate::new(
                "You could explore locally sourced vegetables to reduce transport emissions further.",
                Difficulty::Easy,
            ),
        ],
        Some(FoodCategory::Chicken) => vec![SuggestionCandidate::new(
            "Chicken has lower emissions than red meat. Replacing some meals with vegetarian options helps more.",
            Difficulty::Medium,
        )],
        Some(FoodCategory::Beef) => vec![SuggestionCandidate::new(
            "Beef has a high carbon footprint. Replacing even one meal with plant-based food helps.",
            Difficulty::Hard,
        )],
        None => Vec::new(),
    }
}

/// Prompt for the AI path: output format, user context, then the activity.
pub fn build_prompt(event: &ActivityEvent, context: &UserContext) -> String {
    let activity = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    format!(
        r#"
Return ONLY valid JSON. No markdown.

Format:
[
  {{ "text": "...", "difficulty": "easy|medium|hard" }}
]

Max 2 items. Each text under 18 words.

User:
- Avg 7d CO2: {}
- Top source: {}
- Streak: {}
- Points: {}

Activity:
{}
"#,
        context.avg_daily_7d,
        context.top_activity_type,
        context.streak,
        context.points,
        activity
    )
}

/// Strip a surrounding markdown code fence (with optional language tag).
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the language tag line, if any.
    match body.find('\n') {
        Some(newline) if !body[..newline].trim_start().starts_with(['[', '{']) => {
            body[newline + 1..].trim()
        }
        _ => body.trim(),
    }
}

fn candidate_from_value(value: &serde_json::Value) -> Option<SuggestionCandidate> {
    let object = value.as_object()?;
    let text = object.get("text")?.as_str()?.trim();
    if text.is_empty() {
        return None;
    }

    let difficulty =
        Difficulty::parse_or_medium(object.get("difficulty").and_then(|d| d.as_str()));
    let mut candidate = SuggestionCandidate::new(text, difficulty);
    candidate.est_saving_kg = object
        .get("est_saving_kg")
        .and_then(serde_json::Value::as_f64)
        .filter(|kg| kg.is_finite() && *kg >= 0.0);
    Some(candidate)
}

/// Parse raw model output into at most two candidates.
///
/// Accepts a JSON object or an array of objects, optionally inside a code
/// fence. Returns an empty list for anything else.
pub fn parse_model_output(text: &str) -> Vec<SuggestionCandidate> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Vec::new();
    }

    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return Vec::new();
    };

    let items = match &value {
        serde_json::Value::Array(items) => items.iter().collect::<Vec<_>>(),
        serde_json::Value::Object(_) => vec![&value],
        _ => return Vec::new(),
    };

    items
        .into_iter()
        .filter_map(candidate_from_value)
        .take(MAX_SUGGESTIONS)
        .collect()
}

/// Produces suggestions, preferring the AI path when one is configured.
#[derive(Clone, Default)]
pub struct SuggestionGenerator {
    remote: Option<Arc<dyn TextGenerator>>,
}

impl SuggestionGenerator {
    pub fn new(remote: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { remote }
    }

    /// Rule path only.
    pub fn rules_only() -> Self {
        Self::default()
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Suggestions for an event and the path that produced them.
    ///
    /// Never fails: remote errors and unusable output fall back to the rules.
    pub async fn suggestions_for(
        &self,
        event: &ActivityEvent,
        context: &UserContext,
    ) -> (Vec<SuggestionCandidate>, SuggestionSource) {
        if let Some(remote) = &self.remote {
            let prompt = build_prompt(event, context);
            match remote.generate(&prompt).await {
                Ok(text) => {
                    let parsed = parse_model_output(&text);
                    if !parsed.is_empty() {
                        return (parsed, SuggestionSource::Ai);
                    }
                    tracing::warn!(
                        activity_id = event.activity_id,
                        "Model output unusable, using rule suggestions"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        activity_id = event.activity_id,
                        error = %e,
                        "Gemini call failed, using rule suggestions"
                    );
                }
            }
        }

        (rule_based_suggestions(event), SuggestionSource::Rule)
    }
}
