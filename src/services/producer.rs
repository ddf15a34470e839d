// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Event producer: the synchronous half of the pipeline.
//!
//! estimate → persist activity → write fallback suggestions → publish event.
//! Only the first two steps can fail the request. The fallback suggestions
//! and the publish are best-effort and reported in [`ProducerOutcome`].

use std::sync::Arc;

use crate::db::RecordStore;
use crate::error::AppError;
use crate::models::{
    Activity, ActivityDraft, ActivityEvent, NewActivity, NewSuggestion, Suggestion,
    SuggestionSource,
};
use crate::services::emissions::{round_kg, EmissionEstimator};
use crate::services::suggestions::rule_based_suggestions;
use crate::services::tasks::EventPublisher;
use crate::time_utils::format_utc_rfc3339;

/// What happened to one submitted activity.
#[derive(Debug)]
pub struct ProducerOutcome {
    /// The persisted activity
    pub activity: Activity,
    /// Rule-based suggestions written immediately, or why they were not
    pub fallback: Result<Vec<Suggestion>, AppError>,
    /// Whether the queue accepted the event
    pub published: bool,
}

pub struct EventProducer {
    store: Arc<dyn RecordStore>,
    estimator: Arc<EmissionEstimator>,
    publisher: Arc<dyn EventPublisher>,
}

impl EventProducer {
    pub fn new(
        store: Arc<dyn RecordStore>,
        estimator: Arc<EmissionEstimator>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            estimator,
            publisher,
        }
    }

    /// Record one activity.
    ///
    /// Fails only if the activity cannot be estimated or stored. Once the
    /// activity is stored it is never rolled back.
    pub async fn record_activity(&self, input: NewActivity) -> Result<ProducerOutcome, AppError> {
        let estimate = self.estimator.estimate(&input).await?;

        let draft = ActivityDraft {
            user_id: input.user_id,
            kind: input.kind,
            mode: input.mode,
            distance_km: input.distance_km,
            kwh: input.kwh,
            food_category: input.food_category,
            co2_kg: round_kg(estimate.co2_kg),
            calculation_source: estimate.source,
            created_at: format_utc_rfc3339(chrono::Utc::now()),
        };

        let activity = self.store.insert_activity(draft).await?;

        tracing::info!(
            activity_id = activity.id,
            user_id = %activity.user_id,
            kind = %activity.kind,
            co2_kg = activity.co2_kg,
            source = activity.calculation_source.as_str(),
            "Activity recorded"
        );

        let Some(event) = ActivityEvent::from_activity(&activity) else {
            tracing::error!(
                activity_id = activity.id,
                created_at = %activity.created_at,
                "Stored timestamp unreadable, event not built"
            );
            return Ok(ProducerOutcome {
                activity,
                fallback: Err(AppError::Internal(anyhow::anyhow!("unreadable created_at"))),
                published: false,
            });
        };

        let fallback = self.write_fallback(&event).await;
        let published = self.publish(&event).await;

        Ok(ProducerOutcome {
            activity,
            fallback,
            published,
        })
    }

    async fn write_fallback(&self, event: &ActivityEvent) -> Result<Vec<Suggestion>, AppError> {
        let rows = NewSuggestion::from_candidates(
            event.activity_id,
            &event.user_id,
            &rule_based_suggestions(event),
            SuggestionSource::Fallback,
        );

        let result = self.store.insert_suggestions(rows).await;
        if let Err(e) = &result {
            tracing::warn!(
                activity_id = event.activity_id,
                error = %e,
                "Fallback suggestions not written"
            );
        }
        result
    }

    async fn publish(&self, event: &ActivityEvent) -> bool {
        match self.publisher.publish(event).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    activity_id = event.activity_id,
                    error = %e,
                    "Activity event not published"
                );
                false
            }
        }
    }
}
