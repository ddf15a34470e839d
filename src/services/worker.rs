// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Suggestion worker: the asynchronous half of the pipeline.
//!
//! Each delivery moves `Processing → {Acked, Retrying, DeadLettered}`:
//! - malformed payloads are dead-lettered on the first attempt
//! - storage failures are retried until the attempt budget is spent, then
//!   dead-lettered
//!
//! Only one delivery is processed at a time per worker.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::RecordStore;
use crate::error::AppError;
use crate::models::{
    ActivityEvent, DeadLetter, DeadLetterReason, NewSuggestion, UserContext,
};
use crate::services::gamification::GamificationAggregator;
use crate::services::suggestions::SuggestionGenerator;

/// One delivery from the queue.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub body: Vec<u8>,
    /// Previous attempts for this task (0 on first delivery)
    pub retry_count: u32,
}

impl Delivery {
    /// Attempt number of this delivery, starting at 1.
    pub fn attempt(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }
}

/// Final state of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Processed; remove from the queue.
    Acked,
    /// Failed; leave on the queue for redelivery.
    Retrying,
    /// Given up; recorded and removed from the queue.
    DeadLettered,
}

impl Disposition {
    /// Whether the queue should consider the delivery done.
    pub fn acknowledges(&self) -> bool {
        !matches!(self, Disposition::Retrying)
    }
}

pub struct SuggestionWorker {
    store: Arc<dyn RecordStore>,
    generator: SuggestionGenerator,
    aggregator: GamificationAggregator,
    max_attempts: u32,
    in_flight: Mutex<()>,
}

impl SuggestionWorker {
    pub fn new(
        store: Arc<dyn RecordStore>,
        generator: SuggestionGenerator,
        max_attempts: u32,
    ) -> Self {
        Self {
            aggregator: GamificationAggregator::new(store.clone()),
            store,
            generator,
            max_attempts: max_attempts.max(1),
            in_flight: Mutex::new(()),
        }
    }

    /// Process one delivery and decide its fate.
    pub async fn handle(&self, delivery: Delivery) -> Disposition {
        let _guard = self.in_flight.lock().await;

        let event: ActivityEvent = match serde_json::from_slice(&delivery.body) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    attempt = delivery.attempt(),
                    error = %e,
                    "Malformed activity event"
                );
                return self
                    .dead_letter(&delivery, None, DeadLetterReason::MalformedPayload, e.to_string())
                    .await;
            }
        };

        match self.process(&event).await {
            Ok(()) => {
                tracing::info!(
                    activity_id = event.activity_id,
                    user_id = %event.user_id,
                    attempt = delivery.attempt(),
                    "Activity event processed"
                );
                Disposition::Acked
            }
            Err(e) if self.has_attempts_left(&delivery) => {
                tracing::warn!(
                    activity_id = event.activity_id,
                    attempt = delivery.attempt(),
                    max_attempts = self.max_attempts,
                    error = %e,
                    "Activity event failed, will retry"
                );
                Disposition::Retrying
            }
            Err(e) => {
                tracing::error!(
                    activity_id = event.activity_id,
                    attempt = delivery.attempt(),
                    error = %e,
                    "Activity event failed on final attempt"
                );
                self.dead_letter(
                    &delivery,
                    Some(event.activity_id),
                    DeadLetterReason::RetriesExhausted,
                    e.to_string(),
                )
                .await
            }
        }
    }

    /// Regenerate, reconcile, aggregate.
    async fn process(&self, event: &ActivityEvent) -> Result<(), AppError> {
        let context = self.context_for(event).await;
        let (candidates, source) = self.generator.suggestions_for(event, &context).await;

        let rows =
            NewSuggestion::from_candidates(event.activity_id, &event.user_id, &candidates, source);
        let stored = self.store.replace_suggestions(event.activity_id, rows).await?;

        tracing::debug!(
            activity_id = event.activity_id,
            source = source.as_str(),
            count = stored.len(),
            "Suggestions reconciled"
        );

        self.aggregator
            .update_for(&event.user_id, event.created_at.date_naive())
            .await?;

        Ok(())
    }

    /// User context for the AI prompt. Only read when AI is enabled.
    async fn context_for(&self, event: &ActivityEvent) -> UserContext {
        if !self.generator.has_remote() {
            return UserContext::default();
        }

        match self
            .aggregator
            .user_context(&event.user_id, chrono::Utc::now())
            .await
        {
            Ok(context) => context,
            Err(e) => {
                tracing::warn!(
                    user_id = %event.user_id,
                    error = %e,
                    "User context unavailable, prompting without it"
                );
                UserContext::default()
            }
        }
    }

    fn has_attempts_left(&self, delivery: &Delivery) -> bool {
        delivery.attempt() < self.max_attempts
    }

    async fn dead_letter(
        &self,
        delivery: &Delivery,
        activity_id: Option<u64>,
        reason: DeadLetterReason,
        error: String,
    ) -> Disposition {
        let letter = DeadLetter::new(
            activity_id,
            String::from_utf8_lossy(&delivery.body).into_owned(),
            reason,
            error,
            delivery.attempt(),
            chrono::Utc::now(),
        );

        match self.store.record_dead_letter(&letter).await {
            Ok(()) => {
                tracing::warn!(
                    activity_id,
                    reason = ?reason,
                    attempts = letter.attempts,
                    "Activity event dead-lettered"
                );
                Disposition::DeadLettered
            }
            // Keep the delivery on the queue while there is budget to record it later.
            Err(e) if self.has_attempts_left(delivery) => {
                tracing::warn!(
                    activity_id,
                    error = %e,
                    "Dead letter not recorded, will retry"
                );
                Disposition::Retrying
            }
            Err(e) => {
                tracing::error!(
                    activity_id,
                    payload = %letter.payload,
                    error = %e,
                    "Dead letter not recorded, dropping event"
                );
                Disposition::DeadLettered
            }
        }
    }
}
