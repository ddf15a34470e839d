// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod climatiq;
pub mod emissions;
pub mod gamification;
pub mod gemini;
pub mod producer;
pub mod suggestions;
pub mod tasks;
pub mod worker;

pub use climatiq::{ClimatiqClient, RemoteError};
pub use emissions::{EmissionEstimator, Estimate, EstimateError};
pub use gamification::GamificationAggregator;
pub use gemini::{GeminiClient, GenerationError, TextGenerator};
pub use producer::{EventProducer, ProducerOutcome};
pub use suggestions::SuggestionGenerator;
pub use tasks::{EventPublisher, TasksService};
pub use worker::{Delivery, Disposition, SuggestionWorker};
