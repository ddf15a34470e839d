// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

#![allow(dead_code)]

use async_trait::async_trait;
use carbon_tracker::config::Config;
use carbon_tracker::db::{FirestoreDb, MemoryStore, RecordStore};
use carbon_tracker::error::AppError;
use carbon_tracker::models::{ActivityDraft, ActivityEvent, ActivityKind, CalculationSource};
use carbon_tracker::routes::{create_router, create_worker_router};
use carbon_tracker::services::{
    EmissionEstimator, EventProducer, EventPublisher, GenerationError, SuggestionGenerator,
    SuggestionWorker, TextGenerator,
};
use carbon_tracker::{AppState, WorkerState};
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Publisher that records events instead of calling Cloud Tasks.
#[derive(Default)]
pub struct RecordingPublisher {
    pub events: Mutex<Vec<ActivityEvent>>,
    pub fail: bool,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn published(&self) -> Vec<ActivityEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &ActivityEvent) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::Queue("queue unreachable".to_string()));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Text generator that always returns the same reply.
pub struct StaticGenerator(pub String);

#[async_trait]
impl TextGenerator for StaticGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Ok(self.0.clone())
    }
}

/// API server wired to in-memory dependencies.
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub publisher: Arc<RecordingPublisher>,
}

pub fn create_test_app_with(publisher: RecordingPublisher) -> TestApp {
    let config = Config::test_default();
    let store = Arc::new(MemoryStore::new());
    let publisher = Arc::new(publisher);
    let estimator = Arc::new(EmissionEstimator::new(config.estimate_cache_capacity, None));

    let producer = EventProducer::new(store.clone(), estimator, publisher.clone());
    let state = Arc::new(AppState {
        config,
        store: store.clone(),
        producer,
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        publisher,
    }
}

pub fn create_test_app() -> TestApp {
    create_test_app_with(RecordingPublisher::default())
}

/// Worker wired to an in-memory store.
pub struct TestWorker {
    pub router: axum::Router,
    pub state: Arc<WorkerState>,
    pub store: Arc<MemoryStore>,
}

pub fn create_test_worker(max_attempts: u32, ai_reply: Option<&str>) -> TestWorker {
    create_test_worker_on(Arc::new(MemoryStore::new()), max_attempts, ai_reply)
}

pub fn create_test_worker_on(
    store: Arc<MemoryStore>,
    max_attempts: u32,
    ai_reply: Option<&str>,
) -> TestWorker {
    let mut config = Config::test_default();
    config.worker_max_attempts = max_attempts;

    let remote = ai_reply
        .map(|reply| Arc::new(StaticGenerator(reply.to_string())) as Arc<dyn TextGenerator>);
    let record_store: Arc<dyn RecordStore> = store.clone();
    let worker = SuggestionWorker::new(
        record_store,
        SuggestionGenerator::new(remote),
        max_attempts,
    );

    let state = Arc::new(WorkerState { config, worker });

    TestWorker {
        router: create_worker_router(state.clone()),
        state,
        store,
    }
}

/// A stored-activity draft with a fixed timestamp.
pub fn draft(user_id: &str, kind: ActivityKind, co2_kg: f64, created_at: &str) -> ActivityDraft {
    ActivityDraft {
        user_id: user_id.to_string(),
        kind,
        mode: (kind == ActivityKind::Travel).then(|| "car".to_string()),
        distance_km: (kind == ActivityKind::Travel).then_some(co2_kg / 0.17),
        kwh: (kind == ActivityKind::Electricity).then_some(co2_kg / 0.7),
        food_category: None,
        co2_kg,
        calculation_source: CalculationSource::LocalFactors,
        created_at: created_at.to_string(),
    }
}

/// Read a response body as JSON.
pub async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
