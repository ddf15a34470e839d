// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Suggestion worker
//!
//! Receives activity events from Cloud Tasks, refines their suggestions, and
//! updates daily gamification stats. Listens on `PORT` (8081 when unset, so
//! it can run next to the API server locally).

use carbon_tracker::{
    config::Config,
    db::{FirestoreDb, RecordStore},
    logging::init_logging,
    services::{GeminiClient, SuggestionGenerator, SuggestionWorker, TextGenerator},
    WorkerState,
};
use std::sync::Arc;

const DEFAULT_WORKER_PORT: u16 = 8081;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = Config::from_env().expect("Failed to load configuration");
    let port = if std::env::var("PORT").is_ok() {
        config.port
    } else {
        DEFAULT_WORKER_PORT
    };
    tracing::info!(
        port,
        max_attempts = config.worker_max_attempts,
        "Starting suggestion worker"
    );

    let store: Arc<dyn RecordStore> = Arc::new(
        FirestoreDb::new(&config.gcp_project_id)
            .await
            .expect("Failed to connect to Firestore"),
    );

    let remote = GeminiClient::from_config(&config).map(|c| Arc::new(c) as Arc<dyn TextGenerator>);
    tracing::info!(
        ai = remote.is_some(),
        model = %config.gemini_model,
        "Suggestion generator ready"
    );

    let worker = SuggestionWorker::new(
        store,
        SuggestionGenerator::new(remote),
        config.worker_max_attempts,
    );

    let state = Arc::new(WorkerState {
        config: config.clone(),
        worker,
    });

    let app = carbon_tracker::routes::create_worker_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Worker listening");

    axum::serve(listener, app).await?;
    Ok(())
}
