// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Carbon Tracker API Server
//!
//! Records activities, estimates their emissions, and hands each one to the
//! suggestion worker through Cloud Tasks.

use carbon_tracker::{
    config::Config,
    db::{FirestoreDb, RecordStore},
    logging::init_logging,
    services::{EmissionEstimator, EventProducer, TasksService},
    AppState,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Carbon Tracker API");

    // Initialize Firestore database
    let store: Arc<dyn RecordStore> = Arc::new(
        FirestoreDb::new(&config.gcp_project_id)
            .await
            .expect("Failed to connect to Firestore"),
    );

    let estimator = Arc::new(EmissionEstimator::from_config(&config));

    // Initialize Cloud Tasks service
    let tasks_service = Arc::new(TasksService::new(&config));
    tracing::info!(
        project = %config.gcp_project_id,
        target = %tasks_service.target_url(),
        "Cloud Tasks service initialized"
    );

    let producer = EventProducer::new(store.clone(), estimator, tasks_service);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        producer,
    });

    // Build router
    let app = carbon_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
