// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Carbon Tracker: log everyday activities, estimate their emissions, and
//! suggest how to cut them.
//!
//! The API server records activities and answers immediately with rule-based
//! suggestions. Each activity is also sent through Cloud Tasks to the
//! suggestion worker, which refines the suggestions and updates the user's
//! daily points and streak.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::RecordStore;
use services::{EventProducer, SuggestionWorker};
use std::sync::Arc;

/// Shared state of the API server.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn RecordStore>,
    pub producer: EventProducer,
}

/// Shared state of the suggestion worker.
pub struct WorkerState {
    pub config: Config,
    pub worker: SuggestionWorker,
}
