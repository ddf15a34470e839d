// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Task handler routes for Cloud Tasks callbacks.
//!
//! These endpoints are called by Cloud Tasks, not directly by users. The
//! status code tells Cloud Tasks what to do: 2xx removes the task, anything
//! else schedules a retry.

use crate::middleware::tasks_auth::require_queue_header;
use crate::services::tasks::PROCESS_ACTIVITY_PATH;
use crate::services::worker::{Delivery, Disposition};
use crate::WorkerState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware,
    routing::post,
    Router,
};
use std::sync::Arc;

/// Header carrying the number of previous attempts for this task.
const RETRY_COUNT_HEADER: &str = "x-cloudtasks-taskretrycount";

/// Task handler routes (called by Cloud Tasks).
pub fn routes() -> Router<Arc<WorkerState>> {
    Router::new()
        .route(PROCESS_ACTIVITY_PATH, post(process_activity))
        .route_layer(middleware::from_fn(require_queue_header))
}

fn retry_count(headers: &HeaderMap) -> u32 {
    headers
        .get(RETRY_COUNT_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

/// Process one activity event.
///
/// The body is taken raw so malformed payloads reach the worker and get
/// dead-lettered instead of being rejected with a 4xx and retried.
async fn process_activity(
    State(state): State<Arc<WorkerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let delivery = Delivery {
        body: body.to_vec(),
        retry_count: retry_count(&headers),
    };

    match state.worker.handle(delivery).await {
        Disposition::Acked | Disposition::DeadLettered => StatusCode::OK,
        // Return 500 to trigger Cloud Tasks retry
        Disposition::Retrying => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
