// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Queue-facing behaviour of the worker's task handler.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use carbon_tracker::db::{RecordStore, StoreOp};
use carbon_tracker::models::{ActivityKind, DeadLetterReason};
use serde_json::json;
use tower::ServiceExt;

mod common;

const QUEUE_HEADER: &str = "x-cloudtasks-queuename";
const RETRY_HEADER: &str = "x-cloudtasks-taskretrycount";

fn task_request(body: String, queue: Option<&str>, retry_count: Option<u32>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/tasks/process-activity")
        .header("content-type", "application/json");
    if let Some(queue) = queue {
        builder = builder.header(QUEUE_HEADER, queue);
    }
    if let Some(count) = retry_count {
        builder = builder.header(RETRY_HEADER, count.to_string());
    }
    builder.body(Body::from(body)).unwrap()
}

fn event_body(activity_id: u64) -> String {
    json!({
        "activity_id": activity_id,
        "user_id": "alice",
        "type": "travel",
        "mode": "bus",
        "distance_km": 12.0,
        "kwh": null,
        "co2_kg": 0.72,
        "created_at": "2024-01-15T10:30:00Z"
    })
    .to_string()
}

#[tokio::test]
async fn test_process_activity_no_header_forbidden() {
    let worker = common::create_test_worker(5, None);

    let response = worker
        .router
        .oneshot(task_request(event_body(1), None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(worker.store.suggestions_for_activity(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_process_activity_wrong_queue_forbidden() {
    let worker = common::create_test_worker(5, None);

    let response = worker
        .router
        .oneshot(task_request(event_body(1), Some("some-other-queue"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_process_activity_with_header_acked() {
    let worker = common::create_test_worker(5, None);

    let response = worker
        .router
        .oneshot(task_request(event_body(7), Some("activity-suggestions"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let rows = worker.store.suggestions_for_activity(7).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].text.starts_with("Public transport"));
    assert!(worker.store.dead_letters().is_empty());
}

#[tokio::test]
async fn test_malformed_payload_dead_lettered_immediately() {
    let worker = common::create_test_worker(5, None);

    let response = worker
        .router
        .oneshot(task_request(
            "{\"activity_id\": \"not-a-number\"".to_string(),
            Some("activity-suggestions"),
            Some(0),
        ))
        .await
        .unwrap();

    // Acknowledged so the queue stops redelivering it
    assert_eq!(response.status(), StatusCode::OK);

    let letters = worker.store.dead_letters();
    assert_eq!(letters.len(), 1);
    assert_eq!(letters[0].reason, DeadLetterReason::MalformedPayload);
    assert_eq!(letters[0].activity_id, None);
    assert_eq!(letters[0].attempts, 1);
    assert!(letters[0].payload.contains("not-a-number"));
}

#[tokio::test]
async fn test_storage_failure_requests_retry() {
    let worker = common::create_test_worker(5, None);
    worker.store.set_failing(StoreOp::ReplaceSuggestions, true);

    let response = worker
        .router
        .oneshot(task_request(event_body(3), Some("activity-suggestions"), Some(0)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(worker.store.dead_letters().is_empty());
}

#[tokio::test]
async fn test_final_attempt_dead_lettered() {
    let worker = common::create_test_worker(5, None);
    worker.store.set_failing(StoreOp::ReplaceSuggestions, true);

    let response = worker
        .router
        .oneshot(task_request(event_body(3), Some("activity-suggestions"), Some(4)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let letters = worker.store.dead_letters();
    assert_eq!(letters.len(), 1);
    assert_eq!(letters[0].reason, DeadLetterReason::RetriesExhausted);
    assert_eq!(letters[0].activity_id, Some(3));
    assert_eq!(letters[0].attempts, 5);
}

#[tokio::test]
async fn test_dead_letter_write_failure_retries_while_budget_remains() {
    let worker = common::create_test_worker(5, None);
    worker.store.set_failing(StoreOp::RecordDeadLetter, true);

    let response = worker
        .router
        .clone()
        .oneshot(task_request(
            "garbage".to_string(),
            Some("activity-suggestions"),
            Some(1),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // Out of budget: dropped with an error log rather than redelivered forever
    let response = worker
        .router
        .oneshot(task_request(
            "garbage".to_string(),
            Some("activity-suggestions"),
            Some(4),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(worker.store.dead_letters().is_empty());
}

#[tokio::test]
async fn test_stats_written_for_event_day() {
    let worker = common::create_test_worker(5, None);
    worker.store.seed_activity(common::draft(
        "alice",
        ActivityKind::Travel,
        0.72,
        "2024-01-15T10:30:00Z",
    ));

    let response = worker
        .router
        .oneshot(task_request(event_body(1), Some("activity-suggestions"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let day = chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    let row = worker.store.get_user_stats("alice", day).await.unwrap().unwrap();
    assert_eq!(row.daily_co2_kg, 0.72);
    assert_eq!(row.points, 10);
    assert_eq!(row.streak, 1);
}
