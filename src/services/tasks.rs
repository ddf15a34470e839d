// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cloud Tasks publisher for activity events.
//!
//! Each event becomes one task on the `activity-suggestions` queue: an HTTP
//! POST of the JSON event to the suggestion worker. Cloud Tasks stores tasks
//! durably and redelivers until the worker answers 2xx.
//!
//! Uses the official google-cloud-tasks-v2 SDK.

use async_trait::async_trait;

use crate::config::Config;
use crate::error::AppError;
use crate::error::Result;
use crate::models::ActivityEvent;

/// Worker endpoint that receives activity events.
pub const PROCESS_ACTIVITY_PATH: &str = "/tasks/process-activity";

/// Durable queue producer side.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Enqueue one event. `Ok` means the queue accepted it.
    async fn publish(&self, event: &ActivityEvent) -> Result<()>;
}

/// Cloud Tasks client wrapper.
pub struct TasksService {
    project_id: String,
    location: String,
    queue_name: String,
    worker_url: String,
    service_account: Option<String>,
}

impl TasksService {
    pub fn new(config: &Config) -> Self {
        Self {
            project_id: config.gcp_project_id.clone(),
            location: config.gcp_region.clone(),
            queue_name: crate::config::ACTIVITY_QUEUE_NAME.to_string(),
            worker_url: config.worker_url.clone(),
            service_account: config.tasks_service_account.clone(),
        }
    }

    /// Full resource name of the queue.
    pub fn queue_path(&self) -> String {
        format!(
            "projects/{}/locations/{}/queues/{}",
            self.project_id, self.location, self.queue_name
        )
    }

    /// Push target for activity events.
    pub fn target_url(&self) -> String {
        format!("{}{}", self.worker_url, PROCESS_ACTIVITY_PATH)
    }
}

#[async_trait]
impl EventPublisher for TasksService {
    async fn publish(&self, event: &ActivityEvent) -> Result<()> {
        use google_cloud_tasks_v2::client::CloudTasks;
        use google_cloud_tasks_v2::model::{HttpRequest, OidcToken, Task};

        let client = CloudTasks::builder()
            .build()
            .await
            .map_err(|e| AppError::Queue(format!("Cloud Tasks client error: {}", e)))?;

        let body = serde_json::to_vec(event)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JSON error: {}", e)))?;

        let mut http_request = HttpRequest::default()
            .set_url(self.target_url())
            .set_http_method("POST")
            .set_body(axum::body::Bytes::from(body))
            .set_headers(std::collections::HashMap::from([(
                "Content-Type".to_string(),
                "application/json".to_string(),
            )]));

        if let Some(account) = &self.service_account {
            http_request = http_request.set_oidc_token(
                OidcToken::default()
                    .set_service_account_email(account.clone())
                    .set_audience(self.worker_url.clone()),
            );
        }

        let task = Task::default().set_http_request(http_request);

        let _response = client
            .create_task()
            .set_parent(self.queue_path())
            .set_task(task)
            .send()
            .await
            .map_err(|e| AppError::Queue(format!("Cloud Tasks create error: {}", e)))?;

        tracing::debug!(
            activity_id = event.activity_id,
            queue = %self.queue_name,
            "Activity event enqueued"
        );

        Ok(())
    }
}
