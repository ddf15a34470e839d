// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Climatiq API client for remote emission estimates.

use crate::models::TravelMode;
use std::time::Duration;

/// Failure talking to a remote pricing service.
///
/// Callers always recover from these by falling back to local factors.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response missing numeric `{0}`")]
    MissingField(&'static str),
}

/// What to price, with the parameters Climatiq expects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EstimateRequest {
    Travel { mode: TravelMode, distance_km: f64 },
    Electricity { kwh: f64 },
}

impl EstimateRequest {
    /// Climatiq emission factor ID for this request.
    pub fn activity_id(&self) -> &'static str {
        match self {
            EstimateRequest::Travel { mode, .. } => match mode {
                TravelMode::Bus => "passenger_vehicle-vehicle_type_bus-fuel_source_na-distance_km",
                TravelMode::Train => "passenger_train-route_type_na-fuel_source_na",
                TravelMode::Motorbike => {
                    "passenger_vehicle-vehicle_type_motorbike-fuel_source_na-engine_size_na-distance_km"
                }
                // Zero-emission modes never reach the remote service.
                TravelMode::Car | TravelMode::Bicycle | TravelMode::Walk => {
                    "passenger_vehicle-vehicle_type_car-fuel_source_petrol-distance_km"
                }
            },
            EstimateRequest::Electricity { .. } => "electricity-energy_source_grid_mix-energy_unit_kwh",
        }
    }

    /// Canonical request body.
    pub fn body(&self) -> serde_json::Value {
        let parameters = match self {
            EstimateRequest::Travel { distance_km, .. } => serde_json::json!({
                "distance": distance_km,
                "distance_unit": "km",
            }),
            EstimateRequest::Electricity { kwh } => serde_json::json!({
                "energy": kwh,
                "energy_unit": "kWh",
            }),
        };

        serde_json::json!({
            "emission_factor": {
                "activity_id": self.activity_id(),
                "data_version": "^0",
            },
            "parameters": parameters,
        })
    }
}

/// Climatiq API client.
#[derive(Clone)]
pub struct ClimatiqClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl ClimatiqClient {
    /// Create a client; `timeout` bounds each whole request.
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            url: url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Price one request, returning kg CO2e.
    pub async fn estimate(&self, request: &EstimateRequest) -> Result<f64, RemoteError> {
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request.body())
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        co2e_from_response(&json)
    }
}

/// Pull the numeric `co2e` field out of an estimate response.
pub fn co2e_from_response(json: &serde_json::Value) -> Result<f64, RemoteError> {
    json.get("co2e")
        .and_then(serde_json::Value::as_f64)
        .ok_or(RemoteError::MissingField("co2e"))
}
