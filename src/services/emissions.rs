// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Emission estimation with a bounded LRU cache.
//!
//! Travel and electricity are priced by Climatiq when an API key is
//! configured, falling back to local factors on any remote failure. Food is
//! always priced locally. Every result is cached by its exact inputs.

use crate::config::Config;
use crate::models::{ActivityKind, CalculationSource, FoodCategory, NewActivity, TravelMode};
use crate::services::climatiq::{ClimatiqClient, EstimateRequest};
use moka::policy::EvictionPolicy;
use moka::sync::Cache;

/// kg CO2e per kWh of grid electricity.
const ELECTRICITY_KG_PER_KWH: f64 = 0.7;

/// kg CO2e per km for each travel mode.
pub fn travel_factor(mode: TravelMode) -> f64 {
    match mode {
        TravelMode::Car => 0.17,
        TravelMode::Bus => 0.06,
        TravelMode::Train => 0.041,
        TravelMode::Bicycle => 0.0,
        TravelMode::Motorbike => 0.11,
        TravelMode::Walk => 0.0,
    }
}

/// kg CO2e per meal for each food category.
pub fn food_factor(category: FoodCategory) -> f64 {
    match category {
        FoodCategory::Veg => 2.0,
        FoodCategory::Chicken => 6.0,
        FoodCategory::Beef => 27.0,
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EstimateError {
    #[error("Unsupported travel mode: {0}")]
    UnsupportedMode(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field {0} must be a non-negative number")]
    InvalidValue(&'static str),
}

/// An emission estimate and where it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub co2_kg: f64,
    pub source: CalculationSource,
}

impl Estimate {
    fn local(co2_kg: f64) -> Self {
        Self {
            co2_kg,
            source: CalculationSource::LocalFactors,
        }
    }
}

/// Exact inputs of an estimate; floats are keyed by their bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum EstimateKey {
    Travel(String, u64),
    Electricity(u64),
    Food(FoodCategory),
}

/// Emission estimator owning its cache and optional remote client.
pub struct EmissionEstimator {
    remote: Option<ClimatiqClient>,
    cache: Cache<EstimateKey, Estimate>,
}

impl EmissionEstimator {
    pub fn new(cache_capacity: u64, remote: Option<ClimatiqClient>) -> Self {
        let cache = Cache::builder()
            .max_capacity(cache_capacity)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self { remote, cache }
    }

    /// Build from config, enabling Climatiq only when an API key is set.
    pub fn from_config(config: &Config) -> Self {
        let remote = config.climatiq_api_key.as_deref().and_then(|key| {
            match ClimatiqClient::new(&config.climatiq_url, key, config.remote_timeout) {
                Ok(client) => Some(client),
                Err(e) => {
                    tracing::warn!(error = %e, "Climatiq client unavailable, using local factors");
                    None
                }
            }
        });

        tracing::info!(
            remote = remote.is_some(),
            capacity = config.estimate_cache_capacity,
            "Emission estimator ready"
        );

        Self::new(config.estimate_cache_capacity, remote)
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Estimate a submitted activity according to its kind.
    pub async fn estimate(&self, activity: &NewActivity) -> Result<Estimate, EstimateError> {
        match activity.kind {
            ActivityKind::Travel => {
                let distance_km = activity
                    .distance_km
                    .ok_or(EstimateError::MissingField("distance_km"))?;
                self.estimate_travel(activity.mode.as_deref(), distance_km)
                    .await
            }
            ActivityKind::Electricity => {
                let kwh = activity.kwh.ok_or(EstimateError::MissingField("kwh"))?;
                self.estimate_electricity(kwh).await
            }
            ActivityKind::Food => Ok(self.estimate_food(activity.food_category.as_deref())),
        }
    }

    /// Estimate a trip. A missing mode is treated as car.
    pub async fn estimate_travel(
        &self,
        mode: Option<&str>,
        distance_km: f64,
    ) -> Result<Estimate, EstimateError> {
        check_non_negative("distance_km", distance_km)?;

        let raw = mode.map(|m| m.trim().to_ascii_lowercase());
        let parsed = match raw.as_deref() {
            None | Some("") => Some(TravelMode::Car),
            Some(m) => TravelMode::parse(m),
        };

        let (key_mode, priced_as) = match parsed {
            Some(m) => (format!("{:?}", m), m),
            None if self.remote.is_some() => (raw.unwrap_or_default(), TravelMode::Car),
            None => {
                return Err(EstimateError::UnsupportedMode(
                    mode.unwrap_or_default().to_string(),
                ))
            }
        };

        let key = EstimateKey::Travel(key_mode, distance_km.to_bits());
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let local = distance_km * travel_factor(priced_as);
        let estimate = if priced_as.is_zero_emission() {
            Estimate::local(local)
        } else {
            self.remote_or_local(
                EstimateRequest::Travel {
                    mode: priced_as,
                    distance_km,
                },
                local,
            )
            .await
        };

        self.cache.insert(key, estimate);
        Ok(estimate)
    }

    /// Estimate grid electricity use.
    pub async fn estimate_electricity(&self, kwh: f64) -> Result<Estimate, EstimateError> {
        check_non_negative("kwh", kwh)?;

        let key = EstimateKey::Electricity(kwh.to_bits());
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let estimate = self
            .remote_or_local(
                EstimateRequest::Electricity { kwh },
                kwh * ELECTRICITY_KG_PER_KWH,
            )
            .await;

        self.cache.insert(key, estimate);
        Ok(estimate)
    }

    /// Estimate one meal. Unknown or missing categories count as veg.
    pub fn estimate_food(&self, category: Option<&str>) -> Estimate {
        let category = FoodCategory::parse_or_default(category);
        self.cache
            .get_with(EstimateKey::Food(category), || {
                Estimate::local(food_factor(category))
            })
    }

    /// Number of cached estimates after pending evictions are applied.
    pub fn cached_entries(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    async fn remote_or_local(&self, request: EstimateRequest, local: f64) -> Estimate {
        let Some(remote) = &self.remote else {
            return Estimate::local(local);
        };

        match remote.estimate(&request).await {
            Ok(co2_kg) => Estimate {
                co2_kg,
                source: CalculationSource::Climatiq,
            },
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    activity_id = request.activity_id(),
                    "Climatiq estimate failed, using local factors"
                );
                Estimate::local(local)
            }
        }
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), EstimateError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EstimateError::InvalidValue(field))
    }
}

/// Round to 4 decimal places for storage.
pub fn round_kg(co2_kg: f64) -> f64 {
    (co2_kg * 10_000.0).round() / 10_000.0
}
