// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity model for storage, API, and the suggestion queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Kind of carbon-emitting activity a user can log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Travel,
    Electricity,
    Food,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Travel => "travel",
            ActivityKind::Electricity => "electricity",
            ActivityKind::Food => "food",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Travel modes with a known per-km emission factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TravelMode {
    Car,
    Bus,
    Train,
    Bicycle,
    Motorbike,
    Walk,
}

impl TravelMode {
    /// Parse a user-supplied mode name (case-insensitive, common aliases accepted).
    pub fn parse(mode: &str) -> Option<Self> {
        match mode.trim().to_ascii_lowercase().as_str() {
            "car" => Some(TravelMode::Car),
            "bus" => Some(TravelMode::Bus),
            "train" => Some(TravelMode::Train),
            "bicycle" | "bike" | "cycle" => Some(TravelMode::Bicycle),
            "motorbike" => Some(TravelMode::Motorbike),
            "walk" => Some(TravelMode::Walk),
            _ => None,
        }
    }

    /// Whether the mode emits nothing, so no remote pricing is needed.
    pub fn is_zero_emission(&self) -> bool {
        matches!(self, TravelMode::Bicycle | TravelMode::Walk)
    }
}

/// Food categories with a flat per-serving emission factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FoodCategory {
    Veg,
    Chicken,
    Beef,
}

impl FoodCategory {
    /// Parse a category name; unknown or missing categories count as `Veg`.
    pub fn parse_or_default(category: Option<&str>) -> Self {
        match category.map(|c| c.trim().to_ascii_lowercase()).as_deref() {
            Some("chicken") => FoodCategory::Chicken,
            Some("beef") => FoodCategory::Beef,
            _ => FoodCategory::Veg,
        }
    }

    /// Parse a category name exactly, without defaulting.
    pub fn parse(category: &str) -> Option<Self> {
        match category.trim().to_ascii_lowercase().as_str() {
            "veg" => Some(FoodCategory::Veg),
            "chicken" => Some(FoodCategory::Chicken),
            "beef" => Some(FoodCategory::Beef),
            _ => None,
        }
    }
}

/// Where an emission estimate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum CalculationSource {
    Climatiq,
    LocalFactors,
}

impl CalculationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationSource::Climatiq => "climatiq",
            CalculationSource::LocalFactors => "local_factors",
        }
    }
}

/// Activity as submitted by a client, before estimation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewActivity {
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub kwh: Option<f64>,
    #[serde(default)]
    pub food_category: Option<String>,
}

/// Stored activity record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Activity {
    /// Activity ID (also used as document ID)
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    /// Owner
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub mode: Option<String>,
    pub distance_km: Option<f64>,
    pub kwh: Option<f64>,
    pub food_category: Option<String>,
    /// Estimated emissions in kg CO2e
    pub co2_kg: f64,
    pub calculation_source: CalculationSource,
    /// When the activity was logged (RFC3339, UTC)
    pub created_at: String,
}

/// Estimated activity ready to be stored; the store assigns the ID.
#[derive(Debug, Clone)]
pub struct ActivityDraft {
    pub user_id: String,
    pub kind: ActivityKind,
    pub mode: Option<String>,
    pub distance_km: Option<f64>,
    pub kwh: Option<f64>,
    pub food_category: Option<String>,
    pub co2_kg: f64,
    pub calculation_source: CalculationSource,
    pub created_at: String,
}

impl ActivityDraft {
    pub fn into_activity(self, id: u64) -> Activity {
        Activity {
            id,
            user_id: self.user_id,
            kind: self.kind,
            mode: self.mode,
            distance_km: self.distance_km,
            kwh: self.kwh,
            food_category: self.food_category,
            co2_kg: self.co2_kg,
            calculation_source: self.calculation_source,
            created_at: self.created_at,
        }
    }
}

/// Queue payload announcing a persisted activity.
///
/// `food_category` is an optional extension of the wire format; it is omitted
/// when absent and ignored by consumers that do not know it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub activity_id: u64,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub mode: Option<String>,
    pub distance_km: Option<f64>,
    pub kwh: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food_category: Option<String>,
    pub co2_kg: f64,
    /// Serialized as RFC3339 with `Z`; an offset-less ISO 8601 value is read as UTC
    #[serde(deserialize_with = "crate::time_utils::deserialize_utc_lenient")]
    pub created_at: DateTime<Utc>,
}

impl ActivityEvent {
    /// Build the event for a stored activity.
    ///
    /// Returns `None` if the stored timestamp cannot be parsed.
    pub fn from_activity(activity: &Activity) -> Option<Self> {
        let created_at = crate::time_utils::parse_utc_rfc3339(&activity.created_at)?;
        Some(Self {
            activity_id: activity.id,
            user_id: activity.user_id.clone(),
            kind: activity.kind,
            mode: activity.mode.clone(),
            distance_km: activity.distance_km,
            kwh: activity.kwh,
            food_category: activity.food_category.clone(),
            co2_kg: activity.co2_kg,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_travel_mode_aliases() {
        assert_eq!(TravelMode::parse("BIKE"), Some(TravelMode::Bicycle));
        assert_eq!(TravelMode::parse(" cycle "), Some(TravelMode::Bicycle));
        assert_eq!(TravelMode::parse("Car"), Some(TravelMode::Car));
        assert_eq!(TravelMode::parse("rocket"), None);
    }

    #[test]
    fn test_food_category_defaults_to_veg() {
        assert_eq!(FoodCategory::parse_or_default(None), FoodCategory::Veg);
        assert_eq!(FoodCategory::parse_or_default(Some("tofu")), FoodCategory::Veg);
        assert_eq!(FoodCategory::parse_or_default(Some("BEEF")), FoodCategory::Beef);
        assert_eq!(FoodCategory::parse("tofu"), None);
    }

    #[test]
    fn test_event_wire_format() {
        let raw = json!({
            "activity_id": 42,
            "user_id": "alice",
            "type": "electricity",
            "mode": null,
            "distance_km": null,
            "kwh": 8.0,
            "co2_kg": 5.6,
            "created_at": "2024-01-15T10:30:00Z"
        });

        let event: ActivityEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.activity_id, 42);
        assert_eq!(event.kind, ActivityKind::Electricity);
        assert_eq!(event.food_category, None);

        let back = serde_json::to_value(&event).unwrap();
        assert_eq!(back["type"], "electricity");
        assert!(back.get("food_category").is_none());
    }

    #[test]
    fn test_event_accepts_offsetless_timestamp() {
        let raw = json!({
            "activity_id": 42,
            "user_id": "alice",
            "type": "food",
            "mode": null,
            "distance_km": null,
            "kwh": null,
            "co2_kg": 2.0,
            "created_at": "2024-01-15T10:30:00.123456"
        });

        let event: ActivityEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(
            event.created_at,
            chrono::Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
                + chrono::Duration::microseconds(123_456)
        );

        let back = serde_json::to_value(&event).unwrap();
        assert_eq!(back["created_at"], "2024-01-15T10:30:00.123456Z");
    }

    #[test]
    fn test_event_rejects_unparseable_timestamp() {
        let raw = json!({
            "activity_id": 1,
            "user_id": "alice",
            "type": "food",
            "mode": null,
            "distance_km": null,
            "kwh": null,
            "co2_kg": 1.0,
            "created_at": "last tuesday"
        });
        assert!(serde_json::from_value::<ActivityEvent>(raw).is_err());
    }

    #[test]
    fn test_event_rejects_unknown_type() {
        let raw = json!({
            "activity_id": 1,
            "user_id": "alice",
            "type": "shopping",
            "mode": null,
            "distance_km": null,
            "kwh": null,
            "co2_kg": 1.0,
            "created_at": "2024-01-15T10:30:00Z"
        });
        assert!(serde_json::from_value::<ActivityEvent>(raw).is_err());
    }
}
