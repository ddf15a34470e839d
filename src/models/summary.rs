// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Emission summaries over a trailing window.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::Activity;

/// Trailing window for a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum SummaryPeriod {
    #[default]
    Day,
    Week,
    Month,
}

impl SummaryPeriod {
    /// Window length.
    pub fn duration(&self) -> chrono::Duration {
        match self {
            SummaryPeriod::Day => chrono::Duration::days(1),
            SummaryPeriod::Week => chrono::Duration::weeks(1),
            SummaryPeriod::Month => chrono::Duration::days(30),
        }
    }
}

/// Totals for one user over one window.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EmissionSummary {
    pub user_id: String,
    pub period: SummaryPeriod,
    /// Window start (ISO 8601)
    pub start: String,
    pub activity_count: u32,
    pub total_kg: f64,
    pub breakdown_by_type: BTreeMap<String, f64>,
    pub breakdown_by_source: BTreeMap<String, f64>,
}

impl EmissionSummary {
    /// Fold activities already restricted to the window.
    pub fn from_activities(
        user_id: &str,
        period: SummaryPeriod,
        start: String,
        activities: &[Activity],
    ) -> Self {
        let mut summary = Self {
            user_id: user_id.to_string(),
            period,
            start,
            activity_count: 0,
            total_kg: 0.0,
            breakdown_by_type: BTreeMap::new(),
            breakdown_by_source: BTreeMap::new(),
        };

        for activity in activities {
            summary.activity_count += 1;
            summary.total_kg += activity.co2_kg;
            *summary
                .breakdown_by_type
                .entry(activity.kind.to_string())
                .or_insert(0.0) += activity.co2_kg;
            *summary
                .breakdown_by_source
                .entry(activity.calculation_source.as_str().to_string())
                .or_insert(0.0) += activity.co2_kg;
        }

        summary
    }
}
