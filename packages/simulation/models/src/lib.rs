#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Types shared between the simulation engine, persistence, and the API.
//!
//! Everything here is plain data. The strategy table, summarizer, and
//! engine that produce these values live in `eco_blocks_simulation`.

use eco_blocks_block_models::{DensityLabel, TrafficLabel};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Number of daily values in each forecast series.
pub const FORECAST_DAYS: usize = 7;

/// One row of the static intervention strategy table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterventionStrategy {
    /// Display name, also the lookup key.
    pub name: &'static str,
    /// Fraction of the current AQI removed before the density multiplier,
    /// in `(0, 1]`.
    pub reduction_rate: f64,
    /// Installed cost in USD.
    pub unit_cost: u32,
}

/// Whether a weekly summary describes a past week or the current one.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum TrendTag {
    /// An earlier week.
    Past,
    /// The most recent week.
    Current,
}

/// Mean of one week of a daily series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
    /// 1-based week position.
    pub week_index: u8,
    /// Mean of the week's values, rounded to the nearest integer.
    pub average_value: f64,
    /// `Current` for the last emitted week.
    pub trend_tag: TrendTag,
}

/// Fixed-shape narrative shown with a simulation result.
///
/// Either all four fields come from the narrative generator or all four
/// come from the deterministic fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeBlock {
    /// One-line headline.
    pub headline: String,
    /// Short paragraph describing the projected impact.
    pub content: String,
    /// Technical description of the intervention.
    pub tech_specs: String,
    /// Suggested next step.
    pub recommendation: String,
}

/// Seven-day projections following an intervention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    /// Daily AQI values.
    pub aqi: Vec<f64>,
    /// Daily mean traffic speed in km/h.
    pub traffic: Vec<f64>,
}

/// Everything the engine needs to simulate one intervention.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationInput {
    /// Human-readable location used in the narrative prompt.
    pub location: String,
    /// Requested intervention name.
    pub intervention: String,
    /// Current AQI at the block.
    pub current_aqi: f64,
    /// Building density of the block.
    pub density: DensityLabel,
    /// Area classification of the block, when known.
    pub area_type: Option<String>,
    /// Current traffic label, when known.
    pub traffic: Option<TrafficLabel>,
    /// Current traffic speed in km/h, when known.
    pub traffic_speed: Option<f64>,
    /// Raw daily AQI history, oldest first. May be empty.
    pub aqi_history: Vec<f64>,
    /// Raw daily traffic speed history, oldest first. May be empty.
    pub traffic_history: Vec<f64>,
}

/// Outcome of a simulation, computed once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    /// Strategy actually applied (the default when the request named an
    /// unknown intervention).
    pub strategy: String,
    /// Projected AQI after the intervention.
    pub new_aqi: f64,
    /// AQI points removed, to one decimal.
    pub reduction_amount: f64,
    /// Credits earned, `floor(reduction_amount * 10)`.
    pub credits_earned: u32,
    /// Installed cost in USD.
    pub estimated_cost: u32,
    /// Narrative block.
    pub narrative: NarrativeBlock,
    /// Seven-day forecasts.
    pub forecast: Forecast,
    /// `true` when the narrative and forecast came from the deterministic
    /// fallback.
    pub is_fallback_narrative: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekly_summary_serializes_camel_case() {
        let summary = WeeklySummary {
            week_index: 4,
            average_value: 80.0,
            trend_tag: TrendTag::Current,
        };
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "weekIndex": 4, "averageValue": 80.0, "trendTag": "Current" })
        );
    }

    #[test]
    fn narrative_round_trips_with_camel_case_keys() {
        let json = serde_json::json!({
            "headline": "h",
            "content": "c",
            "techSpecs": "t",
            "recommendation": "r"
        });
        let block: NarrativeBlock = serde_json::from_value(json).unwrap();
        assert_eq!(block.tech_specs, "t");
    }
}
