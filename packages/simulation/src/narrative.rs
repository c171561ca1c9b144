//! Prompt construction and strict parsing of generator output.
//!
//! The generator must answer with a single JSON object:
//!
//! ```json
//! {
//!   "headline": "...",
//!   "content": "...",
//!   "techSpecs": "...",
//!   "recommendation": "...",
//!   "aqiForecast": [7 numbers],
//!   "trafficForecast": [7 numbers]
//! }
//! ```
//!
//! Parsing is all-or-nothing: a missing or blank field, a forecast of the
//! wrong length, or a non-numeric value rejects the whole response.

use std::fmt::Write as _;

use eco_blocks_simulation_models::{
    FORECAST_DAYS, Forecast, NarrativeBlock, SimulationInput, WeeklySummary,
};
use serde::Deserialize;
use thiserror::Error;

/// System prompt describing the output contract.
pub const SYSTEM_PROMPT: &str = "You are an urban air-quality analyst. \
Respond with exactly one JSON object and nothing else, using these keys: \
\"headline\" (one line), \"content\" (two or three sentences), \
\"techSpecs\" (one sentence describing the hardware), \
\"recommendation\" (one sentence), \
\"aqiForecast\" (array of exactly 7 numbers, daily AQI after installation), \
\"trafficForecast\" (array of exactly 7 numbers, daily mean traffic speed in km/h).";

/// The generator's output did not satisfy the contract.
#[derive(Debug, Error)]
pub enum ContractViolation {
    /// No JSON object could be located in the text.
    #[error("no JSON object in generator output")]
    NoObject,

    /// The object did not deserialize into the expected shape.
    #[error("malformed generator output: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A narrative field was blank.
    #[error("generator left '{field}' empty")]
    EmptyField {
        /// JSON key of the blank field.
        field: &'static str,
    },

    /// A forecast had the wrong length or a non-finite value.
    #[error("generator '{field}' must hold 7 finite numbers, got {len} values")]
    BadForecast {
        /// JSON key of the offending forecast.
        field: &'static str,
        /// Number of values received.
        len: usize,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNarrative {
    headline: String,
    content: String,
    tech_specs: String,
    recommendation: String,
    aqi_forecast: Vec<f64>,
    traffic_forecast: Vec<f64>,
}

/// Builds the user prompt for one simulation.
#[must_use]
pub fn build_prompt(
    input: &SimulationInput,
    strategy: &str,
    new_aqi: f64,
    aqi_summary: &[WeeklySummary],
    traffic_summary: &[WeeklySummary],
) -> String {
    let mut prompt = format!(
        "Location: {}\nIntervention: {strategy}\nCurrent AQI: {:.1}\nTarget AQI after installation: {new_aqi:.1}\nBuilding density: {}\n",
        input.location, input.current_aqi, input.density,
    );
    if let Some(area) = &input.area_type {
        let _ = writeln!(prompt, "Area type: {area}");
    }

    prompt.push_str("Weekly AQI averages (oldest first):\n");
    write_summaries(&mut prompt, aqi_summary);
    prompt.push_str("Weekly traffic speed averages in km/h (oldest first):\n");
    write_summaries(&mut prompt, traffic_summary);

    prompt.push_str(
        "Describe the projected impact of this intervention and forecast the next 7 days.",
    );
    prompt
}

fn write_summaries(prompt: &mut String, summaries: &[WeeklySummary]) {
    if summaries.is_empty() {
        prompt.push_str("- no data\n");
    }
    for s in summaries {
        let _ = writeln!(
            prompt,
            "- week {} ({}): {}",
            s.week_index, s.trend_tag, s.average_value
        );
    }
}

/// Parses generator text into a narrative and forecast.
///
/// Accepts the object bare or wrapped in a markdown code fence, with
/// surrounding prose ignored.
///
/// # Errors
///
/// Returns [`ContractViolation`] if any part of the contract is unmet.
pub fn parse(text: &str) -> Result<(NarrativeBlock, Forecast), ContractViolation> {
    let raw: RawNarrative = serde_json::from_str(extract_object(text)?)?;

    for (field, value) in [
        ("headline", &raw.headline),
        ("content", &raw.content),
        ("techSpecs", &raw.tech_specs),
        ("recommendation", &raw.recommendation),
    ] {
        if value.trim().is_empty() {
            return Err(ContractViolation::EmptyField { field });
        }
    }

    for (field, values) in [
        ("aqiForecast", &raw.aqi_forecast),
        ("trafficForecast", &raw.traffic_forecast),
    ] {
        if values.len() != FORECAST_DAYS || !values.iter().all(|v| v.is_finite()) {
            return Err(ContractViolation::BadForecast {
                field,
                len: values.len(),
            });
        }
    }

    Ok((
        NarrativeBlock {
            headline: raw.headline.trim().to_string(),
            content: raw.content.trim().to_string(),
            tech_specs: raw.tech_specs.trim().to_string(),
            recommendation: raw.recommendation.trim().to_string(),
        },
        Forecast {
            aqi: raw.aqi_forecast,
            traffic: raw.traffic_forecast,
        },
    ))
}

/// Returns the outermost `{...}` span of `text`.
fn extract_object(text: &str) -> Result<&str, ContractViolation> {
    let start = text.find('{').ok_or(ContractViolation::NoObject)?;
    let end = text.rfind('}').ok_or(ContractViolation::NoObject)?;
    if end < start {
        return Err(ContractViolation::NoObject);
    }
    Ok(&text[start..=end])
}
