#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Place-name geocoding for the eco-blocks map search.
//!
//! Resolves a free-form query ("Berlin", "5th Ave, New York") to a list of
//! coordinates using two providers configured via TOML files in
//! `services/`:
//!
//! 1. **Open-Meteo Geocoding** (priority 1): free, no API key, city and
//!    place names.
//! 2. **Nominatim / `OpenStreetMap`** (priority 2): free-form addresses.
//!    Only consulted when the primary returns nothing or fails.
//!
//! [`resolver::GeocodeResolver`] implements the single fallback hop; the
//! provider clients only translate their upstream JSON into [`GeoHit`]s.

pub mod nominatim;
pub mod open_meteo;
pub mod resolver;
pub mod service_registry;

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

pub use resolver::GeocodeResolver;

/// One geocoding match, normalized across providers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoHit {
    /// Latitude (WGS84).
    pub lat: f64,
    /// Longitude (WGS84).
    pub lon: f64,
    /// Human-readable place name.
    pub display_name: String,
    /// Country name, when the provider reports one.
    pub country: Option<String>,
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// The query was empty.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// What was wrong with the query.
        message: String,
    },

    /// Every provider answered, and none had a match.
    #[error("No location found for '{query}'")]
    NotFound {
        /// The query that was searched.
        query: String,
    },

    /// Both providers failed outright.
    #[error("Geocoding providers unavailable (primary: {primary}; fallback: {fallback})")]
    Upstream {
        /// Primary provider failure.
        primary: String,
        /// Fallback provider failure.
        fallback: String,
    },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider returned a non-success status.
    #[error("{provider} returned HTTP {status}")]
    Status {
        /// Provider name.
        provider: &'static str,
        /// The HTTP status code.
        status: u16,
    },

    /// The call exceeded its time budget.
    #[error("{provider} timed out after {timeout:?}")]
    Timeout {
        /// Provider name.
        provider: &'static str,
        /// The budget that was exceeded.
        timeout: Duration,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

/// A single geocoding backend.
#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
    /// Short provider name for logs and errors.
    fn name(&self) -> &'static str;

    /// Searches for `query`, returning hits in provider rank order. An
    /// empty list means the provider answered with no match.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the HTTP request or response parsing
    /// fails.
    async fn search(&self, query: &str) -> Result<Vec<GeoHit>, GeocodeError>;
}

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 300;

/// Sends a geocoding request and decodes the JSON body, mapping timeouts
/// and non-success statuses. A body that is not JSON is logged with a
/// short preview.
async fn send_json(
    provider: &'static str,
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<serde_json::Value, GeocodeError> {
    let resp = request
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| classify(provider, timeout, e))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(GeocodeError::Status {
            provider,
            status: status.as_u16(),
        });
    }

    let text = resp
        .text()
        .await
        .map_err(|e| classify(provider, timeout, e))?;

    serde_json::from_str(&text).map_err(|e| {
        log::warn!(
            "{provider}: JSON parse failed: {e}\n  received: {} bytes\n  body preview: {}",
            text.len(),
            preview(&text),
        );
        GeocodeError::Parse {
            message: format!("{provider} returned invalid JSON: {e}"),
        }
    })
}

fn classify(provider: &'static str, timeout: Duration, e: reqwest::Error) -> GeocodeError {
    if e.is_timeout() {
        GeocodeError::Timeout { provider, timeout }
    } else {
        GeocodeError::Http(e)
    }
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(BODY_PREVIEW_LEN) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_cuts_on_char_boundary() {
        let body = "é".repeat(BODY_PREVIEW_LEN + 1);
        let p = preview(&body);
        assert_eq!(p.chars().count(), BODY_PREVIEW_LEN + 3);
        assert!(p.ends_with("..."));
        assert_eq!(preview("[]"), "[]");
    }
}
