#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Upstream data provider clients.
//!
//! Each upstream source sits behind a small async trait with one uniform
//! result shape, `Result<T, ProviderError>`. Loosely-typed upstream JSON is
//! parsed into strongly-typed payloads at this boundary so callers never
//! inspect "maybe present" fields:
//!
//! 1. **Air quality**: [`open_meteo::OpenMeteoAirQuality`] (US AQI, PM2.5,
//!    hourly history).
//! 2. **Traffic**: [`tomtom::TomTomFlow`] (current vs. free-flow speed).
//!    Requires an API key; without one every call returns
//!    [`ProviderError::Disabled`].
//! 3. **Land use**: [`overpass::OverpassLandUse`] (buildings, land-use
//!    and land-cover tags from `OpenStreetMap`).
//!
//! Endpoints and timeouts come from TOML files in `services/`, loaded via
//! the [`service_registry`]. No client retries: a failure is final for the
//! request that triggered it.

pub mod http;
pub mod open_meteo;
pub mod overpass;
pub mod service_registry;
pub mod tomtom;

use std::time::Duration;

use eco_blocks_block_models::Coordinate;
use thiserror::Error;

/// Errors from provider calls.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The call exceeded its time budget.
    #[error("{provider} timed out after {timeout:?}")]
    Timeout {
        /// Provider name.
        provider: &'static str,
        /// The budget that was exceeded.
        timeout: Duration,
    },

    /// The upstream returned a non-success status code.
    #[error("{provider} returned HTTP {status}")]
    Status {
        /// Provider name.
        provider: &'static str,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body did not have the expected shape.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// The provider is not configured (e.g. missing API key).
    #[error("{provider} is disabled: {reason}")]
    Disabled {
        /// Provider name.
        provider: &'static str,
        /// Why it is disabled.
        reason: String,
    },

    /// The provider does not implement the requested operation.
    #[error("{provider} does not support {operation}")]
    Unsupported {
        /// Provider name.
        provider: &'static str,
        /// Operation name.
        operation: &'static str,
    },
}

/// Endpoint and time budget for one HTTP provider client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Endpoint URL.
    pub base_url: String,
    /// Per-call time budget.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Builds a client config from a registry entry.
    #[must_use]
    pub fn from_service(service: &service_registry::ProviderService) -> Self {
        Self {
            base_url: service.base_url().to_string(),
            timeout: service.timeout(),
        }
    }
}

/// Current air quality at a coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirQualityReading {
    /// US AQI.
    pub aqi: u32,
    /// PM2.5 concentration in µg/m³.
    pub pm25: f64,
}

/// Current traffic flow on the road segment nearest a coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficFlow {
    /// Observed speed in km/h.
    pub current_speed: f64,
    /// Typical unobstructed speed in km/h.
    pub free_flow_speed: f64,
}

/// One tagged map feature near a coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandUseFeature {
    /// Semantic layer: `"building"`, `"landuse"`, or `"landcover"`.
    pub layer: String,
    /// Optional class within the layer (e.g. `"residential"`, `"wood"`).
    pub class: Option<String>,
}

impl LandUseFeature {
    /// Creates a feature.
    #[must_use]
    pub fn new(layer: &str, class: Option<&str>) -> Self {
        Self {
            layer: layer.to_string(),
            class: class.map(String::from),
        }
    }
}

/// Land-use features near a coordinate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LandUseResponse {
    /// Features in provider order.
    pub features: Vec<LandUseFeature>,
}

/// Source of current and historical air quality.
#[async_trait::async_trait]
pub trait AirQualityProvider: Send + Sync {
    /// Short provider name for logs and errors.
    fn name(&self) -> &'static str;

    /// Fetches the current reading.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the call fails or the response is
    /// malformed.
    async fn fetch(&self, coordinate: &Coordinate) -> Result<AirQualityReading, ProviderError>;

    /// Fetches `days` daily mean AQI values, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Unsupported`] unless overridden.
    async fn fetch_history(
        &self,
        coordinate: &Coordinate,
        days: u32,
    ) -> Result<Vec<f64>, ProviderError> {
        let _ = (coordinate, days);
        Err(ProviderError::Unsupported {
            provider: self.name(),
            operation: "history",
        })
    }
}

/// Source of road traffic flow.
#[async_trait::async_trait]
pub trait TrafficProvider: Send + Sync {
    /// Short provider name for logs and errors.
    fn name(&self) -> &'static str;

    /// Fetches the current flow.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the call fails or the response is
    /// malformed.
    async fn fetch(&self, coordinate: &Coordinate) -> Result<TrafficFlow, ProviderError>;
}

/// Source of land-use and building features.
#[async_trait::async_trait]
pub trait LandUseProvider: Send + Sync {
    /// Short provider name for logs and errors.
    fn name(&self) -> &'static str;

    /// Fetches features around the coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the call fails or the response is
    /// malformed.
    async fn fetch(&self, coordinate: &Coordinate) -> Result<LandUseResponse, ProviderError>;
}
