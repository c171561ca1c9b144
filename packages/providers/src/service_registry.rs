//! Compile-time registry of upstream provider configurations.
//!
//! Each provider is defined in a TOML file under `services/`. The registry
//! embeds these at compile time and exposes them via [`all_services`] and
//! [`service`].

use std::time::Duration;

use serde::Deserialize;

/// A provider configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderService {
    /// Unique identifier (e.g., `"open_meteo_air_quality"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether the provider should be wired into the aggregator.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Per-call time budget in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Open-Meteo air quality API.
    OpenMeteoAirQuality {
        /// Endpoint URL.
        base_url: String,
    },
    /// `TomTom` flow segment data API.
    TomTomFlow {
        /// Endpoint URL.
        base_url: String,
    },
    /// `OpenStreetMap` Overpass API.
    Overpass {
        /// Interpreter endpoint URL.
        base_url: String,
        /// Search radius around the coordinate in meters.
        #[serde(default = "default_radius")]
        radius_m: u32,
    },
}

const fn default_true() -> bool {
    true
}

const fn default_timeout_ms() -> u64 {
    5_000
}

const fn default_radius() -> u32 {
    250
}

impl ProviderService {
    /// Returns the provider's base URL regardless of variant.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::OpenMeteoAirQuality { base_url }
            | ProviderConfig::TomTomFlow { base_url }
            | ProviderConfig::Overpass { base_url, .. } => base_url,
        }
    }

    /// The per-call time budget.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[
    (
        "open_meteo_air_quality",
        include_str!("../services/open_meteo_air_quality.toml"),
    ),
    ("tomtom_flow", include_str!("../services/tomtom_flow.toml")),
    ("overpass", include_str!("../services/overpass.toml")),
];

#[cfg(test)]
const EXPECTED_SERVICE_COUNT: usize = 3;

/// Returns all provider configurations.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_services() -> Vec<ProviderService> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse provider service '{name}': {e}"))
        })
        .collect()
}

/// Returns the configuration with the given `id`, if any.
#[must_use]
pub fn service(id: &str) -> Option<ProviderService> {
    all_services().into_iter().find(|s| s.id == id)
}
