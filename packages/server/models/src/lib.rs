#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the eco-blocks server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the domain types to allow independent evolution of the API
//! contract.

use eco_blocks_block_models::{BlockProvenance, BlockState, DensityLabel, TreeDensity};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Error body returned with every non-2xx JSON response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Human-readable reason.
    pub error: String,
}

impl ApiError {
    /// Creates an error body.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Query parameters for the block-data endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockDataParams {
    /// Latitude in degrees.
    pub lat: Option<f64>,
    /// Longitude in degrees.
    pub lon: Option<f64>,
}

/// Block state as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiBlockState {
    /// US AQI, `0` when unavailable.
    pub aqi: u32,
    /// PM2.5 in µg/m³.
    pub pm25: f64,
    /// Traffic label, suffixed with `(Est)` when estimated.
    pub traffic: String,
    /// Observed traffic speed in km/h.
    pub traffic_speed: Option<f64>,
    /// Buildings near the coordinate.
    pub building_count: u32,
    /// Density class.
    pub density: DensityLabel,
    /// Area classification.
    pub area_type: String,
    /// Vegetation class.
    pub tree_density: Option<TreeDensity>,
    /// Per-group provenance.
    pub provenance: BlockProvenance,
}

impl From<BlockState> for ApiBlockState {
    fn from(state: BlockState) -> Self {
        Self {
            traffic: state.traffic_display(),
            aqi: state.aqi,
            pm25: state.pm25,
            traffic_speed: state.traffic_speed,
            building_count: state.building_count,
            density: state.density,
            area_type: state.area_type,
            tree_density: state.tree_density,
            provenance: state.provenance,
        }
    }
}

/// Query parameters for the geocode endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeParams {
    /// Free-form place query.
    pub q: Option<String>,
}

/// Body of a simulate request.
///
/// Only `currentAqi` is required. The block context fields are normally
/// copied from a previous block-data response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateRequest {
    /// Client block identifier. Defaults to `"lat,lon"` when a
    /// coordinate is present.
    pub block_id: Option<String>,
    /// Requested intervention name.
    #[serde(default)]
    pub intervention: String,
    /// Current AQI at the block.
    #[serde(alias = "currentAQI")]
    pub current_aqi: Option<f64>,
    /// Density label (`Sparse`, `Low`, `Medium`, `High`; case-insensitive).
    pub density: Option<String>,
    /// Area classification.
    pub area_type: Option<String>,
    /// Traffic label, optionally suffixed with `(Est)`.
    pub traffic: Option<String>,
    /// Observed traffic speed in km/h.
    pub traffic_speed: Option<f64>,
    /// Block latitude, used to fetch AQI history.
    pub lat: Option<f64>,
    /// Block longitude, used to fetch AQI history.
    pub lon: Option<f64>,
    /// Daily AQI history, oldest first.
    pub aqi_history: Option<Vec<f64>>,
    /// Daily traffic speed history, oldest first.
    pub traffic_history: Option<Vec<f64>>,
    /// Requesting user. Defaults to `"guest"`.
    pub user_id: Option<String>,
}

/// Query parameters for the history endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    /// User whose simulations to list. Defaults to `"guest"`.
    pub user_id: Option<String>,
}

/// Body of a reward claim.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardRequest {
    /// Claiming user. Defaults to `"guest"`.
    pub user_id: Option<String>,
    /// Destination wallet address.
    pub wallet_address: String,
    /// Credits claimed.
    pub credits: u32,
}

/// Response to an accepted reward claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRewardClaim {
    /// Reward record id.
    pub id: String,
    /// Always `"PENDING"`.
    pub status: String,
}

/// Body of a narration request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationRequest {
    /// Text to speak, usually a narrative headline.
    pub text: String,
}

#[cfg(test)]
mod tests {
    use eco_blocks_block_models::{Provenance, TrafficLabel};

    use super::*;

    #[test]
    fn block_state_marks_estimated_traffic() {
        let state = BlockState {
            aqi: 120,
            pm25: 35.5,
            traffic: TrafficLabel::HeavyTraffic,
            traffic_speed: None,
            building_count: 50,
            density: DensityLabel::Medium,
            area_type: "Residential".to_string(),
            tree_density: None,
            provenance: BlockProvenance {
                air_quality: Provenance::Live,
                traffic: Provenance::Fallback,
                land_use: Provenance::Live,
            },
        };

        let json = serde_json::to_value(ApiBlockState::from(state)).unwrap();
        assert_eq!(json["traffic"], "Heavy Traffic (Est)");
        assert_eq!(json["buildingCount"], 50);
        assert_eq!(json["provenance"]["traffic"], "fallback");
        assert!(json["treeDensity"].is_null());
    }

    #[test]
    fn simulate_request_accepts_legacy_aqi_key() {
        let request: SimulateRequest = serde_json::from_value(serde_json::json!({
            "blockId": "b-1",
            "intervention": "Green Wall",
            "currentAQI": 120
        }))
        .unwrap();
        assert_eq!(request.current_aqi, Some(120.0));
        assert!(request.aqi_history.is_none());
    }
}
