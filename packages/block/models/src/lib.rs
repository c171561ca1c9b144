#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Coordinate and block state types.
//!
//! A [`BlockState`] is the composite environmental snapshot for a single
//! coordinate: air quality, traffic, and land-use density. It is rebuilt
//! for every request and never cached. Each group of fields carries a
//! [`Provenance`] so callers can tell live provider data apart from the
//! heuristic substitutes used when a provider is unavailable.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Errors raised when validating a coordinate at ingress.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    /// A required component was not supplied.
    #[error("Missing coordinate component: {field}")]
    Missing {
        /// `"lat"` or `"lon"`.
        field: &'static str,
    },

    /// A component was NaN or infinite.
    #[error("Coordinate component {field} is not a finite number")]
    NotFinite {
        /// `"lat"` or `"lon"`.
        field: &'static str,
    },

    /// A component was outside its valid range.
    #[error("Coordinate component {field}={value} is out of range")]
    OutOfRange {
        /// `"lat"` or `"lon"`.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
}

/// A validated WGS84 coordinate.
///
/// Latitude is within `[-90, 90]` and longitude within `[-180, 180]`.
/// The fields are private so every instance has passed [`Coordinate::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    lat: f64,
    lon: f64,
}

impl Coordinate {
    /// Validates and creates a coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] if either component is non-finite or out
    /// of range.
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoordinateError> {
        if !lat.is_finite() {
            return Err(CoordinateError::NotFinite { field: "lat" });
        }
        if !lon.is_finite() {
            return Err(CoordinateError::NotFinite { field: "lon" });
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::OutOfRange {
                field: "lat",
                value: lat,
            });
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(CoordinateError::OutOfRange {
                field: "lon",
                value: lon,
            });
        }
        Ok(Self { lat, lon })
    }

    /// Validates a coordinate whose components may be absent.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError::Missing`] if either component is `None`,
    /// otherwise the same errors as [`Coordinate::new`].
    pub fn from_parts(lat: Option<f64>, lon: Option<f64>) -> Result<Self, CoordinateError> {
        let lat = lat.ok_or(CoordinateError::Missing { field: "lat" })?;
        let lon = lon.ok_or(CoordinateError::Missing { field: "lon" })?;
        Self::new(lat, lon)
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn lon(&self) -> f64 {
        self.lon
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5},{:.5}", self.lat, self.lon)
    }
}

/// Coarse traffic condition for a block.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum TrafficLabel {
    /// Free-flowing traffic.
    #[strum(serialize = "Clear Roads")]
    ClearRoads,
    /// Slightly below free-flow speed.
    #[strum(serialize = "Moderate Flow")]
    ModerateFlow,
    /// Well below free-flow speed.
    #[strum(serialize = "Heavy Traffic")]
    HeavyTraffic,
    /// Near standstill.
    #[strum(serialize = "Severe Congestion")]
    SevereCongestion,
}

impl TrafficLabel {
    /// Typical observed speed (km/h) for this condition, used when no live
    /// speed annotation is available.
    #[must_use]
    pub const fn typical_speed_kmh(self) -> f64 {
        match self {
            Self::ClearRoads => 45.0,
            Self::ModerateFlow => 30.0,
            Self::HeavyTraffic => 18.0,
            Self::SevereCongestion => 8.0,
        }
    }
}

/// Building density classification, ordered from least to most dense.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum DensityLabel {
    /// Few or no buildings.
    Sparse,
    /// Scattered buildings.
    Low,
    /// Typical urban fabric.
    Medium,
    /// Dense urban core.
    High,
}

/// Tree canopy classification.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum TreeDensity {
    /// Little vegetation.
    Sparse,
    /// Some vegetation.
    Moderate,
    /// Heavily vegetated.
    High,
}

/// Where a group of block state fields came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Provenance {
    /// Returned by a live upstream provider.
    Live,
    /// Substituted by a deterministic heuristic after a provider failure.
    Fallback,
}

/// Provenance of each field group in a [`BlockState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockProvenance {
    /// `aqi` and `pm25`.
    pub air_quality: Provenance,
    /// `traffic` and `traffic_speed`.
    pub traffic: Provenance,
    /// `building_count`, `density`, `area_type`, and `tree_density`.
    pub land_use: Provenance,
}

/// Composite snapshot for one coordinate.
///
/// `aqi == 0` also means "no data"; check [`BlockProvenance::air_quality`]
/// before reading it as clean air.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockState {
    /// US AQI, `0` when unavailable.
    pub aqi: u32,
    /// PM2.5 concentration in µg/m³, `0.0` when unavailable.
    pub pm25: f64,
    /// Traffic condition.
    pub traffic: TrafficLabel,
    /// Observed speed in km/h, when the traffic provider supplied one.
    pub traffic_speed: Option<f64>,
    /// Number of buildings near the coordinate.
    pub building_count: u32,
    /// Density class derived from `building_count`.
    pub density: DensityLabel,
    /// Free-form area classification (e.g. `"Residential"`).
    pub area_type: String,
    /// Vegetation class, present only when the land-use provider reports it.
    pub tree_density: Option<TreeDensity>,
    /// Per-group provenance.
    pub provenance: BlockProvenance,
}

impl BlockState {
    /// Human-readable traffic label, suffixed with `(Est)` when derived
    /// from the AQI heuristic instead of a live provider.
    #[must_use]
    pub fn traffic_display(&self) -> String {
        match self.provenance.traffic {
            Provenance::Live => self.traffic.to_string(),
            Provenance::Fallback => format!("{} (Est)", self.traffic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_latitude() {
        assert_eq!(
            Coordinate::new(90.5, 0.0),
            Err(CoordinateError::OutOfRange {
                field: "lat",
                value: 90.5
            })
        );
    }

    #[test]
    fn rejects_nan_longitude() {
        assert_eq!(
            Coordinate::new(10.0, f64::NAN),
            Err(CoordinateError::NotFinite { field: "lon" })
        );
    }

    #[test]
    fn accepts_boundaries() {
        assert!(Coordinate::new(-90.0, 180.0).is_ok());
        assert!(Coordinate::new(90.0, -180.0).is_ok());
    }

    #[test]
    fn missing_component_is_reported() {
        assert_eq!(
            Coordinate::from_parts(Some(1.0), None),
            Err(CoordinateError::Missing { field: "lon" })
        );
    }

    #[test]
    fn density_labels_parse_case_insensitively() {
        assert_eq!("medium".parse::<DensityLabel>(), Ok(DensityLabel::Medium));
        assert_eq!("HIGH".parse::<DensityLabel>(), Ok(DensityLabel::High));
        assert!("Dense".parse::<DensityLabel>().is_err());
    }

    #[test]
    fn density_labels_are_ordered() {
        assert!(DensityLabel::Sparse < DensityLabel::Low);
        assert!(DensityLabel::Low < DensityLabel::Medium);
        assert!(DensityLabel::Medium < DensityLabel::High);
    }

    #[test]
    fn fallback_traffic_is_marked_estimated() {
        let state = BlockState {
            aqi: 120,
            pm25: 40.0,
            traffic: TrafficLabel::HeavyTraffic,
            traffic_speed: None,
            building_count: 0,
            density: DensityLabel::Sparse,
            area_type: "Unknown".to_string(),
            tree_density: None,
            provenance: BlockProvenance {
                air_quality: Provenance::Live,
                traffic: Provenance::Fallback,
                land_use: Provenance::Fallback,
            },
        };
        assert_eq!(state.traffic_display(), "Heavy Traffic (Est)");
    }

    #[test]
    fn provenance_serializes_lowercase() {
        let json = serde_json::to_value(Provenance::Fallback).unwrap();
        assert_eq!(json, serde_json::json!("fallback"));
    }
}
