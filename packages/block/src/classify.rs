//! Classification tables for block state labels.
//!
//! All thresholds live here so the aggregator never hardcodes a cutoff.

use eco_blocks_block_models::{DensityLabel, TrafficLabel, TreeDensity};
use eco_blocks_providers::{LandUseFeature, TrafficFlow};

/// Building-count thresholds for [`DensityLabel`]. Each bound is strict
/// (`count > high` is `High`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DensityThresholds {
    /// Counts above this are `High`.
    pub high: u32,
    /// Counts above this are `Medium`.
    pub medium: u32,
    /// Counts above this are `Low`.
    pub low: u32,
}

impl Default for DensityThresholds {
    fn default() -> Self {
        Self {
            high: 100,
            medium: 40,
            low: 5,
        }
    }
}

impl DensityThresholds {
    /// Classifies a building count. Monotonic non-decreasing in `count`
    /// as long as `high >= medium >= low`.
    #[must_use]
    pub const fn classify(&self, count: u32) -> DensityLabel {
        if count > self.high {
            DensityLabel::High
        } else if count > self.medium {
            DensityLabel::Medium
        } else if count > self.low {
            DensityLabel::Low
        } else {
            DensityLabel::Sparse
        }
    }
}

/// Minimum `current / free_flow` ratio for each label, checked in order.
const FLOW_RATIO_BANDS: &[(f64, TrafficLabel)] = &[
    (0.85, TrafficLabel::ClearRoads),
    (0.60, TrafficLabel::ModerateFlow),
    (0.35, TrafficLabel::HeavyTraffic),
];

/// AQI above which the heuristic assumes heavy traffic.
pub const HEAVY_TRAFFIC_AQI: u32 = 100;

/// Labels live traffic flow by its speed ratio.
#[must_use]
pub fn traffic_from_flow(flow: &TrafficFlow) -> TrafficLabel {
    let ratio = flow.current_speed / flow.free_flow_speed;
    FLOW_RATIO_BANDS
        .iter()
        .find(|(min, _)| ratio >= *min)
        .map_or(TrafficLabel::SevereCongestion, |(_, label)| *label)
}

/// Estimates traffic from AQI alone when the traffic provider is down.
#[must_use]
pub const fn traffic_from_aqi(aqi: u32) -> TrafficLabel {
    if aqi > HEAVY_TRAFFIC_AQI {
        TrafficLabel::HeavyTraffic
    } else {
        TrafficLabel::ClearRoads
    }
}

/// `landuse` classes and the area type they indicate.
const AREA_TYPES: &[(&str, &str)] = &[
    ("residential", "Residential"),
    ("commercial", "Commercial"),
    ("retail", "Commercial"),
    ("industrial", "Industrial"),
    ("park", "Green Space"),
    ("grass", "Green Space"),
    ("meadow", "Green Space"),
    ("forest", "Green Space"),
    ("recreation_ground", "Green Space"),
];

/// Counts `building` features.
#[must_use]
pub fn building_count(features: &[LandUseFeature]) -> u32 {
    let count = features.iter().filter(|f| f.layer == "building").count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Picks the dominant area type among `landuse` features, falling back to
/// a guess from density when none are tagged.
#[must_use]
pub fn area_type(features: &[LandUseFeature], density: DensityLabel) -> String {
    let mut tallies: Vec<(String, usize)> = Vec::new();

    for class in features
        .iter()
        .filter(|f| f.layer == "landuse")
        .filter_map(|f| f.class.as_deref())
    {
        let name = area_name(class);
        match tallies.iter_mut().find(|(n, _)| *n == name) {
            Some((_, count)) => *count += 1,
            None => tallies.push((name, 1)),
        }
    }

    // `max_by_key` keeps the last maximum; iterate reversed so ties go to
    // the first occurrence.
    tallies
        .into_iter()
        .rev()
        .max_by_key(|(_, count)| *count)
        .map_or_else(|| area_from_density(density).to_string(), |(name, _)| name)
}

/// Maps a `landuse` class to an area name.
fn area_name(class: &str) -> String {
    AREA_TYPES
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(class))
        .map_or_else(|| title_case(class), |(_, name)| (*name).to_string())
}

/// Density-based area guess.
#[must_use]
pub const fn area_from_density(density: DensityLabel) -> &'static str {
    match density {
        DensityLabel::High => "Urban Core",
        DensityLabel::Medium => "Urban",
        DensityLabel::Low => "Suburban",
        DensityLabel::Sparse => "Open Land",
    }
}

/// Classifies vegetation, or `None` when no `landcover` feature exists.
#[must_use]
pub fn tree_density(features: &[LandUseFeature]) -> Option<TreeDensity> {
    let count = features.iter().filter(|f| f.layer == "landcover").count();
    match count {
        0 => None,
        c if c > 10 => Some(TreeDensity::High),
        c if c > 3 => Some(TreeDensity::Moderate),
        _ => Some(TreeDensity::Sparse),
    }
}

/// `"recreation_ground"` → `"Recreation Ground"`.
fn title_case(s: &str) -> String {
    s.split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn landuse(class: &str) -> LandUseFeature {
        LandUseFeature::new("landuse", Some(class))
    }

    #[test]
    fn density_boundaries() {
        let t = DensityThresholds::default();
        assert_eq!(t.classify(0), DensityLabel::Sparse);
        assert_eq!(t.classify(5), DensityLabel::Sparse);
        assert_eq!(t.classify(6), DensityLabel::Low);
        assert_eq!(t.classify(40), DensityLabel::Low);
        assert_eq!(t.classify(41), DensityLabel::Medium);
        assert_eq!(t.classify(100), DensityLabel::Medium);
        assert_eq!(t.classify(101), DensityLabel::High);
    }

    #[test]
    fn density_is_monotonic() {
        let t = DensityThresholds::default();
        let mut previous = t.classify(0);
        for count in 1..=500 {
            let label = t.classify(count);
            assert!(label >= previous, "density decreased at count {count}");
            previous = label;
        }
    }

    #[test]
    fn flow_ratio_bands() {
        let label = |current: f64| {
            traffic_from_flow(&TrafficFlow {
                current_speed: current,
                free_flow_speed: 100.0,
            })
        };
        assert_eq!(label(95.0), TrafficLabel::ClearRoads);
        assert_eq!(label(85.0), TrafficLabel::ClearRoads);
        assert_eq!(label(70.0), TrafficLabel::ModerateFlow);
        assert_eq!(label(40.0), TrafficLabel::HeavyTraffic);
        assert_eq!(label(10.0), TrafficLabel::SevereCongestion);
    }

    #[test]
    fn aqi_heuristic() {
        assert_eq!(traffic_from_aqi(0), TrafficLabel::ClearRoads);
        assert_eq!(traffic_from_aqi(100), TrafficLabel::ClearRoads);
        assert_eq!(traffic_from_aqi(101), TrafficLabel::HeavyTraffic);
    }

    #[test]
    fn dominant_landuse_wins() {
        let features = vec![
            landuse("commercial"),
            landuse("residential"),
            landuse("residential"),
            LandUseFeature::new("building", None),
        ];
        assert_eq!(area_type(&features, DensityLabel::Low), "Residential");
    }

    #[test]
    fn retail_and_commercial_pool_together() {
        let features = vec![
            landuse("retail"),
            landuse("commercial"),
            landuse("residential"),
        ];
        assert_eq!(area_type(&features, DensityLabel::Low), "Commercial");
    }

    #[test]
    fn ties_go_to_first_occurrence() {
        let features = vec![landuse("industrial"), landuse("residential")];
        assert_eq!(area_type(&features, DensityLabel::Low), "Industrial");
    }

    #[test]
    fn unknown_landuse_is_title_cased() {
        let features = vec![landuse("village_green")];
        assert_eq!(area_type(&features, DensityLabel::Low), "Village Green");
    }

    #[test]
    fn no_landuse_guesses_from_density() {
        let features = vec![LandUseFeature::new("building", None)];
        assert_eq!(area_type(&features, DensityLabel::High), "Urban Core");
        assert_eq!(area_type(&[], DensityLabel::Sparse), "Open Land");
    }

    #[test]
    fn tree_density_requires_landcover() {
        assert_eq!(tree_density(&[landuse("park")]), None);

        let trees = |n: usize| vec![LandUseFeature::new("landcover", Some("tree")); n];
        assert_eq!(tree_density(&trees(2)), Some(TreeDensity::Sparse));
        assert_eq!(tree_density(&trees(4)), Some(TreeDensity::Moderate));
        assert_eq!(tree_density(&trees(11)), Some(TreeDensity::High));
    }
}
