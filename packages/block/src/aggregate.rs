//! Concurrent fan-out to the three block providers.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use eco_blocks_block_models::{BlockProvenance, BlockState, Coordinate, DensityLabel, Provenance};
use eco_blocks_providers::{
    AirQualityProvider, AirQualityReading, LandUseProvider, LandUseResponse, ProviderError,
    TrafficFlow, TrafficProvider,
};

use crate::classify::{self, DensityThresholds};

/// Area type reported when the land-use provider fails.
pub const UNKNOWN_AREA: &str = "Unknown";

/// Tunables for [`Aggregator`].
#[derive(Debug, Clone, Copy)]
pub struct AggregatorConfig {
    /// Upper bound on each provider call, on top of the client's own
    /// HTTP timeout.
    pub call_timeout: Duration,
    /// Building-count thresholds.
    pub density: DensityThresholds,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(8),
            density: DensityThresholds::default(),
        }
    }
}

/// Builds [`BlockState`]s from the air-quality, traffic, and land-use
/// providers.
pub struct Aggregator {
    air_quality: Arc<dyn AirQualityProvider>,
    traffic: Arc<dyn TrafficProvider>,
    land_use: Arc<dyn LandUseProvider>,
    config: AggregatorConfig,
}

impl Aggregator {
    /// Creates an aggregator over the given providers.
    #[must_use]
    pub fn new(
        air_quality: Arc<dyn AirQualityProvider>,
        traffic: Arc<dyn TrafficProvider>,
        land_use: Arc<dyn LandUseProvider>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            air_quality,
            traffic,
            land_use,
            config,
        }
    }

    /// Fetches all three providers concurrently and merges the results.
    ///
    /// Never fails: each provider failure is replaced by its fallback and
    /// recorded in [`BlockState::provenance`]. All three calls settle
    /// before merging, and each is bounded by
    /// [`AggregatorConfig::call_timeout`]. Dropping the returned future
    /// cancels the in-flight calls.
    pub async fn aggregate(&self, coordinate: &Coordinate) -> BlockState {
        let budget = self.config.call_timeout;

        let (air_quality, traffic, land_use) = tokio::join!(
            bounded(
                self.air_quality.name(),
                budget,
                self.air_quality.fetch(coordinate)
            ),
            bounded(self.traffic.name(), budget, self.traffic.fetch(coordinate)),
            bounded(self.land_use.name(), budget, self.land_use.fetch(coordinate)),
        );

        log::debug!(
            "Block {coordinate}: air_quality_ok={} traffic_ok={} land_use_ok={}",
            air_quality.is_ok(),
            traffic.is_ok(),
            land_use.is_ok()
        );

        merge(air_quality, traffic, land_use, &self.config.density)
    }
}

/// Applies a time budget to a provider call, reporting expiry as
/// [`ProviderError::Timeout`].
async fn bounded<T>(
    provider: &'static str,
    budget: Duration,
    call: impl Future<Output = Result<T, ProviderError>>,
) -> Result<T, ProviderError> {
    tokio::time::timeout(budget, call)
        .await
        .unwrap_or(Err(ProviderError::Timeout {
            provider,
            timeout: budget,
        }))
}

/// Merges settled provider results into a [`BlockState`].
///
/// Pure over its inputs; failures are logged and replaced:
///
/// * air quality ⇒ `aqi = 0`, `pm25 = 0`
/// * traffic ⇒ label estimated from AQI, no speed
/// * land use ⇒ no buildings, `Sparse`, `"Unknown"`, no tree density
#[must_use]
pub fn merge(
    air_quality: Result<AirQualityReading, ProviderError>,
    traffic: Result<TrafficFlow, ProviderError>,
    land_use: Result<LandUseResponse, ProviderError>,
    thresholds: &DensityThresholds,
) -> BlockState {
    let (reading, air_quality_source) = match air_quality {
        Ok(reading) => (reading, Provenance::Live),
        Err(e) => {
            log::warn!("Air quality unavailable, reporting no data: {e}");
            (AirQualityReading { aqi: 0, pm25: 0.0 }, Provenance::Fallback)
        }
    };

    let (traffic_label, traffic_speed, traffic_source) = match traffic {
        Ok(flow) => (
            classify::traffic_from_flow(&flow),
            Some(flow.current_speed),
            Provenance::Live,
        ),
        Err(e) => {
            let estimated = classify::traffic_from_aqi(reading.aqi);
            log::warn!("Traffic unavailable, estimating {estimated} from AQI: {e}");
            (estimated, None, Provenance::Fallback)
        }
    };

    let (building_count, density, area_type, tree_density, land_use_source) = match land_use {
        Ok(response) => {
            let count = classify::building_count(&response.features);
            let density = thresholds.classify(count);
            (
                count,
                density,
                classify::area_type(&response.features, density),
                classify::tree_density(&response.features),
                Provenance::Live,
            )
        }
        Err(e) => {
            log::warn!("Land use unavailable, assuming sparse unknown area: {e}");
            (
                0,
                DensityLabel::Sparse,
                UNKNOWN_AREA.to_string(),
                None,
                Provenance::Fallback,
            )
        }
    };

    BlockState {
        aqi: reading.aqi,
        pm25: reading.pm25,
        traffic: traffic_label,
        traffic_speed,
        building_count,
        density,
        area_type,
        tree_density,
        provenance: BlockProvenance {
            air_quality: air_quality_source,
            traffic: traffic_source,
            land_use: land_use_source,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    use eco_blocks_block_models::{TrafficLabel, TreeDensity};
    use eco_blocks_providers::LandUseFeature;

    use super::*;

    struct FixedAir(u32);
    struct FixedTraffic(f64, f64);
    struct FixedLand(Vec<LandUseFeature>);
    struct Failing;
    struct Hanging;

    #[async_trait::async_trait]
    impl AirQualityProvider for FixedAir {
        fn name(&self) -> &'static str {
            "fixed-air"
        }
        async fn fetch(&self, _: &Coordinate) -> Result<AirQualityReading, ProviderError> {
            Ok(AirQualityReading {
                aqi: self.0,
                pm25: 12.5,
            })
        }
    }

    #[async_trait::async_trait]
    impl TrafficProvider for FixedTraffic {
        fn name(&self) -> &'static str {
            "fixed-traffic"
        }
        async fn fetch(&self, _: &Coordinate) -> Result<TrafficFlow, ProviderError> {
            Ok(TrafficFlow {
                current_speed: self.0,
                free_flow_speed: self.1,
            })
        }
    }

    #[async_trait::async_trait]
    impl LandUseProvider for FixedLand {
        fn name(&self) -> &'static str {
            "fixed-land"
        }
        async fn fetch(&self, _: &Coordinate) -> Result<LandUseResponse, ProviderError> {
            Ok(LandUseResponse {
                features: self.0.clone(),
            })
        }
    }

    fn failure() -> ProviderError {
        ProviderError::Status {
            provider: "failing",
            status: 503,
        }
    }

    #[async_trait::async_trait]
    impl AirQualityProvider for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        async fn fetch(&self, _: &Coordinate) -> Result<AirQualityReading, ProviderError> {
            Err(failure())
        }
    }

    #[async_trait::async_trait]
    impl TrafficProvider for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        async fn fetch(&self, _: &Coordinate) -> Result<TrafficFlow, ProviderError> {
            Err(failure())
        }
    }

    #[async_trait::async_trait]
    impl LandUseProvider for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        async fn fetch(&self, _: &Coordinate) -> Result<LandUseResponse, ProviderError> {
            Err(failure())
        }
    }

    async fn hang<T>() -> Result<T, ProviderError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(failure())
    }

    #[async_trait::async_trait]
    impl AirQualityProvider for Hanging {
        fn name(&self) -> &'static str {
            "hanging"
        }
        async fn fetch(&self, _: &Coordinate) -> Result<AirQualityReading, ProviderError> {
            hang().await
        }
    }

    #[async_trait::async_trait]
    impl TrafficProvider for Hanging {
        fn name(&self) -> &'static str {
            "hanging"
        }
        async fn fetch(&self, _: &Coordinate) -> Result<TrafficFlow, ProviderError> {
            hang().await
        }
    }

    #[async_trait::async_trait]
    impl LandUseProvider for Hanging {
        fn name(&self) -> &'static str {
            "hanging"
        }
        async fn fetch(&self, _: &Coordinate) -> Result<LandUseResponse, ProviderError> {
            hang().await
        }
    }

    /// Counts calls so tests can prove a provider still ran after another
    /// one failed.
    struct CountingLand(AtomicUsize);

    #[async_trait::async_trait]
    impl LandUseProvider for CountingLand {
        fn name(&self) -> &'static str {
            "counting-land"
        }
        async fn fetch(&self, _: &Coordinate) -> Result<LandUseResponse, ProviderError> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(LandUseResponse::default())
        }
    }

    fn point() -> Coordinate {
        Coordinate::new(40.7128, -74.006).unwrap()
    }

    fn config(call_timeout: Duration) -> AggregatorConfig {
        AggregatorConfig {
            call_timeout,
            density: DensityThresholds::default(),
        }
    }

    #[tokio::test]
    async fn all_live_providers() {
        let mut features = vec![LandUseFeature::new("building", None); 45];
        features.push(LandUseFeature::new("landuse", Some("residential")));
        features.push(LandUseFeature::new("landcover", Some("tree")));

        let aggregator = Aggregator::new(
            Arc::new(FixedAir(88)),
            Arc::new(FixedTraffic(30.0, 50.0)),
            Arc::new(FixedLand(features)),
            AggregatorConfig::default(),
        );

        let state = aggregator.aggregate(&point()).await;
        assert_eq!(state.aqi, 88);
        assert_eq!(state.traffic, TrafficLabel::ModerateFlow);
        assert_eq!(state.traffic_speed, Some(30.0));
        assert_eq!(state.building_count, 45);
        assert_eq!(state.density, DensityLabel::Medium);
        assert_eq!(state.area_type, "Residential");
        assert_eq!(state.tree_density, Some(TreeDensity::Sparse));
        assert_eq!(state.provenance.air_quality, Provenance::Live);
        assert_eq!(state.provenance.traffic, Provenance::Live);
        assert_eq!(state.provenance.land_use, Provenance::Live);
    }

    #[tokio::test]
    async fn all_providers_failing_degrades() {
        let aggregator = Aggregator::new(
            Arc::new(Failing),
            Arc::new(Failing),
            Arc::new(Failing),
            AggregatorConfig::default(),
        );

        let state = aggregator.aggregate(&point()).await;
        assert_eq!(state.aqi, 0);
        assert!(state.pm25.abs() < f64::EPSILON);
        assert_eq!(state.traffic, TrafficLabel::ClearRoads);
        assert_eq!(state.traffic_display(), "Clear Roads (Est)");
        assert_eq!(state.building_count, 0);
        assert_eq!(state.density, DensityLabel::Sparse);
        assert_eq!(state.area_type, UNKNOWN_AREA);
        assert_eq!(state.tree_density, None);
        assert_eq!(state.provenance.air_quality, Provenance::Fallback);
        assert_eq!(state.provenance.traffic, Provenance::Fallback);
        assert_eq!(state.provenance.land_use, Provenance::Fallback);
    }

    #[tokio::test]
    async fn traffic_failure_estimates_from_high_aqi() {
        let aggregator = Aggregator::new(
            Arc::new(FixedAir(140)),
            Arc::new(Failing),
            Arc::new(FixedLand(Vec::new())),
            AggregatorConfig::default(),
        );

        let state = aggregator.aggregate(&point()).await;
        assert_eq!(state.traffic, TrafficLabel::HeavyTraffic);
        assert_eq!(state.traffic_speed, None);
        assert_eq!(state.traffic_display(), "Heavy Traffic (Est)");
        assert_eq!(state.provenance.air_quality, Provenance::Live);
    }

    #[tokio::test]
    async fn failure_does_not_short_circuit_other_calls() {
        let land = Arc::new(CountingLand(AtomicUsize::new(0)));
        let aggregator = Aggregator::new(
            Arc::new(Failing),
            Arc::new(Failing),
            land.clone(),
            AggregatorConfig::default(),
        );

        let state = aggregator.aggregate(&point()).await;
        assert_eq!(land.0.load(Ordering::SeqCst), 1);
        assert_eq!(state.provenance.land_use, Provenance::Live);
        assert_eq!(state.area_type, "Open Land");
    }

    #[tokio::test]
    async fn hanging_providers_are_bounded() {
        let aggregator = Aggregator::new(
            Arc::new(Hanging),
            Arc::new(Hanging),
            Arc::new(Hanging),
            config(Duration::from_millis(50)),
        );

        let started = Instant::now();
        let state = aggregator.aggregate(&point()).await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(state.provenance.air_quality, Provenance::Fallback);
        assert_eq!(state.provenance.traffic, Provenance::Fallback);
        assert_eq!(state.provenance.land_use, Provenance::Fallback);
    }

    #[test]
    fn merge_reports_timeouts_as_fallback() {
        let timeout = || ProviderError::Timeout {
            provider: "slow",
            timeout: Duration::from_secs(1),
        };
        let state = merge(
            Err(timeout()),
            Err(timeout()),
            Ok(LandUseResponse {
                features: vec![LandUseFeature::new("building", None); 120],
            }),
            &DensityThresholds::default(),
        );
        assert_eq!(state.density, DensityLabel::High);
        assert_eq!(state.area_type, "Urban Core");
        assert_eq!(state.provenance.land_use, Provenance::Live);
    }
}
