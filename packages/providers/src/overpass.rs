//! `OpenStreetMap` Overpass land-use client.
//!
//! Issues one Overpass QL query for buildings, `landuse=*`, parks, and
//! vegetation within a radius of the coordinate and flattens the tagged
//! elements into `layer`/`class` features:
//!
//! | OSM tag | layer | class |
//! |---|---|---|
//! | `building=*` | `building` | tag value (`None` for `yes`) |
//! | `landuse=*` | `landuse` | tag value |
//! | `leisure=park` | `landuse` | `park` |
//! | `natural=wood\|scrub\|tree\|tree_row` | `landcover` | tag value |
//!
//! See <https://wiki.openstreetmap.org/wiki/Overpass_API>

use eco_blocks_block_models::Coordinate;

use crate::{ClientConfig, LandUseFeature, LandUseProvider, LandUseResponse, ProviderError, http};

const PROVIDER: &str = "overpass";

/// `natural=*` values reported as land cover.
const LANDCOVER_VALUES: &[&str] = &["wood", "scrub", "tree", "tree_row"];

/// Overpass land-use provider.
pub struct OverpassLandUse {
    client: reqwest::Client,
    config: ClientConfig,
    radius_m: u32,
}

impl OverpassLandUse {
    /// Creates a provider searching `radius_m` meters around each point.
    #[must_use]
    pub const fn new(client: reqwest::Client, config: ClientConfig, radius_m: u32) -> Self {
        Self {
            client,
            config,
            radius_m,
        }
    }

    /// Builds the Overpass QL query for a coordinate.
    fn build_query(&self, coordinate: &Coordinate) -> String {
        let around = format!(
            "(around:{},{},{})",
            self.radius_m,
            coordinate.lat(),
            coordinate.lon()
        );
        let server_timeout = self.config.timeout.as_secs().max(1);

        format!(
            "[out:json][timeout:{server_timeout}];(\
             way[\"building\"]{around};\
             way[\"landuse\"]{around};\
             way[\"leisure\"=\"park\"]{around};\
             way[\"natural\"~\"^(wood|scrub|tree_row)$\"]{around};\
             node[\"natural\"=\"tree\"]{around};\
             );out tags;"
        )
    }
}

#[async_trait::async_trait]
impl LandUseProvider for OverpassLandUse {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn fetch(&self, coordinate: &Coordinate) -> Result<LandUseResponse, ProviderError> {
        let query = self.build_query(coordinate);
        log::debug!("Overpass query: {query}");

        let request = self
            .client
            .post(&self.config.base_url)
            .form(&[("data", query)]);

        let body = http::send_json(PROVIDER, request, self.config.timeout).await?;
        parse_response(&body)
    }
}

/// Flattens Overpass elements into land-use features.
fn parse_response(body: &serde_json::Value) -> Result<LandUseResponse, ProviderError> {
    let elements = body
        .get("elements")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| ProviderError::Parse {
            message: "Overpass response missing 'elements' array".to_string(),
        })?;

    let mut features = Vec::new();

    for element in elements {
        let Some(tags) = element.get("tags") else {
            continue;
        };
        let tag = |key: &str| tags.get(key).and_then(serde_json::Value::as_str);

        if let Some(building) = tag("building") {
            let class = (building != "yes").then_some(building);
            features.push(LandUseFeature::new("building", class));
        }
        if let Some(landuse) = tag("landuse") {
            features.push(LandUseFeature::new("landuse", Some(landuse)));
        }
        if tag("leisure") == Some("park") {
            features.push(LandUseFeature::new("landuse", Some("park")));
        }
        if let Some(natural) = tag("natural")
            && LANDCOVER_VALUES.contains(&natural)
        {
            features.push(LandUseFeature::new("landcover", Some(natural)));
        }
    }

    Ok(LandUseResponse { features })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_tagged_elements() {
        let body = serde_json::json!({
            "version": 0.6,
            "elements": [
                { "type": "way", "id": 1, "tags": { "building": "yes" } },
                { "type": "way", "id": 2, "tags": { "building": "apartments" } },
                { "type": "way", "id": 3, "tags": { "landuse": "residential" } },
                { "type": "way", "id": 4, "tags": { "leisure": "park", "name": "Central" } },
                { "type": "node", "id": 5, "tags": { "natural": "tree" } },
                { "type": "way", "id": 6, "tags": { "natural": "water" } },
                { "type": "node", "id": 7 }
            ]
        });

        let response = parse_response(&body).unwrap();
        assert_eq!(
            response.features,
            vec![
                LandUseFeature::new("building", None),
                LandUseFeature::new("building", Some("apartments")),
                LandUseFeature::new("landuse", Some("residential")),
                LandUseFeature::new("landuse", Some("park")),
                LandUseFeature::new("landcover", Some("tree")),
            ]
        );
    }

    #[test]
    fn empty_elements_yield_no_features() {
        let body = serde_json::json!({ "elements": [] });
        assert!(parse_response(&body).unwrap().features.is_empty());
    }

    #[test]
    fn missing_elements_is_a_parse_error() {
        let body = serde_json::json!({ "remark": "runtime error" });
        assert!(parse_response(&body).is_err());
    }

    #[test]
    fn query_contains_radius_and_point() {
        let provider = OverpassLandUse::new(
            reqwest::Client::new(),
            ClientConfig {
                base_url: "https://overpass.example/api/interpreter".to_string(),
                timeout: std::time::Duration::from_secs(6),
            },
            300,
        );
        let coordinate = Coordinate::new(52.52, 13.405).unwrap();
        let query = provider.build_query(&coordinate);
        assert!(query.starts_with("[out:json][timeout:6];"));
        assert!(query.contains("(around:300,52.52,13.405)"));
        assert!(query.ends_with("out tags;"));
    }
}
