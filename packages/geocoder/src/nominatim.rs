//! Nominatim / `OpenStreetMap` geocoder client.
//!
//! Used as the fallback when Open-Meteo has no match. The public instance
//! allows **1 request per second** and requires an identifying
//! `User-Agent`, which the caller sets on the shared `reqwest::Client`.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use std::time::Duration;

use crate::{GeoHit, GeocodeError, Geocoder};

const PROVIDER: &str = "nominatim";

/// Nominatim free-form search.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    max_results: u32,
    timeout: Duration,
}

impl NominatimGeocoder {
    /// Creates a client for the search endpoint at `base_url`.
    #[must_use]
    pub const fn new(
        client: reqwest::Client,
        base_url: String,
        max_results: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url,
            max_results,
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl Geocoder for NominatimGeocoder {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn search(&self, query: &str) -> Result<Vec<GeoHit>, GeocodeError> {
        let limit = self.max_results.to_string();
        let request = self.client.get(&self.base_url).query(&[
            ("q", query),
            ("format", "jsonv2"),
            ("addressdetails", "1"),
            ("limit", limit.as_str()),
        ]);

        let body = crate::send_json(PROVIDER, request, self.timeout).await?;
        parse_response(&body)
    }
}

/// Parses the Nominatim JSON array.
fn parse_response(body: &serde_json::Value) -> Result<Vec<GeoHit>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    results
        .iter()
        .map(|place| {
            let lat = place["lat"]
                .as_str()
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or_else(|| GeocodeError::Parse {
                    message: "Missing lat in Nominatim response".to_string(),
                })?;

            let lon = place["lon"]
                .as_str()
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or_else(|| GeocodeError::Parse {
                    message: "Missing lon in Nominatim response".to_string(),
                })?;

            let display_name = place["display_name"]
                .as_str()
                .map_or_else(|| format!("{lat}, {lon}"), String::from);

            Ok(GeoHit {
                lat,
                lon,
                display_name,
                country: place["address"]["country"].as_str().map(String::from),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nominatim_results() {
        let body = serde_json::json!([
            {
                "lat": "41.8827",
                "lon": "-87.6278",
                "display_name": "100, North State Street, Chicago, IL, USA",
                "address": { "city": "Chicago", "country": "United States" }
            },
            {
                "lat": "41.88",
                "lon": "-87.63",
                "display_name": "State Street, Chicago"
            }
        ]);
        let hits = parse_response(&body).unwrap();
        assert_eq!(hits.len(), 2);
        assert!((hits[0].lat - 41.8827).abs() < 1e-4);
        assert!((hits[0].lon - -87.6278).abs() < 1e-4);
        assert_eq!(hits[0].country.as_deref(), Some("United States"));
        assert_eq!(hits[1].display_name, "State Street, Chicago");
        assert_eq!(hits[1].country, None);
    }

    #[test]
    fn parses_nominatim_empty() {
        let body = serde_json::json!([]);
        assert!(parse_response(&body).unwrap().is_empty());
    }

    #[test]
    fn rejects_non_array() {
        let body = serde_json::json!({ "error": "bad request" });
        assert!(parse_response(&body).is_err());
    }
}
