//! Open-Meteo geocoding client.
//!
//! Searches place names (cities, districts, landmarks). The endpoint omits
//! the `results` key entirely when nothing matches, which is reported as
//! an empty hit list rather than an error.
//!
//! See <https://open-meteo.com/en/docs/geocoding-api>

use std::time::Duration;

use crate::{GeoHit, GeocodeError, Geocoder};

const PROVIDER: &str = "open-meteo";

/// Open-Meteo place-name search.
pub struct OpenMeteoGeocoder {
    client: reqwest::Client,
    base_url: String,
    max_results: u32,
    language: String,
    timeout: Duration,
}

impl OpenMeteoGeocoder {
    /// Creates a client for the search endpoint at `base_url`.
    #[must_use]
    pub const fn new(
        client: reqwest::Client,
        base_url: String,
        max_results: u32,
        language: String,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url,
            max_results,
            language,
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl Geocoder for OpenMeteoGeocoder {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn search(&self, query: &str) -> Result<Vec<GeoHit>, GeocodeError> {
        let count = self.max_results.to_string();
        let request = self.client.get(&self.base_url).query(&[
            ("name", query),
            ("count", count.as_str()),
            ("language", self.language.as_str()),
            ("format", "json"),
        ]);

        let body = crate::send_json(PROVIDER, request, self.timeout).await?;
        parse_response(&body)
    }
}

/// Parses the Open-Meteo `results` array.
fn parse_response(body: &serde_json::Value) -> Result<Vec<GeoHit>, GeocodeError> {
    let Some(results) = body.get("results") else {
        return Ok(Vec::new());
    };
    let results = results.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Open-Meteo 'results' is not an array".to_string(),
    })?;

    results
        .iter()
        .map(|place| {
            let coord = |field: &str| {
                place[field].as_f64().ok_or_else(|| GeocodeError::Parse {
                    message: format!("Missing {field} in Open-Meteo response"),
                })
            };
            let lat = coord("latitude")?;
            let lon = coord("longitude")?;

            let name = place["name"].as_str().unwrap_or_default();
            let country = place["country"].as_str().map(String::from);
            let display_name = match (&country, name.is_empty()) {
                (Some(country), false) => format!("{name}, {country}"),
                (None, false) => name.to_string(),
                (_, true) => format!("{lat}, {lon}"),
            };

            Ok(GeoHit {
                lat,
                lon,
                display_name,
                country,
            })
        })
        .collect()
}
