//! Open-Meteo air quality client.
//!
//! Free, no API key. Current conditions come from the `current` block and
//! history from the `hourly` block with `past_days`.
//!
//! See <https://open-meteo.com/en/docs/air-quality-api>

use eco_blocks_block_models::Coordinate;

use crate::{AirQualityProvider, AirQualityReading, ClientConfig, ProviderError, http};

const PROVIDER: &str = "open-meteo-air-quality";

/// Open-Meteo supports at most this many past days.
const MAX_PAST_DAYS: u32 = 92;

const HOURS_PER_DAY: usize = 24;

/// Open-Meteo air quality provider.
pub struct OpenMeteoAirQuality {
    client: reqwest::Client,
    config: ClientConfig,
}

impl OpenMeteoAirQuality {
    /// Creates a provider sharing the given HTTP client.
    #[must_use]
    pub const fn new(client: reqwest::Client, config: ClientConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait::async_trait]
impl AirQualityProvider for OpenMeteoAirQuality {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn fetch(&self, coordinate: &Coordinate) -> Result<AirQualityReading, ProviderError> {
        let request = self.client.get(&self.config.base_url).query(&[
            ("latitude", coordinate.lat().to_string()),
            ("longitude", coordinate.lon().to_string()),
            ("current", "us_aqi,pm2_5".to_string()),
        ]);

        let body = http::send_json(PROVIDER, request, self.config.timeout).await?;
        parse_current(&body)
    }

    async fn fetch_history(
        &self,
        coordinate: &Coordinate,
        days: u32,
    ) -> Result<Vec<f64>, ProviderError> {
        let days = days.clamp(1, MAX_PAST_DAYS);
        let request = self.client.get(&self.config.base_url).query(&[
            ("latitude", coordinate.lat().to_string()),
            ("longitude", coordinate.lon().to_string()),
            ("hourly", "us_aqi".to_string()),
            ("past_days", days.to_string()),
            ("forecast_days", "1".to_string()),
        ]);

        let body = http::send_json(PROVIDER, request, self.config.timeout).await?;
        parse_history(&body, days as usize)
    }
}

/// Parses the `current` block.
fn parse_current(body: &serde_json::Value) -> Result<AirQualityReading, ProviderError> {
    let current = body.get("current").ok_or_else(|| ProviderError::Parse {
        message: "Open-Meteo response missing 'current'".to_string(),
    })?;

    let aqi = current
        .get("us_aqi")
        .and_then(serde_json::Value::as_f64)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| ProviderError::Parse {
            message: "Missing or invalid us_aqi in Open-Meteo response".to_string(),
        })?;

    let pm25 = current
        .get("pm2_5")
        .and_then(serde_json::Value::as_f64)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(0.0);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let aqi = aqi.round() as u32;

    Ok(AirQualityReading { aqi, pm25 })
}

/// Collapses the hourly `us_aqi` series into daily means.
///
/// Only the first `days * 24` hours are considered (the trailing forecast
/// day is ignored). Null hours are skipped; days with no data at all are
/// dropped.
fn parse_history(body: &serde_json::Value, days: usize) -> Result<Vec<f64>, ProviderError> {
    let hourly = body
        .pointer("/hourly/us_aqi")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| ProviderError::Parse {
            message: "Open-Meteo response missing 'hourly.us_aqi'".to_string(),
        })?;

    let past = &hourly[..hourly.len().min(days * HOURS_PER_DAY)];

    let daily: Vec<f64> = past
        .chunks(HOURS_PER_DAY)
        .filter_map(|day| {
            let values: Vec<f64> = day.iter().filter_map(serde_json::Value::as_f64).collect();
            if values.is_empty() {
                None
            } else {
                #[allow(clippy::cast_precision_loss)]
                Some(values.iter().sum::<f64>() / values.len() as f64)
            }
        })
        .collect();

    if daily.is_empty() {
        return Err(ProviderError::Parse {
            message: "Open-Meteo history contained no values".to_string(),
        });
    }

    Ok(daily)
}
