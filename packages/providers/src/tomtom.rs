//! `TomTom` traffic flow client.
//!
//! Uses the flow segment data endpoint, which reports the current and
//! free-flow speed of the road segment closest to a point. Requires an API
//! key; when none is configured every call returns
//! [`ProviderError::Disabled`] so the aggregator falls back to its AQI
//! heuristic.
//!
//! See <https://developer.tomtom.com/traffic-api/documentation/traffic-flow/flow-segment-data>

use eco_blocks_block_models::Coordinate;

use crate::{ClientConfig, ProviderError, TrafficFlow, TrafficProvider, http};

const PROVIDER: &str = "tomtom-flow";

/// `TomTom` flow segment data provider.
pub struct TomTomFlow {
    client: reqwest::Client,
    config: ClientConfig,
    api_key: Option<String>,
}

impl TomTomFlow {
    /// Creates a provider. A `None` or empty key disables it.
    #[must_use]
    pub fn new(client: reqwest::Client, config: ClientConfig, api_key: Option<String>) -> Self {
        Self {
            client,
            config,
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }
}

#[async_trait::async_trait]
impl TrafficProvider for TomTomFlow {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn fetch(&self, coordinate: &Coordinate) -> Result<TrafficFlow, ProviderError> {
        let Some(api_key) = &self.api_key else {
            return Err(ProviderError::Disabled {
                provider: PROVIDER,
                reason: "no API key configured".to_string(),
            });
        };

        let request = self.client.get(&self.config.base_url).query(&[
            ("point", format!("{},{}", coordinate.lat(), coordinate.lon())),
            ("unit", "KMPH".to_string()),
            ("key", api_key.clone()),
        ]);

        let body = http::send_json(PROVIDER, request, self.config.timeout).await?;
        parse_response(&body)
    }
}

/// Parses the `flowSegmentData` block.
fn parse_response(body: &serde_json::Value) -> Result<TrafficFlow, ProviderError> {
    let segment = body
        .get("flowSegmentData")
        .ok_or_else(|| ProviderError::Parse {
            message: "TomTom response missing 'flowSegmentData'".to_string(),
        })?;

    let speed = |field: &str| {
        segment
            .get(field)
            .and_then(serde_json::Value::as_f64)
            .filter(|v| v.is_finite() && *v >= 0.0)
            .ok_or_else(|| ProviderError::Parse {
                message: format!("Missing or invalid {field} in TomTom response"),
            })
    };

    let current_speed = speed("currentSpeed")?;
    let free_flow_speed = speed("freeFlowSpeed")?;

    if free_flow_speed <= 0.0 {
        return Err(ProviderError::Parse {
            message: "TomTom freeFlowSpeed must be positive".to_string(),
        });
    }

    Ok(TrafficFlow {
        current_speed,
        free_flow_speed,
    })
}
