//! Primary-then-fallback geocode resolution.

use std::sync::Arc;
use std::time::Duration;

use crate::nominatim::NominatimGeocoder;
use crate::open_meteo::OpenMeteoGeocoder;
use crate::service_registry::{self, GeocodingService, ProviderConfig};
use crate::{GeoHit, GeocodeError, Geocoder};

/// Resolves queries against a primary geocoder, consulting the fallback
/// at most once per query.
///
/// Worst-case latency is the sum of the two call budgets. There is no
/// cache and no retry.
pub struct GeocodeResolver {
    primary: Arc<dyn Geocoder>,
    fallback: Arc<dyn Geocoder>,
    call_timeout: Duration,
}

impl GeocodeResolver {
    /// Creates a resolver. `call_timeout` bounds each provider call.
    #[must_use]
    pub fn new(
        primary: Arc<dyn Geocoder>,
        fallback: Arc<dyn Geocoder>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            call_timeout,
        }
    }

    /// Builds the resolver from the two highest-priority enabled services
    /// in the registry.
    ///
    /// Returns `None` if fewer than two geocoding services are enabled.
    #[must_use]
    pub fn from_registry(client: &reqwest::Client) -> Option<Self> {
        let services = service_registry::enabled_services();
        let mut geocoders = services.iter().map(|s| build(client, s));
        let primary = geocoders.next()?;
        let fallback = geocoders.next()?;
        let call_timeout = services
            .iter()
            .take(2)
            .map(GeocodingService::timeout)
            .max()
            .unwrap_or(Duration::from_secs(8));

        log::info!(
            "Geocoder: primary={} fallback={}",
            primary.name(),
            fallback.name()
        );
        Some(Self::new(primary, fallback, call_timeout))
    }

    /// Resolves `query` to a ranked hit list.
    ///
    /// # Errors
    ///
    /// * [`GeocodeError::InvalidInput`] if the query is blank (no provider
    ///   is called)
    /// * [`GeocodeError::NotFound`] if neither provider has a match
    /// * [`GeocodeError::Upstream`] if both providers fail
    pub async fn resolve(&self, query: &str) -> Result<Vec<GeoHit>, GeocodeError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(GeocodeError::InvalidInput {
                message: "Missing query".to_string(),
            });
        }

        let primary_error = match self.call(self.primary.as_ref(), query).await {
            Ok(hits) if !hits.is_empty() => return Ok(hits),
            Ok(_) => {
                log::info!(
                    "{} has no match for '{query}', trying {}",
                    self.primary.name(),
                    self.fallback.name()
                );
                None
            }
            Err(e) => {
                log::warn!(
                    "{} failed for '{query}', trying {}: {e}",
                    self.primary.name(),
                    self.fallback.name()
                );
                Some(e)
            }
        };

        match (self.call(self.fallback.as_ref(), query).await, primary_error) {
            (Ok(hits), _) if !hits.is_empty() => Ok(hits),
            (Ok(_), _) | (Err(_), None) => Err(GeocodeError::NotFound {
                query: query.to_string(),
            }),
            (Err(fallback), Some(primary)) => {
                log::warn!("{} failed for '{query}': {fallback}", self.fallback.name());
                Err(GeocodeError::Upstream {
                    primary: primary.to_string(),
                    fallback: fallback.to_string(),
                })
            }
        }
    }

    async fn call(&self, geocoder: &dyn Geocoder, query: &str) -> Result<Vec<GeoHit>, GeocodeError> {
        tokio::time::timeout(self.call_timeout, geocoder.search(query))
            .await
            .unwrap_or(Err(GeocodeError::Timeout {
                provider: geocoder.name(),
                timeout: self.call_timeout,
            }))
    }
}

/// Instantiates the client for a registry entry.
fn build(client: &reqwest::Client, service: &GeocodingService) -> Arc<dyn Geocoder> {
    match &service.provider {
        ProviderConfig::OpenMeteo {
            base_url,
            max_results,
            language,
        } => Arc::new(OpenMeteoGeocoder::new(
            client.clone(),
            base_url.clone(),
            *max_results,
            language.clone(),
            service.timeout(),
        )),
        ProviderConfig::Nominatim {
            base_url,
            max_results,
        } => Arc::new(NominatimGeocoder::new(
            client.clone(),
            base_url.clone(),
            *max_results,
            service.timeout(),
        )),
    }
}
