#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for eco-blocks.
//!
//! Serves block environmental snapshots, place search, intervention
//! simulations, simulation history, reward claims, and narration audio.
//! Simulation and reward records are persisted to `SQLite` in the
//! background; a storage failure never fails a request.

pub mod config;
mod handlers;

use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use eco_blocks_ai::LlmProvider;
use eco_blocks_ai::speech::{ElevenLabsSpeech, SpeechGenerator};
use eco_blocks_block::{Aggregator, AggregatorConfig};
use eco_blocks_geocoder::GeocodeResolver;
use eco_blocks_persistence::{PersistenceSink, SqliteStore, sink::DEFAULT_CAPACITY};
use eco_blocks_providers::service_registry::{self, ProviderConfig};
use eco_blocks_providers::{
    AirQualityProvider, ClientConfig, LandUseProvider, TrafficProvider,
    open_meteo::OpenMeteoAirQuality, overpass::OverpassLandUse, tomtom::TomTomFlow,
};
use eco_blocks_simulation::SimulationEngine;
use thiserror::Error;

pub use config::AppConfig;

/// How long shutdown waits for queued records to be written.
const PERSISTENCE_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that prevent the server from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The record store could not be opened.
    #[error(transparent)]
    Persistence(#[from] eco_blocks_persistence::PersistenceError),

    /// The narrative generator was misconfigured.
    #[error(transparent)]
    Ai(#[from] eco_blocks_ai::AiError),

    /// A required service is missing from the embedded registry.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },

    /// The HTTP server failed to bind or run.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state.
pub struct AppState {
    /// Block state fan-out over the three providers.
    pub aggregator: Aggregator,
    /// Air-quality provider, also used for simulation history.
    pub air_quality: Arc<dyn AirQualityProvider>,
    /// Primary/fallback place search.
    pub geocoder: GeocodeResolver,
    /// Intervention simulation.
    pub engine: SimulationEngine,
    /// Narration audio, when configured.
    pub speech: Option<Arc<dyn SpeechGenerator>>,
    /// Upper bound on one narration request.
    pub narration_timeout: Duration,
    /// Background writer for simulation and reward records.
    pub sink: PersistenceSink,
    /// Store read by the history endpoint.
    pub store: Arc<SqliteStore>,
}

/// The three block providers, built from the embedded registry.
pub struct BlockProviders {
    /// Current and historical air quality.
    pub air_quality: Arc<dyn AirQualityProvider>,
    /// Road traffic flow.
    pub traffic: Arc<dyn TrafficProvider>,
    /// Buildings and land cover.
    pub land_use: Arc<dyn LandUseProvider>,
}

impl BlockProviders {
    /// Builds HTTP providers from the registry. A missing `TomTom` key
    /// leaves traffic disabled, so it is always estimated.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if a provider is missing from the
    /// registry.
    pub fn from_registry(
        client: &reqwest::Client,
        tomtom_api_key: Option<String>,
    ) -> Result<Self, ServerError> {
        let mut air_quality: Option<Arc<dyn AirQualityProvider>> = None;
        let mut traffic: Option<Arc<dyn TrafficProvider>> = None;
        let mut land_use: Option<Arc<dyn LandUseProvider>> = None;
        let mut tomtom_api_key = tomtom_api_key;

        for service in service_registry::all_services() {
            if !service.enabled {
                log::info!("Provider {} is disabled in the registry", service.id);
                continue;
            }
            let config = ClientConfig::from_service(&service);
            match &service.provider {
                ProviderConfig::OpenMeteoAirQuality { .. } => {
                    air_quality = Some(Arc::new(OpenMeteoAirQuality::new(client.clone(), config)));
                }
                ProviderConfig::TomTomFlow { .. } => {
                    traffic = Some(Arc::new(TomTomFlow::new(
                        client.clone(),
                        config,
                        tomtom_api_key.take(),
                    )));
                }
                ProviderConfig::Overpass { radius_m, .. } => {
                    land_use = Some(Arc::new(OverpassLandUse::new(
                        client.clone(),
                        config,
                        *radius_m,
                    )));
                }
            }
        }

        let missing = |kind: &str| ServerError::Config {
            message: format!("No enabled {kind} provider in the service registry"),
        };
        Ok(Self {
            air_quality: air_quality.ok_or_else(|| missing("air quality"))?,
            traffic: traffic.ok_or_else(|| missing("traffic"))?,
            land_use: land_use.ok_or_else(|| missing("land use"))?,
        })
    }
}

impl AppState {
    /// Builds every collaborator from `config` and spawns the persistence
    /// worker on the current runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] if the record store cannot be opened, the
    /// narrative generator is misconfigured, or a registry entry is
    /// missing.
    pub async fn from_config(
        config: &AppConfig,
    ) -> Result<(Self, tokio::task::JoinHandle<()>), ServerError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("eco-blocks/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ServerError::Config {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        if config.tomtom_api_key.is_none() {
            log::warn!("TOMTOM_API_KEY not set; traffic will be estimated from air quality");
        }
        let providers = BlockProviders::from_registry(&client, config.tomtom_api_key.clone())?;

        let geocoder = GeocodeResolver::from_registry(&client).ok_or_else(|| {
            ServerError::Config {
                message: "Two enabled geocoding services are required".to_string(),
            }
        })?;

        let generator: Option<Arc<dyn LlmProvider>> = eco_blocks_ai::create_provider(&config.ai)
            .await?
            .map(Arc::from);
        if let Some(generator) = &generator {
            log::info!("Narrative generator: {}", generator.name());
        }
        let engine = SimulationEngine::new(generator, config.narrative_timeout);

        let speech = ElevenLabsSpeech::new(
            config.eleven_labs_api_key.clone(),
            config.eleven_labs_voice_id.clone(),
            config.narration_timeout,
        )
        .map(|s| Arc::new(s) as Arc<dyn SpeechGenerator>);
        if speech.is_none() {
            log::info!("ELEVEN_LABS_API_KEY not set; narration is disabled");
        }

        log::info!("Opening record store...");
        let store = Arc::new(SqliteStore::open(&config.database_path).await?);
        let (sink, worker) = PersistenceSink::spawn(store.clone(), DEFAULT_CAPACITY);

        Ok((
            Self {
                aggregator: Aggregator::new(
                    providers.air_quality.clone(),
                    providers.traffic,
                    providers.land_use,
                    AggregatorConfig::default(),
                ),
                air_quality: providers.air_quality,
                geocoder,
                engine,
                speech,
                narration_timeout: config.narration_timeout,
                sink,
                store,
            },
            worker,
        ))
    }
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/block-data", web::get().to(handlers::block_data))
            .route("/geocode", web::get().to(handlers::geocode))
            .route("/simulate", web::post().to(handlers::simulate))
            .route("/history", web::get().to(handlers::history))
            .route("/rewards", web::post().to(handlers::rewards))
            .route("/narration", web::post().to(handlers::narration)),
    );
}

/// Starts the eco-blocks API server.
///
/// Builds the application state from `config` and runs the Actix-Web HTTP
/// server until it is stopped, then gives queued records a short window
/// to be written. The caller provides the async runtime (e.g. via
/// `#[actix_web::main]`) and logger.
///
/// # Errors
///
/// Returns [`ServerError`] if the state cannot be built or the HTTP server
/// fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: AppConfig) -> Result<(), ServerError> {
    let (state, worker) = AppState::from_config(&config).await?;
    let state = web::Data::new(state);

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    let app_state = state.clone();
    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(app_state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await?;

    drop(state);
    if tokio::time::timeout(PERSISTENCE_DRAIN_TIMEOUT, worker)
        .await
        .is_err()
    {
        log::warn!("Timed out waiting for queued records to be written");
    }

    Ok(())
}
