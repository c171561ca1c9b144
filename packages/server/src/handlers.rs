//! HTTP handler functions for the eco-blocks API.

use std::time::Duration;

use actix_web::{HttpResponse, web};
use eco_blocks_block_models::{Coordinate, DensityLabel, TrafficLabel};
use eco_blocks_geocoder::GeocodeError;
use eco_blocks_persistence::{GUEST_USER_ID, RewardRecord, SimulationRecord};
use eco_blocks_server_models::{
    ApiBlockState, ApiError, ApiHealth, ApiRewardClaim, BlockDataParams, GeocodeParams,
    HistoryParams, NarrationRequest, RewardRequest, SimulateRequest,
};
use eco_blocks_simulation::history::SERIES_DAYS;
use eco_blocks_simulation_models::SimulationInput;

use crate::AppState;

/// Simulations returned by the history endpoint.
const HISTORY_LIMIT: u32 = 10;

/// Upper bound on the AQI history fetch made for a simulation.
const HISTORY_FETCH_TIMEOUT: Duration = Duration::from_secs(8);

/// Suffix the block-data endpoint adds to estimated traffic labels.
const ESTIMATED_SUFFIX: &str = "(Est)";

fn bad_request(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiError::new(message))
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/block-data?lat=&lon=`
///
/// Returns the environmental snapshot for a coordinate. Provider failures
/// are reported through `provenance`, never as an error status.
pub async fn block_data(
    state: web::Data<AppState>,
    params: web::Query<BlockDataParams>,
) -> HttpResponse {
    let coordinate = match Coordinate::from_parts(params.lat, params.lon) {
        Ok(c) => c,
        Err(e) => return bad_request(e.to_string()),
    };

    let block = state.aggregator.aggregate(&coordinate).await;
    HttpResponse::Ok().json(ApiBlockState::from(block))
}

/// `GET /api/geocode?q=`
///
/// Resolves a place name to a ranked hit list.
pub async fn geocode(
    state: web::Data<AppState>,
    params: web::Query<GeocodeParams>,
) -> HttpResponse {
    let query = params.q.as_deref().unwrap_or_default();

    match state.geocoder.resolve(query).await {
        Ok(hits) => HttpResponse::Ok().json(hits),
        Err(e @ GeocodeError::InvalidInput { .. }) => bad_request(e.to_string()),
        Err(e @ GeocodeError::NotFound { .. }) => {
            HttpResponse::NotFound().json(ApiError::new(e.to_string()))
        }
        Err(e) => {
            log::error!("Geocoding '{query}' failed: {e}");
            HttpResponse::BadGateway().json(ApiError::new("Geocoding failed"))
        }
    }
}

/// `POST /api/simulate`
///
/// Runs an intervention simulation. The response is built before the
/// record is queued for storage, and storage never affects it.
pub async fn simulate(
    state: web::Data<AppState>,
    body: web::Json<SimulateRequest>,
) -> HttpResponse {
    let request = body.into_inner();

    let Some(current_aqi) = request.current_aqi else {
        return bad_request("Missing currentAqi");
    };
    let density = match request.density.as_deref().map(str::trim) {
        None | Some("") => DensityLabel::Low,
        Some(raw) => match raw.parse::<DensityLabel>() {
            Ok(d) => d,
            Err(_) => return bad_request(format!("Unknown density label '{raw}'")),
        },
    };
    let coordinate = match (request.lat, request.lon) {
        (None, None) => None,
        (lat, lon) => match Coordinate::from_parts(lat, lon) {
            Ok(c) => Some(c),
            Err(e) => return bad_request(e.to_string()),
        },
    };

    let block_id = request
        .block_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .or_else(|| coordinate.map(|c| c.to_string()))
        .unwrap_or_else(|| "unknown".to_string());

    let aqi_history = match request.aqi_history.filter(|h| !h.is_empty()) {
        Some(history) => history,
        None => match &coordinate {
            Some(c) => fetch_aqi_history(&state, c).await,
            None => Vec::new(),
        },
    };

    let input = SimulationInput {
        location: block_id.clone(),
        intervention: request.intervention,
        current_aqi,
        density,
        area_type: request.area_type.filter(|a| !a.trim().is_empty()),
        traffic: request.traffic.as_deref().and_then(parse_traffic_label),
        traffic_speed: request.traffic_speed,
        aqi_history,
        traffic_history: request.traffic_history.unwrap_or_default(),
    };

    let outcome = match state.engine.simulate(&input).await {
        Ok(outcome) => outcome,
        Err(e) => return bad_request(e.to_string()),
    };

    let response = HttpResponse::Ok().json(&outcome.result);

    state.sink.dispatch_simulation(SimulationRecord::new(
        request.user_id.as_deref(),
        &block_id,
        current_aqi,
        &outcome,
    ));

    response
}

/// Fetches the block's recent daily AQI, or nothing on failure.
async fn fetch_aqi_history(state: &AppState, coordinate: &Coordinate) -> Vec<f64> {
    let days = u32::try_from(SERIES_DAYS).unwrap_or(u32::MAX);
    let provider = state.air_quality.name();

    match tokio::time::timeout(
        HISTORY_FETCH_TIMEOUT,
        state.air_quality.fetch_history(coordinate, days),
    )
    .await
    {
        Ok(Ok(history)) => history,
        Ok(Err(e)) => {
            log::warn!("{provider} history unavailable for {coordinate}: {e}");
            Vec::new()
        }
        Err(_) => {
            log::warn!("{provider} history timed out for {coordinate}");
            Vec::new()
        }
    }
}

/// Parses a traffic label as shown by the block-data endpoint.
fn parse_traffic_label(raw: &str) -> Option<TrafficLabel> {
    let label = raw.trim();
    let label = label
        .strip_suffix(ESTIMATED_SUFFIX)
        .map_or(label, str::trim_end);
    label.parse().ok()
}

/// `GET /api/history?userId=`
///
/// Returns the user's most recent simulations, newest first.
pub async fn history(
    state: web::Data<AppState>,
    params: web::Query<HistoryParams>,
) -> HttpResponse {
    let user_id = params
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(GUEST_USER_ID);

    match state.store.recent_simulations(user_id, HISTORY_LIMIT).await {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(e) => {
            log::error!("Failed to load history for {user_id}: {e}");
            HttpResponse::InternalServerError().json(ApiError::new("Failed to load history"))
        }
    }
}

/// `POST /api/rewards`
///
/// Records a pending reward claim. The claim is queued for storage and
/// acknowledged immediately.
pub async fn rewards(state: web::Data<AppState>, body: web::Json<RewardRequest>) -> HttpResponse {
    let request = body.into_inner();

    if request.wallet_address.trim().is_empty() {
        return bad_request("Missing walletAddress");
    }
    if request.credits == 0 {
        return bad_request("credits must be positive");
    }

    let record = RewardRecord::pending(
        request.user_id.as_deref(),
        &request.wallet_address,
        request.credits,
    );
    let claim = ApiRewardClaim {
        id: record.id.clone(),
        status: record.status.clone(),
    };
    state.sink.dispatch_reward(record);

    HttpResponse::Accepted().json(claim)
}

/// `POST /api/narration`
///
/// Synthesizes speech for a narrative headline, returning MP3 audio.
pub async fn narration(
    state: web::Data<AppState>,
    body: web::Json<NarrationRequest>,
) -> HttpResponse {
    let Some(speech) = &state.speech else {
        return HttpResponse::ServiceUnavailable().json(ApiError::new("Narration is disabled"));
    };
    if body.text.trim().is_empty() {
        return bad_request("Missing text");
    }

    match tokio::time::timeout(state.narration_timeout, speech.synthesize(&body.text)).await {
        Ok(Ok(audio)) => HttpResponse::Ok().content_type("audio/mpeg").body(audio),
        Ok(Err(e)) => {
            log::error!("Narration failed: {e}");
            HttpResponse::BadGateway().json(ApiError::new("Narration failed"))
        }
        Err(_) => {
            log::error!(
                "Narration timed out after {}ms",
                state.narration_timeout.as_millis()
            );
            HttpResponse::BadGateway().json(ApiError::new("Narration timed out"))
        }
    }
}
