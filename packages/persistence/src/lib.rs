#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Durable storage for simulation and reward records.
//!
//! Writes go through a [`PersistenceStore`]. The server never awaits a
//! store directly on the request path; it hands records to a
//! [`PersistenceSink`], which queues them for a background worker and
//! logs any failure.
//!
//! [`SqliteStore`] is the bundled implementation, backed by
//! `switchy_database` over `SQLite`.

pub mod sink;
pub mod sqlite;

use eco_blocks_simulation::SimulationOutcome;
use eco_blocks_simulation_models::WeeklySummary;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use sink::PersistenceSink;
pub use sqlite::SqliteStore;

/// Default path for the `SQLite` database.
pub const DEFAULT_DB_PATH: &str = "data/eco_blocks.db";

/// User id recorded when a request carries none.
pub const GUEST_USER_ID: &str = "guest";

/// Status of a reward claim that has been recorded but not minted.
pub const REWARD_STATUS_PENDING: &str = "PENDING";

/// Errors from record storage.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// A database query or command failed.
    #[error("Database error: {0}")]
    Database(String),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One completed simulation, as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRecord {
    /// UUID v4.
    pub id: String,
    /// Requesting user, [`GUEST_USER_ID`] when anonymous.
    pub user_id: String,
    /// Client-supplied block identifier, usually `"lat,lon"`.
    pub block_id: String,
    /// Resolved strategy name.
    pub intervention: String,
    /// AQI before the intervention.
    pub current_aqi: f64,
    /// Projected AQI after the intervention.
    pub new_aqi: f64,
    /// AQI points removed.
    pub reduction_amount: f64,
    /// Credits awarded for the reduction.
    pub credits_earned: u32,
    /// Unit cost of the strategy in USD.
    pub estimated_cost: u32,
    /// Narrative headline shown to the user.
    pub headline: String,
    /// Whether the narrative came from the deterministic fallback.
    pub is_fallback_narrative: bool,
    /// Daily AQI series the summaries were computed from.
    pub aqi_history: Vec<f64>,
    /// Weekly AQI summaries.
    pub aqi_summary: Vec<WeeklySummary>,
    /// Weekly traffic speed summaries.
    pub traffic_summary: Vec<WeeklySummary>,
    /// RFC 3339 timestamp.
    pub created_at: String,
}

impl SimulationRecord {
    /// Builds a record for `outcome`, stamped now with a fresh id.
    ///
    /// A missing or blank `user_id` is recorded as [`GUEST_USER_ID`].
    #[must_use]
    pub fn new(
        user_id: Option<&str>,
        block_id: &str,
        current_aqi: f64,
        outcome: &SimulationOutcome,
    ) -> Self {
        let result = &outcome.result;
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: normalize_user_id(user_id),
            block_id: block_id.to_string(),
            intervention: result.strategy.clone(),
            current_aqi,
            new_aqi: result.new_aqi,
            reduction_amount: result.reduction_amount,
            credits_earned: result.credits_earned,
            estimated_cost: result.estimated_cost,
            headline: result.narrative.headline.clone(),
            is_fallback_narrative: result.is_fallback_narrative,
            aqi_history: outcome.aqi_history.clone(),
            aqi_summary: outcome.aqi_summary.clone(),
            traffic_summary: outcome.traffic_summary.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// A reward claim awaiting minting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardRecord {
    /// UUID v4.
    pub id: String,
    /// Claiming user, [`GUEST_USER_ID`] when anonymous.
    pub user_id: String,
    /// Destination wallet, trimmed.
    pub wallet_address: String,
    /// Credits claimed.
    pub total_credits: u32,
    /// Always [`REWARD_STATUS_PENDING`] when created here.
    pub status: String,
    /// RFC 3339 timestamp.
    pub created_at: String,
}

impl RewardRecord {
    /// Builds a [`REWARD_STATUS_PENDING`] claim stamped now.
    #[must_use]
    pub fn pending(user_id: Option<&str>, wallet_address: &str, total_credits: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: normalize_user_id(user_id),
            wallet_address: wallet_address.trim().to_string(),
            total_credits,
            status: REWARD_STATUS_PENDING.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

fn normalize_user_id(user_id: Option<&str>) -> String {
    user_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(GUEST_USER_ID)
        .to_string()
}

/// Append-only record store.
#[async_trait::async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Appends one simulation record.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the write fails.
    async fn insert_simulation(&self, record: &SimulationRecord) -> Result<(), PersistenceError>;

    /// Appends one reward record.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the write fails.
    async fn insert_reward(&self, record: &RewardRecord) -> Result<(), PersistenceError>;
}

#[cfg(test)]
mod tests {
    use eco_blocks_simulation_models::{
        Forecast, NarrativeBlock, SimulationResult, TrendTag,
    };

    use super::*;

    pub(crate) fn outcome() -> SimulationOutcome {
        SimulationOutcome {
            result: SimulationResult {
                strategy: "Green Wall".to_string(),
                new_aqi: 100.2,
                reduction_amount: 19.8,
                credits_earned: 198,
                estimated_cost: 12_000,
                narrative: NarrativeBlock {
                    headline: "Green Wall projected to bring local AQI to 100.2".to_string(),
                    content: "c".to_string(),
                    tech_specs: "t".to_string(),
                    recommendation: "r".to_string(),
                },
                forecast: Forecast {
                    aqi: vec![100.2; 7],
                    traffic: vec![35.0; 7],
                },
                is_fallback_narrative: true,
            },
            aqi_history: vec![120.0; 30],
            aqi_summary: vec![WeeklySummary {
                week_index: 1,
                average_value: 120.0,
                trend_tag: TrendTag::Current,
            }],
            traffic_summary: Vec::new(),
        }
    }

    #[test]
    fn simulation_record_copies_outcome() {
        let record = SimulationRecord::new(Some("user-1"), "40.71280,-74.00600", 120.0, &outcome());
        assert_eq!(record.user_id, "user-1");
        assert_eq!(record.intervention, "Green Wall");
        assert_eq!(record.credits_earned, 198);
        assert!(record.is_fallback_narrative);
        assert_eq!(record.aqi_history.len(), 30);
        assert!(uuid::Uuid::parse_str(&record.id).is_ok());
        assert!(chrono::DateTime::parse_from_rfc3339(&record.created_at).is_ok());
    }

    #[test]
    fn missing_user_is_guest() {
        assert_eq!(SimulationRecord::new(None, "b", 1.0, &outcome()).user_id, GUEST_USER_ID);
        assert_eq!(RewardRecord::pending(Some("  "), "wallet", 5).user_id, GUEST_USER_ID);
    }

    #[test]
    fn reward_is_pending() {
        let reward = RewardRecord::pending(Some("user-1"), " So1anaWa11et ", 198);
        assert_eq!(reward.status, REWARD_STATUS_PENDING);
        assert_eq!(reward.wallet_address, "So1anaWa11et");
        assert_eq!(reward.total_credits, 198);
    }
}
