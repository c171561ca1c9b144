//! `SQLite`-backed [`PersistenceStore`].

use std::path::Path;

use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};
use switchy_database_connection::init_sqlite_rusqlite;

use crate::{PersistenceError, PersistenceStore, RewardRecord, SimulationRecord};

/// Record store over a single `SQLite` file.
pub struct SqliteStore {
    db: Box<dyn Database>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and ensures the schema
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the parent directory cannot be
    /// created, the database cannot be opened, or schema creation fails.
    pub async fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db =
            init_sqlite_rusqlite(Some(path)).map_err(|e| PersistenceError::Database(e.to_string()))?;

        ensure_schema(db.as_ref()).await?;
        log::info!("Opened record store at {}", path.display());

        Ok(Self { db })
    }

    /// Returns up to `limit` of the user's simulations, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the query fails or a stored JSON
    /// column cannot be decoded.
    pub async fn recent_simulations(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<SimulationRecord>, PersistenceError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT id, user_id, block_id, intervention, current_aqi, new_aqi,
                        reduction_amount, credits_earned, estimated_cost, headline,
                        is_fallback_narrative, aqi_history, aqi_summary,
                        traffic_summary, created_at
                 FROM simulations
                 WHERE user_id = $1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT $2",
                &[
                    DatabaseValue::String(user_id.to_string()),
                    DatabaseValue::Int32(i32::try_from(limit).unwrap_or(i32::MAX)),
                ],
            )
            .await
            .map_err(|e| PersistenceError::Database(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let aqi_history: String = row.to_value("aqi_history").unwrap_or_default();
            let aqi_summary: String = row.to_value("aqi_summary").unwrap_or_default();
            let traffic_summary: String = row.to_value("traffic_summary").unwrap_or_default();
            let credits_earned: i64 = row.to_value("credits_earned").unwrap_or(0);
            let estimated_cost: i64 = row.to_value("estimated_cost").unwrap_or(0);
            let is_fallback: i64 = row.to_value("is_fallback_narrative").unwrap_or(0);

            records.push(SimulationRecord {
                id: row.to_value("id").unwrap_or_default(),
                user_id: row.to_value("user_id").unwrap_or_default(),
                block_id: row.to_value("block_id").unwrap_or_default(),
                intervention: row.to_value("intervention").unwrap_or_default(),
                current_aqi: row.to_value("current_aqi").unwrap_or(0.0),
                new_aqi: row.to_value("new_aqi").unwrap_or(0.0),
                reduction_amount: row.to_value("reduction_amount").unwrap_or(0.0),
                credits_earned: u32::try_from(credits_earned).unwrap_or(0),
                estimated_cost: u32::try_from(estimated_cost).unwrap_or(0),
                headline: row.to_value("headline").unwrap_or_default(),
                is_fallback_narrative: is_fallback != 0,
                aqi_history: decode_json_column(&aqi_history)?,
                aqi_summary: decode_json_column(&aqi_summary)?,
                traffic_summary: decode_json_column(&traffic_summary)?,
                created_at: row.to_value("created_at").unwrap_or_default(),
            });
        }

        Ok(records)
    }

    /// Returns all reward claims for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the query fails.
    pub async fn rewards_for(&self, user_id: &str) -> Result<Vec<RewardRecord>, PersistenceError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT id, user_id, wallet_address, total_credits, status, created_at
                 FROM user_rewards
                 WHERE user_id = $1
                 ORDER BY created_at DESC, rowid DESC",
                &[DatabaseValue::String(user_id.to_string())],
            )
            .await
            .map_err(|e| PersistenceError::Database(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| {
                let total_credits: i64 = row.to_value("total_credits").unwrap_or(0);
                RewardRecord {
                    id: row.to_value("id").unwrap_or_default(),
                    user_id: row.to_value("user_id").unwrap_or_default(),
                    wallet_address: row.to_value("wallet_address").unwrap_or_default(),
                    total_credits: u32::try_from(total_credits).unwrap_or(0),
                    status: row.to_value("status").unwrap_or_default(),
                    created_at: row.to_value("created_at").unwrap_or_default(),
                }
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl PersistenceStore for SqliteStore {
    async fn insert_simulation(&self, record: &SimulationRecord) -> Result<(), PersistenceError> {
        self.db
            .exec_raw_params(
                "INSERT INTO simulations (
                    id, user_id, block_id, intervention, current_aqi, new_aqi,
                    reduction_amount, credits_earned, estimated_cost, headline,
                    is_fallback_narrative, aqi_history, aqi_summary,
                    traffic_summary, created_at
                 ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
                &[
                    DatabaseValue::String(record.id.clone()),
                    DatabaseValue::String(record.user_id.clone()),
                    DatabaseValue::String(record.block_id.clone()),
                    DatabaseValue::String(record.intervention.clone()),
                    DatabaseValue::Real64(record.current_aqi),
                    DatabaseValue::Real64(record.new_aqi),
                    DatabaseValue::Real64(record.reduction_amount),
                    DatabaseValue::Int64(i64::from(record.credits_earned)),
                    DatabaseValue::Int64(i64::from(record.estimated_cost)),
                    DatabaseValue::String(record.headline.clone()),
                    DatabaseValue::Int64(i64::from(record.is_fallback_narrative)),
                    DatabaseValue::String(serde_json::to_string(&record.aqi_history)?),
                    DatabaseValue::String(serde_json::to_string(&record.aqi_summary)?),
                    DatabaseValue::String(serde_json::to_string(&record.traffic_summary)?),
                    DatabaseValue::String(record.created_at.clone()),
                ],
            )
            .await
            .map_err(|e| PersistenceError::Database(e.to_string()))?;

        log::debug!(
            "Stored simulation {} for user {}",
            record.id,
            record.user_id
        );
        Ok(())
    }

    async fn insert_reward(&self, record: &RewardRecord) -> Result<(), PersistenceError> {
        self.db
            .exec_raw_params(
                "INSERT INTO user_rewards (id, user_id, wallet_address, total_credits, status, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6)",
                &[
                    DatabaseValue::String(record.id.clone()),
                    DatabaseValue::String(record.user_id.clone()),
                    DatabaseValue::String(record.wallet_address.clone()),
                    DatabaseValue::Int64(i64::from(record.total_credits)),
                    DatabaseValue::String(record.status.clone()),
                    DatabaseValue::String(record.created_at.clone()),
                ],
            )
            .await
            .map_err(|e| PersistenceError::Database(e.to_string()))?;

        log::debug!("Stored reward {} for user {}", record.id, record.user_id);
        Ok(())
    }
}

/// Creates all tables if they don't already exist.
async fn ensure_schema(db: &dyn Database) -> Result<(), PersistenceError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS simulations (
            id                    TEXT PRIMARY KEY,
            user_id               TEXT NOT NULL,
            block_id              TEXT NOT NULL,
            intervention          TEXT NOT NULL,
            current_aqi           REAL NOT NULL,
            new_aqi               REAL NOT NULL,
            reduction_amount      REAL NOT NULL,
            credits_earned        INTEGER NOT NULL,
            estimated_cost        INTEGER NOT NULL,
            headline              TEXT NOT NULL,
            is_fallback_narrative INTEGER NOT NULL,
            aqi_history           TEXT NOT NULL,
            aqi_summary           TEXT NOT NULL,
            traffic_summary       TEXT NOT NULL,
            created_at            TEXT NOT NULL
        )",
    )
    .await
    .map_err(|e| PersistenceError::Database(e.to_string()))?;

    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_simulations_user_created
         ON simulations (user_id, created_at)",
    )
    .await
    .map_err(|e| PersistenceError::Database(e.to_string()))?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS user_rewards (
            id             TEXT PRIMARY KEY,
            user_id        TEXT NOT NULL,
            wallet_address TEXT NOT NULL,
            total_credits  INTEGER NOT NULL,
            status         TEXT NOT NULL,
            created_at     TEXT NOT NULL
        )",
    )
    .await
    .map_err(|e| PersistenceError::Database(e.to_string()))?;

    Ok(())
}

fn decode_json_column<T: serde::de::DeserializeOwned + Default>(
    raw: &str,
) -> Result<T, PersistenceError> {
    if raw.is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(raw)?)
}
