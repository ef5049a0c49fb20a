//! services/planner/src/adapters/trip_store.rs
//!
//! This module contains the local storage adapter, which is the concrete
//! implementation of the `TripStorage` port from the `core` crate. It keeps the
//! current trip reference in a one-row SQLite table using `sqlx`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use trip_planner_core::domain::TripId;
use trip_planner_core::ports::{PortError, PortResult, TripStorage};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A storage adapter that implements the `TripStorage` port.
#[derive(Clone)]
pub struct SqliteTripStore {
    pool: SqlitePool,
}

impl SqliteTripStore {
    /// Creates a new `SqliteTripStore` over an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database at `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        ensure_parent_dir(database_url)?;
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // One connection: `sqlite::memory:` databases are per connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn ensure_parent_dir(database_url: &str) -> Result<(), sqlx::Error> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);
    if path.starts_with(":memory:") || path.starts_with("memory") {
        return Ok(());
    }
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct TripReferenceRecord {
    trip_id: String,
}

impl TripReferenceRecord {
    fn to_domain(self) -> TripId {
        TripId::new(self.trip_id)
    }
}

//=========================================================================================
// `TripStorage` Trait Implementation
//=========================================================================================

#[async_trait]
impl TripStorage for SqliteTripStore {
    async fn get(&self) -> PortResult<Option<TripId>> {
        let record = sqlx::query_as::<_, TripReferenceRecord>(
            "SELECT trip_id FROM trip_reference WHERE slot = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(record.map(TripReferenceRecord::to_domain))
    }

    async fn save(&self, trip_id: &TripId) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO trip_reference (slot, trip_id, saved_at) VALUES (1, ?, ?)
             ON CONFLICT (slot) DO UPDATE SET trip_id = excluded.trip_id, saved_at = excluded.saved_at",
        )
        .bind(trip_id.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(())
    }
}
