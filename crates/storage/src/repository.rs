//! SQLite Repository Implementation

use crate::StorageError;
use field_selector::SelectedRecord;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Idempotent schema statements, run on every open
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ts TEXT NOT NULL,
        source TEXT NOT NULL,
        latitude REAL,
        longitude REAL,
        water_depth_m REAL,
        water_distance_nm REAL,
        wind_speed_kn REAL,
        wind_angle_deg REAL
    )",
    "CREATE INDEX IF NOT EXISTS records_ts ON records (ts)",
];

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A committed row, as read back from the store. Immutable once written: the
/// table is append-only and nothing here updates or deletes.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct PersistedRow {
    /// Surrogate key; strictly increasing in commit order
    pub id: i64,
    /// RFC 3339 UTC receipt timestamp
    pub ts: String,
    /// Talker+type address of the contributing sentence
    pub source: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub water_depth_m: Option<f64>,
    pub water_distance_nm: Option<f64>,
    pub wind_speed_kn: Option<f64>,
    pub wind_angle_deg: Option<f64>,
}

/// Append-only store over one SQLite file.
///
/// Owns the only connection, so it also owns the only transaction context;
/// callers must not invoke `append` concurrently (the pipeline is a single
/// serial stream).
pub struct TelemetryStore {
    pool: SqlitePool,
}

impl TelemetryStore {
    /// Open the store, creating the file and schema when absent.
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        info!(path = %path.display(), "opened telemetry store");
        Ok(Self { pool })
    }

    /// Append one record in its own transaction.
    ///
    /// Either the row is fully durable and its surrogate id is returned, or
    /// the store is left exactly as it was.
    pub async fn append(&self, record: &SelectedRecord) -> Result<i64, StorageError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "INSERT INTO records (ts, source, latitude, longitude, water_depth_m, \
             water_distance_nm, wind_speed_kn, wind_angle_deg) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.timestamp.to_rfc3339())
        .bind(&record.source)
        .bind(record.latitude)
        .bind(record.longitude)
        .bind(record.water_depth_m)
        .bind(record.water_distance_nm)
        .bind(record.wind_speed_kn)
        .bind(record.wind_angle_deg)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        let id = result.last_insert_rowid();
        debug!(id, source = %record.source, "committed record");
        Ok(id)
    }

    /// Total committed rows
    pub async fn record_count(&self) -> Result<i64, StorageError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await?)
    }

    /// Most recent rows, newest first
    pub async fn recent(&self, limit: i64) -> Result<Vec<PersistedRow>, StorageError> {
        Ok(sqlx::query_as("SELECT * FROM records ORDER BY id DESC LIMIT ?")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Close the pool, checkpointing the WAL.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("telemetry store closed");
    }
}
