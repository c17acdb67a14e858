//! Storage Layer
//!
//! SQLite persistence for selected telemetry rows, repository pattern.

mod repository;

pub use repository::{PersistedRow, TelemetryStore};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
