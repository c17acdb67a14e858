//! Daemon Configuration
//!
//! Loaded once at startup into an immutable value that is handed to
//! `Pipeline::new`; inner components never read configuration ad hoc.

use config::{Config, ConfigError, Environment, File};
use nmea_protocol::Backoff;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for the logger daemon
#[derive(Debug, Clone, Deserialize)]
pub struct LoggerConfig {
    /// NMEA source host
    pub host: String,
    /// NMEA source TCP port; 10110 is the customary NMEA-over-TCP port
    pub port: u16,
    /// SQLite file path
    pub storage_path: PathBuf,
    /// First reconnect delay, milliseconds
    pub reconnect_backoff_initial_ms: u64,
    /// Reconnect delay cap, seconds
    pub reconnect_backoff_max_secs: u64,
    /// Socket read timeout, seconds; detects a silently-dead peer
    pub read_timeout_secs: u64,
    /// Immediate retries for a failed append before the fault is fatal
    pub storage_retries: u32,
}

impl LoggerConfig {
    /// Load from an optional `nmea-logger.toml` in the working directory plus
    /// `NMEA_LOGGER_*` environment variables. `host` has no default.
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("port", 10110)?
            .set_default("storage_path", "nmea-log.db")?
            .set_default("reconnect_backoff_initial_ms", 500)?
            .set_default("reconnect_backoff_max_secs", 60)?
            .set_default("read_timeout_secs", 30)?
            .set_default("storage_retries", 3)?
            .add_source(File::with_name("nmea-logger").required(false))
            .add_source(Environment::with_prefix("NMEA_LOGGER"))
            .build()?
            .try_deserialize()
    }

    /// Reconnect backoff seeded from the configured constants
    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.reconnect_backoff_initial_ms),
            Duration::from_secs(self.reconnect_backoff_max_secs),
        )
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}
