//! NMEA Logger Daemon
//!
//! Supervises the socket → decode → select → store pipeline and carries the
//! daemon's configuration and logging setup.

mod config;
mod pipeline;

pub use config::LoggerConfig;
pub use pipeline::{Pipeline, PipelineStats};

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging to the process output streams. `RUST_LOG` overrides the
/// default `info` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_target(true).finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}
