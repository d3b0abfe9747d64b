//! Startup sequence: logging, backend construction and initial connection.

use seedkeeper_torrent_core::Deadline;
use tracing::info;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::registry::BackendRegistry;

/// Install the global tracing subscriber described by `config`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(config: &AppConfig) -> AppResult<()> {
    seedkeeper_telemetry::init_logging(&config.logging())
        .map_err(|source| AppError::Telemetry {
            operation: "telemetry.init",
            source,
        })
}

/// Build every configured backend and connect them before `deadline`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, a bridge cannot start, or any
/// backend stays unreachable past `deadline`.
pub async fn start(config: &AppConfig, deadline: Deadline) -> AppResult<BackendRegistry> {
    let registry = BackendRegistry::from_config(config)?;
    info!(backends = registry.len(), "seedkeeper backends starting");
    registry.ensure_all_connected(deadline).await?;
    info!(backends = registry.len(), "seedkeeper backends ready");
    Ok(registry)
}
