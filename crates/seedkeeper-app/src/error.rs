//! # Design
//!
//! - Centralize application-level errors for configuration and backend wiring.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use seedkeeper_telemetry::TelemetryError;
use seedkeeper_torrent_core::BridgeError;
use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// The configuration document could not be parsed.
    #[error("configuration document is malformed")]
    ConfigParse {
        /// Source decoding error.
        source: serde_json::Error,
    },
    /// A backend entry failed validation.
    #[error("invalid backend configuration")]
    InvalidBackend {
        /// Name of the offending backend (may be empty).
        backend: String,
        /// Field that failed validation.
        field: &'static str,
        /// Human-readable reason.
        reason: &'static str,
    },
    /// No backend is registered under the requested name.
    #[error("unknown backend")]
    UnknownBackend {
        /// Name that was looked up.
        name: String,
    },
    /// A backend bridge could not be constructed.
    #[error("backend bridge could not be built")]
    Bridge {
        /// Name of the backend.
        backend: String,
        /// Source bridge error.
        source: BridgeError,
    },
    /// One or more backends could not be connected.
    #[error("backends unreachable")]
    Unreachable {
        /// Per-backend failures, in registration order.
        failures: Vec<BackendFailure>,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: TelemetryError,
    },
}

/// Connection failure recorded for a single backend.
#[derive(Debug)]
pub struct BackendFailure {
    /// Backend name.
    pub backend: String,
    /// Failure reported by the backend bridge.
    pub error: BridgeError,
}

impl AppError {
    pub(crate) fn invalid(
        backend: impl Into<String>,
        field: &'static str,
        reason: &'static str,
    ) -> Self {
        Self::InvalidBackend {
            backend: backend.into(),
            field,
            reason,
        }
    }

    /// Names of the backends that failed to connect, when this is an `Unreachable` error.
    #[must_use]
    pub fn unreachable_backends(&self) -> Vec<&str> {
        match self {
            Self::Unreachable { failures } => failures
                .iter()
                .map(|failure| failure.backend.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }
}
