//! Application configuration model and validation.
//!
//! # Design
//! - One JSON document describes logging and every bridged backend.
//! - Omitted fields fall back to defaults; validation runs once after parsing.

use std::collections::HashSet;

use seedkeeper_bridge::BridgeConfig;
use seedkeeper_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha};
use seedkeeper_torrent_core::BackendEndpoint;
use seedkeeper_transmission::TransmissionConfig;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Default host for backends that omit one.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default Transmission RPC port.
pub const DEFAULT_PORT: u16 = 9091;

/// Top-level application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Log output format; inferred from the build profile when absent.
    pub log_format: Option<LogFormat>,
    /// Backends to bridge, in registration order.
    pub backends: Vec<BackendConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_owned(),
            log_format: None,
            backends: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Parse and validate a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or fails validation.
    pub fn from_json(document: &str) -> AppResult<Self> {
        let config: Self =
            serde_json::from_str(document).map_err(|source| AppError::ConfigParse { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Check backend names and per-backend tunables.
    ///
    /// # Errors
    ///
    /// Returns the first invalid backend entry encountered.
    pub fn validate(&self) -> AppResult<()> {
        let mut seen = HashSet::new();
        for backend in &self.backends {
            backend.validate()?;
            if !seen.insert(backend.name.as_str()) {
                return Err(AppError::invalid(&backend.name, "name", "must be unique"));
            }
        }
        Ok(())
    }

    /// Logging settings derived from this configuration.
    #[must_use]
    pub fn logging(&self) -> LoggingConfig<'_> {
        LoggingConfig {
            level: &self.log_level,
            format: self.log_format.unwrap_or_else(LogFormat::infer),
            build_sha: build_sha(),
        }
    }
}

/// Backend engine implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Remote `transmission-daemon` reached over RPC.
    Transmission,
    /// In-process engine.
    Memory,
}

impl BackendKind {
    const fn is_remote(self) -> bool {
        matches!(self, Self::Transmission)
    }
}

/// Settings for one bridged backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Unique name used for lookup.
    pub name: String,
    /// Engine implementation.
    pub kind: BackendKind,
    /// Host of the backend.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port of the backend.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Optional username.
    #[serde(default)]
    pub username: Option<String>,
    /// Optional password.
    #[serde(default)]
    pub password: Option<String>,
    /// Worker pool and reconnection tunables.
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// Transport settings, used by `transmission` backends.
    #[serde(default)]
    pub transmission: TransmissionConfig,
}

fn default_host() -> String {
    DEFAULT_HOST.to_owned()
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

impl BackendConfig {
    /// Backend of `kind` named `name` with default connection settings.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: BackendKind) -> Self {
        Self {
            name: name.into(),
            kind,
            host: default_host(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            bridge: BridgeConfig::default(),
            transmission: TransmissionConfig::default(),
        }
    }

    /// Endpoint the bridge binds to.
    #[must_use]
    pub fn endpoint(&self) -> BackendEndpoint {
        BackendEndpoint::new(
            self.host.clone(),
            self.port,
            self.username.clone(),
            self.password.clone(),
        )
    }

    fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::invalid(&self.name, "name", "must not be empty"));
        }
        if self.bridge.worker_threads == 0 {
            return Err(AppError::invalid(
                &self.name,
                "bridge.worker_threads",
                "must be at least 1",
            ));
        }
        if self.kind.is_remote() {
            if self.host.trim().is_empty() {
                return Err(AppError::invalid(&self.name, "host", "must not be empty"));
            }
            if self.port == 0 {
                return Err(AppError::invalid(&self.name, "port", "must be non-zero"));
            }
        }
        Ok(())
    }
}
