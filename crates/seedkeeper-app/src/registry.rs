//! Named collection of bridged backends.
//!
//! # Design
//! - Every backend is held behind `Arc<dyn TorrentBackend>` so callers never see the
//!   adapter type.
//! - Registration order follows the configuration document.
//! - Connecting runs every backend concurrently and reports each failure by name.

use std::sync::Arc;

use seedkeeper_bridge::{BackendBridge, MemoryConnector};
use seedkeeper_torrent_core::{
    BridgeError, BridgeResult, Deadline, DispatchFailure, TorrentBackend,
};
use seedkeeper_transmission::TransmissionConnector;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::{AppConfig, BackendConfig, BackendKind};
use crate::error::{AppError, AppResult, BackendFailure};

/// Backends addressable by configured name.
#[derive(Default)]
pub struct BackendRegistry {
    backends: Vec<(String, Arc<dyn TorrentBackend>)>,
}

impl BackendRegistry {
    /// Build a bridge for every backend in `config`.
    ///
    /// No connection is attempted; see [`Self::ensure_all_connected`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a bridge cannot start its
    /// worker threads.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;
        let mut registry = Self::default();
        for backend in &config.backends {
            registry.insert(backend.name.clone(), build_backend(backend)?)?;
        }
        Ok(registry)
    }

    /// Register `backend` under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is already registered.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        backend: Arc<dyn TorrentBackend>,
    ) -> AppResult<()> {
        let name = name.into();
        if self.contains(&name) {
            return Err(AppError::invalid(name, "name", "must be unique"));
        }
        self.backends.push((name, backend));
        Ok(())
    }

    /// Backend registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if no backend has that name.
    pub fn get(&self, name: &str) -> AppResult<Arc<dyn TorrentBackend>> {
        self.backends
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, backend)| Arc::clone(backend))
            .ok_or_else(|| AppError::UnknownBackend {
                name: name.to_owned(),
            })
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.backends.iter().any(|(candidate, _)| candidate == name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.backends.iter().map(|(name, _)| name.as_str())
    }

    /// Registered backends in registration order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Arc<dyn TorrentBackend>)> {
        self.backends
            .iter()
            .map(|(name, backend)| (name.as_str(), backend))
    }

    /// Number of registered backends.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.backends.len()
    }

    /// Whether no backend is registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Connect every backend concurrently, each retrying until `deadline`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unreachable`] listing every backend that failed to connect.
    pub async fn ensure_all_connected(&self, deadline: Deadline) -> AppResult<()> {
        let mut tasks = JoinSet::new();
        for (index, (_, backend)) in self.backends.iter().enumerate() {
            let backend = Arc::clone(backend);
            tasks.spawn(async move { (index, backend.ensure_connected(deadline).await) });
        }

        let mut outcomes: Vec<Option<BridgeResult<()>>> =
            self.backends.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(err) => warn!(error = %err, "backend connect task aborted"),
            }
        }

        let mut failures = Vec::new();
        for ((name, backend), outcome) in self.backends.iter().zip(outcomes) {
            let error = match outcome {
                Some(Ok(())) => {
                    info!(
                        backend = %name,
                        endpoint = %backend.endpoint().label(),
                        "backend connected"
                    );
                    continue;
                }
                Some(Err(error)) => error,
                None => BridgeError::Dispatch {
                    operation: "ensure_connected",
                    reason: DispatchFailure::TaskDropped,
                },
            };
            warn!(backend = %name, error = %error, "backend unreachable");
            failures.push(BackendFailure {
                backend: name.clone(),
                error,
            });
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(AppError::Unreachable { failures })
        }
    }
}

fn build_backend(config: &BackendConfig) -> AppResult<Arc<dyn TorrentBackend>> {
    let endpoint = config.endpoint();
    let built: BridgeResult<Arc<dyn TorrentBackend>> = match config.kind {
        BackendKind::Transmission => BackendBridge::new(
            endpoint,
            TransmissionConnector::new(config.transmission.clone()),
            &config.bridge,
        )
        .map(|bridge| Arc::new(bridge) as Arc<dyn TorrentBackend>),
        BackendKind::Memory => {
            BackendBridge::new(endpoint, MemoryConnector::default(), &config.bridge)
                .map(|bridge| Arc::new(bridge) as Arc<dyn TorrentBackend>)
        }
    };
    built.map_err(|source| AppError::Bridge {
        backend: config.name.clone(),
        source,
    })
}
