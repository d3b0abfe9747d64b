//! Error types for backend clients and the execution bridge.
//!
//! # Design
//! - `ClientError` is what a backend adapter reports; the bridge never rewrites it.
//! - `BridgeError` tags a client failure with operation context and keeps it as the source.
//! - Messages are constant; operational context lives in fields.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use thiserror::Error;

use crate::model::TorrentId;

/// Boxed error used to carry adapter-specific causes.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Failure reported by a backend client adapter.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The backend could not be reached or refused the session.
    #[error("backend connection failed")]
    Connection {
        /// Transport or handshake failure.
        source: BoxError,
    },
    /// The backend processed the request and reported a failure.
    #[error("backend rejected the request")]
    Rejected {
        /// Result text reported by the backend.
        message: String,
    },
    /// The backend does not know the addressed torrent.
    #[error("torrent not found")]
    NotFound {
        /// Identifier that could not be resolved.
        torrent_id: TorrentId,
    },
    /// The backend answered with a payload the adapter could not interpret.
    #[error("malformed backend response")]
    Protocol {
        /// Decoding failure.
        source: BoxError,
    },
}

impl ClientError {
    /// Wrap a transport-level failure.
    pub fn connection(source: impl Into<BoxError>) -> Self {
        Self::Connection {
            source: source.into(),
        }
    }

    /// Wrap a payload decoding failure.
    pub fn protocol(source: impl Into<BoxError>) -> Self {
        Self::Protocol {
            source: source.into(),
        }
    }

    /// Record a backend-side rejection.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    #[must_use]
    /// Whether the failure indicates the connection itself is unusable.
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

/// Convenience alias for adapter results.
pub type ClientResult<T> = Result<T, ClientError>;

/// Reason a request never reached the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchFailure {
    /// The worker pool no longer accepts work.
    PoolClosed,
    /// The worker dropped the task before producing a result.
    TaskDropped,
}

impl Display for DispatchFailure {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::PoolClosed => formatter.write_str("worker pool closed"),
            Self::TaskDropped => formatter.write_str("worker dropped the task"),
        }
    }
}

/// Primary error type returned by bridged backend operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Connection establishment failed past the caller's deadline.
    #[error("backend connection could not be established")]
    Connect {
        /// Label of the backend endpoint.
        endpoint: String,
        /// Number of attempts made before giving up.
        attempts: u32,
        /// Most recent connection failure.
        #[source]
        source: ClientError,
    },
    /// A dispatched operation failed inside the backend adapter.
    #[error("backend operation failed")]
    Backend {
        /// Operation identifier.
        operation: &'static str,
        /// Torrent identifier when the operation addressed one.
        torrent_id: Option<TorrentId>,
        /// Adapter failure, unmodified.
        #[source]
        source: ClientError,
    },
    /// The request could not be executed by the worker pool.
    #[error("backend dispatch failed")]
    Dispatch {
        /// Operation identifier.
        operation: &'static str,
        /// Why the request was not executed.
        reason: DispatchFailure,
    },
    /// A worker thread for the backend could not be started.
    #[error("failed to spawn backend worker")]
    WorkerSpawn {
        /// Label of the pool being started.
        pool: String,
        /// Underlying OS failure.
        source: std::io::Error,
    },
}

impl BridgeError {
    #[must_use]
    /// Adapter failure underlying this error, if any.
    pub const fn client_error(&self) -> Option<&ClientError> {
        match self {
            Self::Connect { source, .. } | Self::Backend { source, .. } => Some(source),
            Self::Dispatch { .. } | Self::WorkerSpawn { .. } => None,
        }
    }

    #[must_use]
    /// Operation the error was raised for, if any.
    pub const fn operation(&self) -> Option<&'static str> {
        match self {
            Self::Backend { operation, .. } | Self::Dispatch { operation, .. } => Some(*operation),
            Self::Connect { .. } | Self::WorkerSpawn { .. } => None,
        }
    }
}

/// Convenience alias for bridged operation results.
pub type BridgeResult<T> = Result<T, BridgeError>;
