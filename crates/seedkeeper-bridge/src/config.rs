//! Tunables for a backend bridge.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default number of worker threads per backend connection.
pub const DEFAULT_WORKER_THREADS: usize = 2;
/// Default pause between connection attempts.
pub const DEFAULT_CONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// What happens to a live connection after an operation reports a connection failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconnectPolicy {
    /// Keep the handle; every later operation reuses it.
    Never,
    /// Discard the handle so the next call establishes a fresh connection.
    #[default]
    OnConnectionLoss,
}

/// Runtime parameters for a [`crate::BackendBridge`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Worker threads dedicated to the backend connection.
    pub worker_threads: usize,
    /// Pause between connection attempts.
    #[serde(rename = "connect_backoff_ms", with = "duration_ms")]
    pub connect_backoff: Duration,
    /// Handling of connections that drop after being established.
    pub reconnect: ReconnectPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            worker_threads: DEFAULT_WORKER_THREADS,
            connect_backoff: DEFAULT_CONNECT_BACKOFF,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(
        value: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
