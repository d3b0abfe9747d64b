//! Connection settings for a Transmission daemon.

use std::time::Duration;

use seedkeeper_torrent_core::BackendEndpoint;
use serde::{Deserialize, Serialize};

/// Default RPC endpoint path exposed by `transmission-daemon`.
pub const DEFAULT_RPC_PATH: &str = "/transmission/rpc";
/// Default bound on a single RPC round trip.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Transport parameters shared by every session a connector opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransmissionConfig {
    /// Path of the RPC endpoint on the daemon.
    pub rpc_path: String,
    /// Bound on a single RPC round trip, serialized in seconds.
    #[serde(rename = "request_timeout_secs", with = "duration_secs")]
    pub request_timeout: Duration,
    /// Use `https` instead of `http`.
    pub use_tls: bool,
}

impl Default for TransmissionConfig {
    fn default() -> Self {
        Self {
            rpc_path: DEFAULT_RPC_PATH.to_owned(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            use_tls: false,
        }
    }
}

impl TransmissionConfig {
    /// RPC URL for `endpoint`.
    #[must_use]
    pub fn rpc_url(&self, endpoint: &BackendEndpoint) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        let path = self.rpc_path.trim_start_matches('/');
        format!("{scheme}://{}/{path}", endpoint.label())
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(
        value: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rpc_url_brackets_ipv6_hosts() {
        let config = TransmissionConfig::default();
        let v4 = BackendEndpoint::new("10.0.0.5", 9091, None, None);
        let v6 = BackendEndpoint::new("::1", 9091, None, None);
        assert_eq!(config.rpc_url(&v4), "http://10.0.0.5:9091/transmission/rpc");
        assert_eq!(config.rpc_url(&v6), "http://[::1]:9091/transmission/rpc");
    }

    #[test]
    fn tls_and_custom_path_are_honoured() -> anyhow::Result<()> {
        let config: TransmissionConfig = serde_json::from_value(json!({
            "rpc_path": "rpc",
            "use_tls": true,
            "request_timeout_secs": 5
        }))?;
        let endpoint = BackendEndpoint::new("seedbox.local", 443, None, None);
        assert_eq!(config.rpc_url(&endpoint), "https://seedbox.local:443/rpc");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        Ok(())
    }
}
