//! Core torrent domain types and DTOs shared across the workspace.

use std::fmt::{self, Display, Formatter};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier accepted by backends when addressing a torrent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TorrentId {
    /// Backend-assigned numeric identifier.
    Id(i64),
    /// Hex-encoded info hash.
    Hash(String),
}

impl TorrentId {
    #[must_use]
    /// Convenience constructor for info-hash identifiers.
    pub fn hash(value: impl Into<String>) -> Self {
        Self::Hash(value.into())
    }
}

impl From<i64> for TorrentId {
    fn from(value: i64) -> Self {
        Self::Id(value)
    }
}

impl Display for TorrentId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(formatter, "{id}"),
            Self::Hash(hash) => formatter.write_str(hash),
        }
    }
}

/// Listening endpoint reported by a backend, rendered for labels and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenEndpoint {
    /// Interface address; IPv6 literals are stored without brackets.
    pub host: String,
    /// Listening port.
    pub port: u16,
}

impl ListenEndpoint {
    #[must_use]
    /// Build an endpoint from its host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    #[must_use]
    /// Stable key suitable for metric or status maps.
    pub fn key(&self) -> String {
        format!("listen_{}_{}", self.host, self.port)
    }

    #[must_use]
    /// Human-readable `host:port`, bracketing IPv6 literals.
    pub fn label(&self) -> String {
        format_host_port(&self.host, self.port)
    }
}

fn format_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Immutable identity of a backend connection.
#[derive(Clone, PartialEq, Eq)]
pub struct BackendEndpoint {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<String>,
}

impl BackendEndpoint {
    #[must_use]
    /// Build an endpoint with optional credentials.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username,
            password,
        }
    }

    #[must_use]
    /// Host name or address of the backend.
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    /// Port the backend listens on.
    pub const fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    /// Username, when the backend requires authentication.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    #[must_use]
    /// Password, when the backend requires authentication.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    #[must_use]
    /// `host:port` label used in log fields and worker thread names.
    pub fn label(&self) -> String {
        format_host_port(&self.host, self.port)
    }
}

impl fmt::Debug for BackendEndpoint {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("BackendEndpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Horizon used when a requested timeout overflows the monotonic clock.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Point in time after which connection retries stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(Instant);

impl Deadline {
    #[must_use]
    /// Deadline at an explicit monotonic instant.
    pub const fn at(instant: Instant) -> Self {
        Self(instant)
    }

    #[must_use]
    /// Deadline `timeout` from now.
    ///
    /// Timeouts beyond the clock's range saturate to a deadline roughly a century away.
    pub fn after(timeout: Duration) -> Self {
        let now = Instant::now();
        Self(
            now.checked_add(timeout)
                .or_else(|| now.checked_add(FAR_FUTURE))
                .unwrap_or(now),
        )
    }

    #[must_use]
    /// Deadline that has already passed; permits exactly one attempt.
    pub fn expired() -> Self {
        Self(Instant::now())
    }

    #[must_use]
    /// Translate a wall-clock deadline into the monotonic clock.
    ///
    /// Wall-clock values in the past yield an already-expired deadline.
    pub fn from_wall_clock(at: DateTime<Utc>) -> Self {
        let remaining = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        Self::after(remaining)
    }

    #[must_use]
    /// Underlying monotonic instant.
    pub const fn instant(self) -> Instant {
        self.0
    }

    #[must_use]
    /// Whether `now` is at or beyond the deadline.
    pub fn has_passed_at(self, now: Instant) -> bool {
        now >= self.0
    }

    #[must_use]
    /// Whether the deadline has passed.
    pub fn has_passed(self) -> bool {
        self.has_passed_at(Instant::now())
    }
}

/// Lifecycle state reported by a backend for a torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentState {
    /// Torrent is paused.
    Stopped,
    /// Waiting in the verification queue.
    QueuedCheck,
    /// Verifying local data.
    Checking,
    /// Waiting in the download queue.
    QueuedDownload,
    /// Actively downloading.
    Downloading,
    /// Waiting in the seeding queue.
    QueuedSeed,
    /// Actively seeding.
    Seeding,
}

impl TorrentState {
    #[must_use]
    /// Whether the backend considers the torrent started.
    pub const fn is_started(self) -> bool {
        !matches!(self, Self::Stopped)
    }
}

/// Backend field view of a single torrent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentSnapshot {
    /// Backend-assigned numeric identifier.
    pub id: i64,
    /// Hex-encoded info hash.
    pub info_hash: String,
    /// Display name (top-level path component).
    pub name: String,
    /// Current lifecycle state.
    pub state: TorrentState,
    /// Directory the payload lives under.
    pub download_dir: String,
    /// Completion ratio in `0.0..=1.0`.
    pub percent_done: f64,
    /// Total payload size in bytes.
    pub total_size: u64,
    /// Current download rate in bytes per second.
    pub rate_download: u64,
    /// Current upload rate in bytes per second.
    pub rate_upload: u64,
    /// Bytes downloaded over the torrent's lifetime.
    pub downloaded_ever: u64,
    /// Bytes uploaded over the torrent's lifetime.
    pub uploaded_ever: u64,
    /// Backend-reported error, when any.
    pub error: Option<String>,
}

impl TorrentSnapshot {
    #[must_use]
    /// Identifier addressing this torrent on its backend.
    pub const fn torrent_id(&self) -> TorrentId {
        TorrentId::Id(self.id)
    }
}

/// Minimal description of a torrent returned right after admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedTorrent {
    /// Backend-assigned numeric identifier.
    pub id: i64,
    /// Hex-encoded info hash.
    pub info_hash: String,
    /// Name the backend assigned from the metainfo.
    pub name: String,
}

/// Request payload for admitting a torrent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTorrent {
    /// Bencoded `.torrent` payload.
    pub file: Vec<u8>,
    /// Directory the payload is downloaded into.
    pub download_path: String,
    /// Display name to apply after admission; `None` keeps the metainfo name.
    pub name: Option<String>,
}

impl AddTorrent {
    #[must_use]
    /// Request that keeps the metainfo name.
    pub fn new(file: impl Into<Vec<u8>>, download_path: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            download_path: download_path.into(),
            name: None,
        }
    }

    #[must_use]
    /// Request a display name applied after admission.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Transfer counters over a period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTotals {
    /// Bytes uploaded.
    pub uploaded_bytes: u64,
    /// Bytes downloaded.
    pub downloaded_bytes: u64,
    /// Torrents added.
    pub files_added: u64,
    /// Number of sessions started.
    pub session_count: u64,
    /// Seconds the backend has been active.
    pub seconds_active: u64,
}

/// Aggregate statistics for a backend session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Torrents currently transferring.
    pub active_torrent_count: u64,
    /// Torrents currently paused.
    pub paused_torrent_count: u64,
    /// All torrents known to the backend.
    pub torrent_count: u64,
    /// Aggregate download rate in bytes per second.
    pub download_speed: u64,
    /// Aggregate upload rate in bytes per second.
    pub upload_speed: u64,
    /// Totals since the backend was first started.
    pub cumulative: TransferTotals,
    /// Totals for the running session.
    pub current: TransferTotals,
}
