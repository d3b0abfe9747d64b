//! Async capability trait implemented by every backend kind.

use async_trait::async_trait;

use crate::error::BridgeResult;
use crate::model::{AddTorrent, BackendEndpoint, Deadline, SessionStats, TorrentId, TorrentSnapshot};

/// Torrent lifecycle operations exposed to callers, independent of backend kind.
#[async_trait]
pub trait TorrentBackend: Send + Sync {
    /// Endpoint this backend is bound to.
    fn endpoint(&self) -> &BackendEndpoint;

    /// Backend kind label (e.g. `transmission`, `memory`).
    fn kind(&self) -> &'static str;

    /// Establish the backend connection, retrying until `deadline`.
    async fn ensure_connected(&self, deadline: Deadline) -> BridgeResult<()>;

    /// Fetch snapshots for `ids`, or every torrent when `None`.
    async fn fetch(&self, ids: Option<Vec<TorrentId>>) -> BridgeResult<Vec<TorrentSnapshot>>;

    /// Admit a torrent, applying the requested display name, and return its snapshot.
    async fn add(&self, request: AddTorrent) -> BridgeResult<TorrentSnapshot>;

    /// Remove a torrent and delete its on-disk data.
    async fn remove(&self, id: TorrentId) -> BridgeResult<()>;

    /// Aggregate session statistics.
    async fn session_stats(&self) -> BridgeResult<SessionStats>;

    /// Queue a verification of on-disk data.
    async fn force_recheck(&self, id: TorrentId) -> BridgeResult<()>;

    /// Queue an announce to every tracker.
    async fn force_reannounce(&self, id: TorrentId) -> BridgeResult<()>;

    /// Relocate a torrent's data and return the updated snapshot.
    async fn move_data(&self, id: TorrentId, destination: String)
    -> BridgeResult<TorrentSnapshot>;

    /// Pause a torrent.
    async fn pause(&self, id: TorrentId) -> BridgeResult<()>;

    /// Resume a torrent.
    async fn resume(&self, id: TorrentId) -> BridgeResult<()>;

    /// Rename a torrent's top-level path and return the refreshed snapshot.
    async fn rename(&self, id: TorrentId, new_name: String) -> BridgeResult<TorrentSnapshot>;
}
