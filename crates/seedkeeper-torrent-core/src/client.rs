//! Blocking call surface implemented once per backend kind.
//!
//! Implementations are driven exclusively from bridge worker threads and are
//! never shared between threads concurrently, so they may hold non-thread-safe
//! state and block freely.

use crate::error::ClientResult;
use crate::model::{AddedTorrent, BackendEndpoint, SessionStats, TorrentId, TorrentSnapshot};

/// Live session with a backend.
pub trait BackendClient: Send + 'static {
    /// Fetch snapshots for `ids`, or for every torrent when `ids` is `None`.
    fn get_torrents(&mut self, ids: Option<&[TorrentId]>) -> ClientResult<Vec<TorrentSnapshot>>;

    /// Fetch a single torrent snapshot.
    fn get_torrent(&mut self, id: &TorrentId) -> ClientResult<TorrentSnapshot>;

    /// Admit metainfo bytes into `download_dir`, optionally paused.
    fn add_torrent(
        &mut self,
        metainfo: &[u8],
        download_dir: &str,
        paused: bool,
    ) -> ClientResult<AddedTorrent>;

    /// Remove a torrent, optionally deleting its payload.
    fn remove_torrent(&mut self, id: &TorrentId, delete_data: bool) -> ClientResult<()>;

    /// Start (resume) a torrent.
    fn start_torrent(&mut self, id: &TorrentId) -> ClientResult<()>;

    /// Stop (pause) a torrent.
    fn stop_torrent(&mut self, id: &TorrentId) -> ClientResult<()>;

    /// Queue a verification of on-disk data.
    fn verify_torrent(&mut self, id: &TorrentId) -> ClientResult<()>;

    /// Queue an announce to every tracker.
    fn reannounce_torrent(&mut self, id: &TorrentId) -> ClientResult<()>;

    /// Rename the path component `current` of a torrent to `new_name`.
    fn rename_torrent_path(
        &mut self,
        id: &TorrentId,
        current: &str,
        new_name: &str,
    ) -> ClientResult<()>;

    /// Move a torrent's payload to `location`, returning once the move completes.
    fn move_torrent_data(&mut self, id: &TorrentId, location: &str) -> ClientResult<()>;

    /// Aggregate session statistics.
    fn session_stats(&mut self) -> ClientResult<SessionStats>;
}

/// Factory establishing [`BackendClient`] sessions for one backend kind.
pub trait Connector: Send + Sync + 'static {
    /// Client produced on successful connection.
    type Client: BackendClient;

    /// Short backend kind label used in logs and thread names.
    fn kind(&self) -> &'static str;

    /// Attempt a single connection to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns the backend's connection failure; callers decide whether to retry.
    fn connect(&self, endpoint: &BackendEndpoint) -> ClientResult<Self::Client>;
}
