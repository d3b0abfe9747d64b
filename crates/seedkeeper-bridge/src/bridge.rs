//! Async operation dispatcher over a blocking backend connection.

use std::sync::Arc;

use async_trait::async_trait;
use seedkeeper_torrent_core::{
    AddTorrent, BackendClient, BackendEndpoint, BridgeResult, ClientResult, Connector, Deadline,
    SessionStats, TorrentBackend, TorrentId, TorrentSnapshot,
};
use tracing::{debug, warn};

use crate::config::BridgeConfig;
use crate::guard::ConnectionGuard;
use crate::worker::WorkerPool;

/// Serializes every operation for one backend connection onto a dedicated worker pool.
///
/// The connection handle is only ever created, used and dropped on the pool's threads.
pub struct BackendBridge<C: Connector> {
    guard: Arc<ConnectionGuard<C>>,
    pool: Arc<WorkerPool>,
}

impl<C: Connector> BackendBridge<C> {
    /// Bridge a backend identified by host, port and optional credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker threads cannot be started.
    pub fn open(
        host: impl Into<String>,
        port: u16,
        username: Option<String>,
        password: Option<String>,
        connector: C,
    ) -> BridgeResult<Self> {
        Self::new(
            BackendEndpoint::new(host, port, username, password),
            connector,
            &BridgeConfig::default(),
        )
    }

    /// Bridge `endpoint` using explicit tunables.
    ///
    /// No connection is attempted until the first call.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker threads cannot be started.
    pub fn new(
        endpoint: BackendEndpoint,
        connector: C,
        config: &BridgeConfig,
    ) -> BridgeResult<Self> {
        let pool = WorkerPool::new(
            format!("{}@{}", connector.kind(), endpoint.label()),
            config.worker_threads,
        )?;
        let guard = ConnectionGuard::new(
            endpoint,
            connector,
            config.connect_backoff,
            config.reconnect,
        );
        Ok(Self {
            guard: Arc::new(guard),
            pool: Arc::new(pool),
        })
    }

    /// Whether a live connection handle is currently held.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.guard.is_connected()
    }

    /// Release the connection handle; the next call reconnects.
    ///
    /// # Errors
    ///
    /// Returns a dispatch error if the worker pool is closed.
    pub async fn disconnect(&self) -> BridgeResult<()> {
        let guard = Arc::clone(&self.guard);
        self.pool
            .submit("disconnect", move || guard.disconnect())
            .await
    }

    /// Release the handle, stop accepting work and wait for in-flight calls to finish.
    pub async fn shutdown(&self) {
        self.release_handle();
        let pool = Arc::clone(&self.pool);
        if tokio::task::spawn_blocking(move || pool.shutdown())
            .await
            .is_err()
        {
            warn!(pool = %self.pool.label(), "worker pool shutdown did not complete");
        }
    }

    fn release_handle(&self) {
        if self.pool.is_open() {
            let guard = Arc::clone(&self.guard);
            drop(self.pool.submit("release", move || guard.disconnect()));
        }
    }

    async fn run<T, F>(
        &self,
        operation: &'static str,
        torrent_id: Option<TorrentId>,
        call: F,
    ) -> BridgeResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut C::Client) -> ClientResult<T> + Send + 'static,
    {
        debug!(
            endpoint = %self.guard.endpoint().label(),
            backend = self.guard.kind(),
            operation,
            torrent_id = ?torrent_id,
            "dispatching backend operation"
        );
        let guard = Arc::clone(&self.guard);
        self.pool
            .submit(operation, move || {
                guard.with_client(operation, torrent_id.as_ref(), call)
            })
            .await?
    }
}

impl<C: Connector> Drop for BackendBridge<C> {
    fn drop(&mut self) {
        self.release_handle();
        self.pool.close();
    }
}

#[async_trait]
impl<C: Connector> TorrentBackend for BackendBridge<C> {
    fn endpoint(&self) -> &BackendEndpoint {
        self.guard.endpoint()
    }

    fn kind(&self) -> &'static str {
        self.guard.kind()
    }

    async fn ensure_connected(&self, deadline: Deadline) -> BridgeResult<()> {
        if self.guard.is_connected() {
            return Ok(());
        }
        let guard = Arc::clone(&self.guard);
        self.pool
            .submit("ensure_connected", move || guard.ensure_connected(deadline))
            .await?
    }

    async fn fetch(&self, ids: Option<Vec<TorrentId>>) -> BridgeResult<Vec<TorrentSnapshot>> {
        self.run("fetch", None, move |client| {
            client.get_torrents(ids.as_deref())
        })
        .await
    }

    async fn add(&self, request: AddTorrent) -> BridgeResult<TorrentSnapshot> {
        self.run("add", None, move |client| add_torrent(client, &request))
            .await
    }

    async fn remove(&self, id: TorrentId) -> BridgeResult<()> {
        let target = id.clone();
        self.run("remove", Some(id), move |client| {
            client.remove_torrent(&target, true)
        })
        .await
    }

    async fn session_stats(&self) -> BridgeResult<SessionStats> {
        self.run("session_stats", None, BackendClient::session_stats)
            .await
    }

    async fn force_recheck(&self, id: TorrentId) -> BridgeResult<()> {
        let target = id.clone();
        self.run("force_recheck", Some(id), move |client| {
            client.verify_torrent(&target)
        })
        .await
    }

    async fn force_reannounce(&self, id: TorrentId) -> BridgeResult<()> {
        let target = id.clone();
        self.run("force_reannounce", Some(id), move |client| {
            client.reannounce_torrent(&target)
        })
        .await
    }

    async fn move_data(
        &self,
        id: TorrentId,
        destination: String,
    ) -> BridgeResult<TorrentSnapshot> {
        let target = id.clone();
        self.run("move_data", Some(id), move |client| {
            client.move_torrent_data(&target, &destination)?;
            client.get_torrent(&target)
        })
        .await
    }

    async fn pause(&self, id: TorrentId) -> BridgeResult<()> {
        let target = id.clone();
        self.run("pause", Some(id), move |client| client.stop_torrent(&target))
            .await
    }

    async fn resume(&self, id: TorrentId) -> BridgeResult<()> {
        let target = id.clone();
        self.run("resume", Some(id), move |client| client.start_torrent(&target))
            .await
    }

    async fn rename(&self, id: TorrentId, new_name: String) -> BridgeResult<TorrentSnapshot> {
        let target = id.clone();
        self.run("rename", Some(id), move |client| {
            rename_torrent(client, &target, &new_name)
        })
        .await
    }
}

/// Add paused, rename, then start when a name is requested; otherwise add started.
fn add_torrent<B: BackendClient>(
    client: &mut B,
    request: &AddTorrent,
) -> ClientResult<TorrentSnapshot> {
    let requested_name = request.name.as_deref().filter(|name| !name.is_empty());
    let added = match requested_name {
        Some(name) => {
            let added = client.add_torrent(&request.file, &request.download_path, true)?;
            let id = TorrentId::Id(added.id);
            client.rename_torrent_path(&id, &added.name, name)?;
            client.start_torrent(&id)?;
            added
        }
        None => client.add_torrent(&request.file, &request.download_path, false)?,
    };
    debug!(
        torrent_id = added.id,
        info_hash = %added.info_hash,
        renamed = requested_name.is_some(),
        "torrent admitted"
    );
    client.get_torrent(&TorrentId::Id(added.id))
}

/// Renames address the current top-level path component, so read it first.
fn rename_torrent<B: BackendClient>(
    client: &mut B,
    id: &TorrentId,
    new_name: &str,
) -> ClientResult<TorrentSnapshot> {
    let current = client.get_torrent(id)?;
    client.rename_torrent_path(id, &current.name, new_name)?;
    client.get_torrent(id)
}
