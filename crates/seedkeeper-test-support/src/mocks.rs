//! Instrumented connectors and clients for exercising the bridge without a daemon.
//!
//! [`RecordingConnector`] hands out clients that log every call together with the
//! wall-clock interval it occupied, so suites can assert call sequences and mutual
//! exclusion. [`FlakyConnector`] refuses a scripted number of connection attempts.

use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use seedkeeper_torrent_core::{
    AddedTorrent, BackendClient, BackendEndpoint, ClientError, ClientResult, Connector,
    SessionStats, TorrentId, TorrentSnapshot, TorrentState,
};

use crate::fixtures::metainfo_name;

/// One adapter call observed by a [`RecordingClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `get_torrents` with the requested ids.
    GetTorrents(Option<Vec<TorrentId>>),
    /// `get_torrent`.
    GetTorrent(TorrentId),
    /// `add_torrent`.
    AddTorrent {
        /// Requested download directory.
        download_dir: String,
        /// Whether the torrent was added paused.
        paused: bool,
    },
    /// `remove_torrent`.
    RemoveTorrent {
        /// Target torrent.
        id: TorrentId,
        /// Whether on-disk data was deleted.
        delete_data: bool,
    },
    /// `start_torrent`.
    Start(TorrentId),
    /// `stop_torrent`.
    Stop(TorrentId),
    /// `verify_torrent`.
    Verify(TorrentId),
    /// `reannounce_torrent`.
    Reannounce(TorrentId),
    /// `rename_torrent_path`.
    Rename {
        /// Target torrent.
        id: TorrentId,
        /// Path component being renamed.
        current: String,
        /// Replacement name.
        new_name: String,
    },
    /// `move_torrent_data`.
    Move {
        /// Target torrent.
        id: TorrentId,
        /// Destination directory.
        location: String,
    },
    /// `session_stats`.
    SessionStats,
}

/// Wall-clock span a single adapter call occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    /// Instant the call was entered.
    pub start: Instant,
    /// Instant the call returned.
    pub end: Instant,
}

#[derive(Default)]
struct RecordingState {
    calls: Vec<Call>,
    intervals: Vec<Interval>,
    fail_next: Option<ClientError>,
    connections: usize,
    call_delay: Duration,
    torrents: BTreeMap<i64, TorrentSnapshot>,
    next_id: i64,
    stats: SessionStats,
}

impl RecordingState {
    fn resolve(&self, id: &TorrentId) -> ClientResult<i64> {
        let found = match id {
            TorrentId::Id(value) => self.torrents.contains_key(value).then_some(*value),
            TorrentId::Hash(hash) => self
                .torrents
                .values()
                .find(|torrent| torrent.info_hash == *hash)
                .map(|torrent| torrent.id),
        };
        found.ok_or_else(|| not_found(id))
    }

    fn torrent_mut(&mut self, id: &TorrentId) -> ClientResult<&mut TorrentSnapshot> {
        let key = self.resolve(id)?;
        self.torrents.get_mut(&key).ok_or_else(|| not_found(id))
    }
}

fn not_found(id: &TorrentId) -> ClientError {
    ClientError::NotFound {
        torrent_id: id.clone(),
    }
}

/// Shared view of everything the recording clients observed.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingBackend {
    fn lock(&self) -> MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next adapter call fail with `error`.
    pub fn fail_next(&self, error: ClientError) {
        self.lock().fail_next = Some(error);
    }

    /// Hold every subsequent call open for `delay` before it completes.
    pub fn set_call_delay(&self, delay: Duration) {
        self.lock().call_delay = delay;
    }

    /// Value returned by `session_stats`.
    pub fn set_session_stats(&self, stats: SessionStats) {
        self.lock().stats = stats;
    }

    /// Seed a torrent; returns its identifier.
    #[must_use]
    pub fn insert_torrent(&self, name: &str, state: TorrentState) -> TorrentId {
        let mut guard = self.lock();
        guard.next_id += 1;
        let id = guard.next_id;
        guard.torrents.insert(id, snapshot(id, name, state, "/downloads"));
        TorrentId::Id(id)
    }

    /// Every call observed so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Forget the recorded calls and intervals.
    pub fn clear_calls(&self) {
        let mut guard = self.lock();
        guard.calls.clear();
        guard.intervals.clear();
    }

    /// Entry/exit span of every completed call.
    #[must_use]
    pub fn intervals(&self) -> Vec<Interval> {
        self.lock().intervals.clone()
    }

    /// Number of clients handed out so far.
    #[must_use]
    pub fn connections(&self) -> usize {
        self.lock().connections
    }

    fn client(&self) -> RecordingClient {
        self.lock().connections += 1;
        RecordingClient {
            backend: self.clone(),
        }
    }
}

fn snapshot(id: i64, name: &str, state: TorrentState, download_dir: &str) -> TorrentSnapshot {
    TorrentSnapshot {
        id,
        info_hash: format!("{id:040x}"),
        name: name.to_owned(),
        state,
        download_dir: download_dir.to_owned(),
        percent_done: 0.0,
        total_size: 0,
        rate_download: 0,
        rate_upload: 0,
        downloaded_ever: 0,
        uploaded_ever: 0,
        error: None,
    }
}

/// Connector that always succeeds and records every call its clients make.
#[derive(Clone, Default)]
pub struct RecordingConnector {
    backend: RecordingBackend,
}

impl RecordingConnector {
    /// Handle for inspecting and scripting the recorded backend.
    #[must_use]
    pub fn backend(&self) -> RecordingBackend {
        self.backend.clone()
    }
}

impl Connector for RecordingConnector {
    type Client = RecordingClient;

    fn kind(&self) -> &'static str {
        "recording"
    }

    fn connect(&self, _endpoint: &BackendEndpoint) -> ClientResult<Self::Client> {
        Ok(self.backend.client())
    }
}

/// Client produced by the instrumented connectors.
pub struct RecordingClient {
    backend: RecordingBackend,
}

impl RecordingClient {
    fn invoke<T>(
        &self,
        call: Call,
        operation: impl FnOnce(&mut RecordingState) -> ClientResult<T>,
    ) -> ClientResult<T> {
        let start = Instant::now();
        let delay = self.backend.lock().call_delay;
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        let mut state = self.backend.lock();
        state.calls.push(call);
        let result = match state.fail_next.take() {
            Some(error) => Err(error),
            None => operation(&mut state),
        };
        state.intervals.push(Interval {
            start,
            end: Instant::now(),
        });
        result
    }
}

impl BackendClient for RecordingClient {
    fn get_torrents(&mut self, ids: Option<&[TorrentId]>) -> ClientResult<Vec<TorrentSnapshot>> {
        self.invoke(Call::GetTorrents(ids.map(<[TorrentId]>::to_vec)), |state| {
            Ok(match ids {
                None => state.torrents.values().cloned().collect(),
                Some(ids) => ids
                    .iter()
                    .filter_map(|id| state.resolve(id).ok())
                    .filter_map(|key| state.torrents.get(&key).cloned())
                    .collect(),
            })
        })
    }

    fn get_torrent(&mut self, id: &TorrentId) -> ClientResult<TorrentSnapshot> {
        self.invoke(Call::GetTorrent(id.clone()), |state| {
            let key = state.resolve(id)?;
            state.torrents.get(&key).cloned().ok_or_else(|| not_found(id))
        })
    }

    fn add_torrent(
        &mut self,
        metainfo: &[u8],
        download_dir: &str,
        paused: bool,
    ) -> ClientResult<AddedTorrent> {
        let call = Call::AddTorrent {
            download_dir: download_dir.to_owned(),
            paused,
        };
        self.invoke(call, |state| {
            let name = metainfo_name(metainfo)
                .ok_or_else(|| ClientError::rejected("invalid or corrupt torrent file"))?;
            state.next_id += 1;
            let id = state.next_id;
            let torrent_state = if paused {
                TorrentState::Stopped
            } else {
                TorrentState::Downloading
            };
            let added = snapshot(id, &name, torrent_state, download_dir);
            let info_hash = added.info_hash.clone();
            state.torrents.insert(id, added);
            Ok(AddedTorrent {
                id,
                info_hash,
                name,
            })
        })
    }

    fn remove_torrent(&mut self, id: &TorrentId, delete_data: bool) -> ClientResult<()> {
        let call = Call::RemoveTorrent {
            id: id.clone(),
            delete_data,
        };
        self.invoke(call, |state| {
            let key = state.resolve(id)?;
            state.torrents.remove(&key);
            Ok(())
        })
    }

    fn start_torrent(&mut self, id: &TorrentId) -> ClientResult<()> {
        self.invoke(Call::Start(id.clone()), |state| {
            state.torrent_mut(id)?.state = TorrentState::Downloading;
            Ok(())
        })
    }

    fn stop_torrent(&mut self, id: &TorrentId) -> ClientResult<()> {
        self.invoke(Call::Stop(id.clone()), |state| {
            state.torrent_mut(id)?.state = TorrentState::Stopped;
            Ok(())
        })
    }

    fn verify_torrent(&mut self, id: &TorrentId) -> ClientResult<()> {
        self.invoke(Call::Verify(id.clone()), |state| {
            state.resolve(id).map(|_| ())
        })
    }

    fn reannounce_torrent(&mut self, id: &TorrentId) -> ClientResult<()> {
        self.invoke(Call::Reannounce(id.clone()), |state| {
            state.resolve(id).map(|_| ())
        })
    }

    fn rename_torrent_path(
        &mut self,
        id: &TorrentId,
        current: &str,
        new_name: &str,
    ) -> ClientResult<()> {
        let call = Call::Rename {
            id: id.clone(),
            current: current.to_owned(),
            new_name: new_name.to_owned(),
        };
        self.invoke(call, |state| {
            let torrent = state.torrent_mut(id)?;
            if torrent.name != current {
                return Err(ClientError::rejected("Invalid argument"));
            }
            new_name.clone_into(&mut torrent.name);
            Ok(())
        })
    }

    fn move_torrent_data(&mut self, id: &TorrentId, location: &str) -> ClientResult<()> {
        let call = Call::Move {
            id: id.clone(),
            location: location.to_owned(),
        };
        self.invoke(call, |state| {
            location.clone_into(&mut state.torrent_mut(id)?.download_dir);
            Ok(())
        })
    }

    fn session_stats(&mut self) -> ClientResult<SessionStats> {
        self.invoke(Call::SessionStats, |state| Ok(state.stats.clone()))
    }
}

/// Record of connection attempts made through a [`FlakyConnector`].
#[derive(Clone, Default)]
pub struct AttemptLog {
    instants: Arc<Mutex<Vec<Instant>>>,
}

impl AttemptLog {
    fn record(&self) -> usize {
        let mut instants = self.instants.lock().unwrap_or_else(PoisonError::into_inner);
        instants.push(Instant::now());
        instants.len()
    }

    /// Number of attempts made.
    #[must_use]
    pub fn count(&self) -> usize {
        self.instants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Instant of every attempt, in order.
    #[must_use]
    pub fn instants(&self) -> Vec<Instant> {
        self.instants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Connector refusing the first `failures` attempts with numbered connection errors.
///
/// Attempt `n` fails with an I/O error reading `attempt n refused`; later attempts hand
/// out recording clients.
#[derive(Clone)]
pub struct FlakyConnector {
    failures: usize,
    attempts: AttemptLog,
    backend: RecordingBackend,
}

impl FlakyConnector {
    /// Refuse the first `failures` attempts. `u32::MAX` never accepts.
    #[must_use]
    pub fn failing_first(failures: u32) -> Self {
        Self {
            failures: usize::try_from(failures).unwrap_or(usize::MAX),
            attempts: AttemptLog::default(),
            backend: RecordingBackend::default(),
        }
    }

    /// Shared attempt log.
    #[must_use]
    pub fn attempts(&self) -> AttemptLog {
        self.attempts.clone()
    }

    /// Backend behind the clients handed out once attempts succeed.
    #[must_use]
    pub fn backend(&self) -> RecordingBackend {
        self.backend.clone()
    }
}

impl Connector for FlakyConnector {
    type Client = RecordingClient;

    fn kind(&self) -> &'static str {
        "flaky"
    }

    fn connect(&self, _endpoint: &BackendEndpoint) -> ClientResult<Self::Client> {
        let attempt = self.attempts.record();
        if attempt <= self.failures {
            return Err(ClientError::connection(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("attempt {attempt} refused"),
            )));
        }
        Ok(self.backend.client())
    }
}
