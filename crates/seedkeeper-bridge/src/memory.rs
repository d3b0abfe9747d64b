//! In-process torrent engine backing the `memory` backend kind.
//!
//! Every connection from one [`MemoryConnector`] shares the same engine state, so a
//! reconnect observes the torrents admitted before it. Transfers never progress; the
//! engine only tracks lifecycle state, names and locations.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use seedkeeper_torrent_core::{
    AddedTorrent, BackendClient, BackendEndpoint, ClientError, ClientResult, Connector,
    SessionStats, TorrentId, TorrentSnapshot, TorrentState, TransferTotals,
};

use crate::metainfo::Metainfo;

/// Connector handing out clients of a shared in-memory engine.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    engine: Arc<Mutex<MemoryEngine>>,
}

impl Connector for MemoryConnector {
    type Client = MemoryClient;

    fn kind(&self) -> &'static str {
        "memory"
    }

    fn connect(&self, _endpoint: &BackendEndpoint) -> ClientResult<Self::Client> {
        lock(&self.engine).session_count += 1;
        Ok(MemoryClient {
            engine: Arc::clone(&self.engine),
        })
    }
}

/// Session handle onto a [`MemoryConnector`]'s engine.
pub struct MemoryClient {
    engine: Arc<Mutex<MemoryEngine>>,
}

struct MemoryEngine {
    torrents: BTreeMap<i64, MemoryTorrent>,
    next_id: i64,
    files_added: u64,
    session_count: u64,
    started_at: Instant,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self {
            torrents: BTreeMap::new(),
            next_id: 1,
            files_added: 0,
            session_count: 0,
            started_at: Instant::now(),
        }
    }
}

#[derive(Clone)]
struct MemoryTorrent {
    info_hash: String,
    name: String,
    state: TorrentState,
    download_dir: String,
    total_size: u64,
}

impl MemoryEngine {
    fn resolve(&self, id: &TorrentId) -> ClientResult<i64> {
        let found = match id {
            TorrentId::Id(value) => self.torrents.contains_key(value).then_some(*value),
            TorrentId::Hash(hash) => self
                .torrents
                .iter()
                .find(|(_, torrent)| torrent.info_hash.eq_ignore_ascii_case(hash))
                .map(|(key, _)| *key),
        };
        found.ok_or_else(|| ClientError::NotFound {
            torrent_id: id.clone(),
        })
    }

    fn torrent_mut(&mut self, id: &TorrentId) -> ClientResult<&mut MemoryTorrent> {
        let key = self.resolve(id)?;
        self.torrents.get_mut(&key).ok_or_else(|| ClientError::NotFound {
            torrent_id: id.clone(),
        })
    }

    fn snapshot(&self, key: i64) -> Option<TorrentSnapshot> {
        self.torrents.get(&key).map(|torrent| TorrentSnapshot {
            id: key,
            info_hash: torrent.info_hash.clone(),
            name: torrent.name.clone(),
            state: torrent.state,
            download_dir: torrent.download_dir.clone(),
            percent_done: 0.0,
            total_size: torrent.total_size,
            rate_download: 0,
            rate_upload: 0,
            downloaded_ever: 0,
            uploaded_ever: 0,
            error: None,
        })
    }

    fn totals(&self) -> TransferTotals {
        TransferTotals {
            uploaded_bytes: 0,
            downloaded_bytes: 0,
            files_added: self.files_added,
            session_count: self.session_count,
            seconds_active: self.started_at.elapsed().as_secs(),
        }
    }
}

impl MemoryClient {
    fn engine(&self) -> MutexGuard<'_, MemoryEngine> {
        lock(&self.engine)
    }
}

fn lock(engine: &Mutex<MemoryEngine>) -> MutexGuard<'_, MemoryEngine> {
    engine.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BackendClient for MemoryClient {
    fn get_torrents(&mut self, ids: Option<&[TorrentId]>) -> ClientResult<Vec<TorrentSnapshot>> {
        let engine = self.engine();
        let keys: Vec<i64> = match ids {
            None => engine.torrents.keys().copied().collect(),
            Some(ids) => ids.iter().filter_map(|id| engine.resolve(id).ok()).collect(),
        };
        Ok(keys.into_iter().filter_map(|key| engine.snapshot(key)).collect())
    }

    fn get_torrent(&mut self, id: &TorrentId) -> ClientResult<TorrentSnapshot> {
        let engine = self.engine();
        let key = engine.resolve(id)?;
        engine.snapshot(key).ok_or_else(|| ClientError::NotFound {
            torrent_id: id.clone(),
        })
    }

    fn add_torrent(
        &mut self,
        metainfo: &[u8],
        download_dir: &str,
        paused: bool,
    ) -> ClientResult<AddedTorrent> {
        let Metainfo {
            info_hash,
            name,
            total_size,
        } = Metainfo::decode(metainfo)?;

        let mut engine = self.engine();
        if let Some((key, existing)) = engine
            .torrents
            .iter()
            .find(|(_, torrent)| torrent.info_hash == info_hash)
        {
            return Ok(AddedTorrent {
                id: *key,
                info_hash: existing.info_hash.clone(),
                name: existing.name.clone(),
            });
        }

        let key = engine.next_id;
        engine.next_id += 1;
        engine.files_added += 1;
        engine.torrents.insert(
            key,
            MemoryTorrent {
                info_hash: info_hash.clone(),
                name: name.clone(),
                state: if paused {
                    TorrentState::Stopped
                } else {
                    TorrentState::Downloading
                },
                download_dir: download_dir.to_owned(),
                total_size,
            },
        );
        Ok(AddedTorrent {
            id: key,
            info_hash,
            name,
        })
    }

    fn remove_torrent(&mut self, id: &TorrentId, _delete_data: bool) -> ClientResult<()> {
        let mut engine = self.engine();
        let key = engine.resolve(id)?;
        engine.torrents.remove(&key);
        Ok(())
    }

    fn start_torrent(&mut self, id: &TorrentId) -> ClientResult<()> {
        self.engine().torrent_mut(id)?.state = TorrentState::Downloading;
        Ok(())
    }

    fn stop_torrent(&mut self, id: &TorrentId) -> ClientResult<()> {
        self.engine().torrent_mut(id)?.state = TorrentState::Stopped;
        Ok(())
    }

    fn verify_torrent(&mut self, id: &TorrentId) -> ClientResult<()> {
        self.engine().resolve(id).map(|_| ())
    }

    fn reannounce_torrent(&mut self, id: &TorrentId) -> ClientResult<()> {
        self.engine().resolve(id).map(|_| ())
    }

    fn rename_torrent_path(
        &mut self,
        id: &TorrentId,
        current: &str,
        new_name: &str,
    ) -> ClientResult<()> {
        if new_name.is_empty() || new_name.contains('/') {
            return Err(ClientError::rejected("Invalid argument"));
        }
        let mut engine = self.engine();
        let torrent = engine.torrent_mut(id)?;
        if torrent.name != current {
            return Err(ClientError::rejected("Invalid argument"));
        }
        new_name.clone_into(&mut torrent.name);
        Ok(())
    }

    fn move_torrent_data(&mut self, id: &TorrentId, location: &str) -> ClientResult<()> {
        location.clone_into(&mut self.engine().torrent_mut(id)?.download_dir);
        Ok(())
    }

    fn session_stats(&mut self) -> ClientResult<SessionStats> {
        let engine = self.engine();
        let torrent_count = count(engine.torrents.len());
        let paused = count(
            engine
                .torrents
                .values()
                .filter(|torrent| !torrent.state.is_started())
                .count(),
        );
        let totals = engine.totals();
        Ok(SessionStats {
            active_torrent_count: torrent_count - paused,
            paused_torrent_count: paused,
            torrent_count,
            download_speed: 0,
            upload_speed: 0,
            cumulative: totals.clone(),
            current: totals,
        })
    }
}

fn count(value: usize) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}
