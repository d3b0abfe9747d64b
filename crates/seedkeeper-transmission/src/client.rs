//! Blocking Transmission RPC session.
//!
//! # Design
//! - One `reqwest` blocking client per session; it must be created and dropped off the
//!   async runtime, which the bridge's worker threads guarantee.
//! - The daemon's CSRF token is learned from a `409 Conflict` reply and the request is
//!   replayed once with it.
//! - Transport failures and unexpected HTTP statuses are connection failures; a result
//!   other than `success` is a rejection carrying the daemon's text verbatim.

use std::slice;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use seedkeeper_torrent_core::{
    AddedTorrent, BackendClient, BackendEndpoint, ClientError, ClientResult, Connector,
    SessionStats, TorrentId, TorrentSnapshot,
};
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::{debug, info};

use crate::config::TransmissionConfig;
use crate::error::RpcFailure;
use crate::rpc::{
    self, FETCH_FIELDS, Ids, NoArguments, Request, SESSION_ID_HEADER, SUCCESS, TorrentAdd,
    TorrentAdded, TorrentGet, TorrentList, TorrentRemove, TorrentRenamePath,
    TorrentSetLocation, WireSessionStats, WireTorrent,
};

/// Opens RPC sessions against Transmission daemons.
#[derive(Debug, Clone, Default)]
pub struct TransmissionConnector {
    config: TransmissionConfig,
}

impl TransmissionConnector {
    /// Connector using `config` for every session it opens.
    #[must_use]
    pub const fn new(config: TransmissionConfig) -> Self {
        Self { config }
    }

    /// Transport settings in use.
    #[must_use]
    pub const fn config(&self) -> &TransmissionConfig {
        &self.config
    }
}

impl Connector for TransmissionConnector {
    type Client = TransmissionClient;

    fn kind(&self) -> &'static str {
        "transmission"
    }

    fn connect(&self, endpoint: &BackendEndpoint) -> ClientResult<Self::Client> {
        let http = Client::builder()
            .timeout(self.config.request_timeout)
            .build()
            .map_err(ClientError::connection)?;
        let mut client = TransmissionClient {
            http,
            url: self.config.rpc_url(endpoint),
            username: endpoint.username().map(str::to_owned),
            password: endpoint.password().map(str::to_owned),
            session_id: None,
        };
        client.call_unit("session-get", NoArguments {})?;
        info!(url = %client.url, "transmission rpc session opened");
        Ok(client)
    }
}

/// Live RPC session with one daemon.
pub struct TransmissionClient {
    http: Client,
    url: String,
    username: Option<String>,
    password: Option<String>,
    session_id: Option<String>,
}

impl TransmissionClient {
    fn invoke<A, T>(&mut self, method: &'static str, arguments: A) -> ClientResult<Option<T>>
    where
        A: Serialize,
        T: DeserializeOwned,
    {
        let body =
            serde_json::to_vec(&Request { method, arguments }).map_err(ClientError::protocol)?;
        for _ in 0..2 {
            debug!(url = %self.url, method, "transmission rpc call");
            let response = self.post(&body)?;
            if response.status() == StatusCode::CONFLICT {
                self.session_id = response
                    .headers()
                    .get(SESSION_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_owned);
                debug!(url = %self.url, method, "transmission session id refreshed");
                continue;
            }
            return decode(method, response);
        }
        Err(ClientError::connection(RpcFailure::SessionHandshake {
            method,
        }))
    }

    fn call<A, T>(&mut self, method: &'static str, arguments: A) -> ClientResult<T>
    where
        A: Serialize,
        T: DeserializeOwned,
    {
        self.invoke(method, arguments)?.ok_or_else(|| {
            ClientError::protocol(RpcFailure::MissingField {
                method,
                field: "arguments",
            })
        })
    }

    fn call_unit<A: Serialize>(&mut self, method: &'static str, arguments: A) -> ClientResult<()> {
        self.invoke::<A, IgnoredAny>(method, arguments).map(|_| ())
    }

    fn post(&self, body: &[u8]) -> ClientResult<Response> {
        let mut request = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_vec());
        if let Some(session_id) = &self.session_id {
            request = request.header(SESSION_ID_HEADER, session_id);
        }
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }
        request.send().map_err(ClientError::connection)
    }
}

fn decode<T: DeserializeOwned>(method: &'static str, response: Response) -> ClientResult<Option<T>> {
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::connection(RpcFailure::HttpStatus {
            method,
            status: status.as_u16(),
        }));
    }
    let body = response.bytes().map_err(ClientError::connection)?;
    let envelope: rpc::Response<T> =
        serde_json::from_slice(&body).map_err(ClientError::protocol)?;
    if envelope.result != SUCCESS {
        return Err(ClientError::rejected(envelope.result));
    }
    Ok(envelope.arguments)
}

impl BackendClient for TransmissionClient {
    fn get_torrents(&mut self, ids: Option<&[TorrentId]>) -> ClientResult<Vec<TorrentSnapshot>> {
        let list: TorrentList = self.call(
            "torrent-get",
            TorrentGet {
                fields: FETCH_FIELDS,
                ids,
            },
        )?;
        list.torrents
            .into_iter()
            .map(WireTorrent::into_snapshot)
            .collect()
    }

    fn get_torrent(&mut self, id: &TorrentId) -> ClientResult<TorrentSnapshot> {
        self.get_torrents(Some(slice::from_ref(id)))?
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::NotFound {
                torrent_id: id.clone(),
            })
    }

    fn add_torrent(
        &mut self,
        metainfo: &[u8],
        download_dir: &str,
        paused: bool,
    ) -> ClientResult<AddedTorrent> {
        let added: TorrentAdded = self.call(
            "torrent-add",
            TorrentAdd {
                metainfo: STANDARD.encode(metainfo),
                download_dir,
                paused,
            },
        )?;
        added.into_added()
    }

    fn remove_torrent(&mut self, id: &TorrentId, delete_data: bool) -> ClientResult<()> {
        self.call_unit(
            "torrent-remove",
            TorrentRemove {
                ids: [id],
                delete_local_data: delete_data,
            },
        )
    }

    fn start_torrent(&mut self, id: &TorrentId) -> ClientResult<()> {
        self.call_unit("torrent-start", Ids { ids: [id] })
    }

    fn stop_torrent(&mut self, id: &TorrentId) -> ClientResult<()> {
        self.call_unit("torrent-stop", Ids { ids: [id] })
    }

    fn verify_torrent(&mut self, id: &TorrentId) -> ClientResult<()> {
        self.call_unit("torrent-verify", Ids { ids: [id] })
    }

    fn reannounce_torrent(&mut self, id: &TorrentId) -> ClientResult<()> {
        self.call_unit("torrent-reannounce", Ids { ids: [id] })
    }

    fn rename_torrent_path(
        &mut self,
        id: &TorrentId,
        current: &str,
        new_name: &str,
    ) -> ClientResult<()> {
        self.call_unit(
            "torrent-rename-path",
            TorrentRenamePath {
                ids: [id],
                path: current,
                name: new_name,
            },
        )
    }

    fn move_torrent_data(&mut self, id: &TorrentId, location: &str) -> ClientResult<()> {
        self.call_unit(
            "torrent-set-location",
            TorrentSetLocation {
                ids: [id],
                location,
                move_data: true,
            },
        )
    }

    fn session_stats(&mut self) -> ClientResult<SessionStats> {
        self.call::<_, WireSessionStats>("session-stats", NoArguments {})
            .map(SessionStats::from)
    }
}
