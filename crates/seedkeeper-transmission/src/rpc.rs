//! Wire shapes of the Transmission RPC protocol and their conversion to core DTOs.

use seedkeeper_torrent_core::{
    AddedTorrent, ClientError, ClientResult, SessionStats, TorrentId, TorrentSnapshot,
    TorrentState, TransferTotals,
};
use serde::{Deserialize, Serialize};

use crate::error::RpcFailure;

/// Result string of a successful call.
pub(crate) const SUCCESS: &str = "success";
/// Header carrying the CSRF session token.
pub(crate) const SESSION_ID_HEADER: &str = "X-Transmission-Session-Id";

/// Fields requested for every torrent snapshot.
pub(crate) const FETCH_FIELDS: &[&str] = &[
    "id",
    "hashString",
    "name",
    "status",
    "downloadDir",
    "percentDone",
    "totalSize",
    "rateDownload",
    "rateUpload",
    "downloadedEver",
    "uploadedEver",
    "error",
    "errorString",
];

#[derive(Debug, Serialize)]
pub(crate) struct Request<'a, A> {
    pub(crate) method: &'a str,
    pub(crate) arguments: A,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Response<T> {
    pub(crate) result: String,
    pub(crate) arguments: Option<T>,
}

#[derive(Debug, Default, Serialize)]
pub(crate) struct NoArguments {}

#[derive(Debug, Serialize)]
pub(crate) struct TorrentGet<'a> {
    pub(crate) fields: &'static [&'static str],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) ids: Option<&'a [TorrentId]>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TorrentAdd<'a> {
    pub(crate) metainfo: String,
    #[serde(rename = "download-dir")]
    pub(crate) download_dir: &'a str,
    pub(crate) paused: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct Ids<'a> {
    pub(crate) ids: [&'a TorrentId; 1],
}

#[derive(Debug, Serialize)]
pub(crate) struct TorrentRemove<'a> {
    pub(crate) ids: [&'a TorrentId; 1],
    #[serde(rename = "delete-local-data")]
    pub(crate) delete_local_data: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct TorrentRenamePath<'a> {
    pub(crate) ids: [&'a TorrentId; 1],
    pub(crate) path: &'a str,
    pub(crate) name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct TorrentSetLocation<'a> {
    pub(crate) ids: [&'a TorrentId; 1],
    pub(crate) location: &'a str,
    #[serde(rename = "move")]
    pub(crate) move_data: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TorrentList {
    pub(crate) torrents: Vec<WireTorrent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireTorrent {
    id: i64,
    #[serde(default)]
    hash_string: String,
    #[serde(default)]
    name: String,
    status: i64,
    #[serde(default)]
    download_dir: String,
    #[serde(default)]
    percent_done: f64,
    #[serde(default)]
    total_size: u64,
    #[serde(default)]
    rate_download: u64,
    #[serde(default)]
    rate_upload: u64,
    #[serde(default)]
    downloaded_ever: u64,
    #[serde(default)]
    uploaded_ever: u64,
    #[serde(default)]
    error: i64,
    #[serde(default)]
    error_string: String,
}

impl WireTorrent {
    pub(crate) fn into_snapshot(self) -> ClientResult<TorrentSnapshot> {
        Ok(TorrentSnapshot {
            id: self.id,
            info_hash: self.hash_string,
            name: self.name,
            state: torrent_state(self.status)?,
            download_dir: self.download_dir,
            percent_done: self.percent_done,
            total_size: self.total_size,
            rate_download: self.rate_download,
            rate_upload: self.rate_upload,
            downloaded_ever: self.downloaded_ever,
            uploaded_ever: self.uploaded_ever,
            error: (self.error != 0).then_some(self.error_string),
        })
    }
}

/// Map Transmission's numeric status (0 through 6) onto [`TorrentState`].
pub(crate) fn torrent_state(status: i64) -> ClientResult<TorrentState> {
    Ok(match status {
        0 => TorrentState::Stopped,
        1 => TorrentState::QueuedCheck,
        2 => TorrentState::Checking,
        3 => TorrentState::QueuedDownload,
        4 => TorrentState::Downloading,
        5 => TorrentState::QueuedSeed,
        6 => TorrentState::Seeding,
        other => {
            return Err(ClientError::protocol(RpcFailure::UnknownStatus {
                status: other,
            }));
        }
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct TorrentAdded {
    #[serde(rename = "torrent-added")]
    added: Option<WireAdded>,
    #[serde(rename = "torrent-duplicate")]
    duplicate: Option<WireAdded>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAdded {
    id: i64,
    hash_string: String,
    name: String,
}

impl TorrentAdded {
    /// A duplicate add resolves to the torrent already present.
    pub(crate) fn into_added(self) -> ClientResult<AddedTorrent> {
        let wire = self.added.or(self.duplicate).ok_or_else(|| {
            ClientError::protocol(RpcFailure::MissingField {
                method: "torrent-add",
                field: "torrent-added",
            })
        })?;
        Ok(AddedTorrent {
            id: wire.id,
            info_hash: wire.hash_string,
            name: wire.name,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireSessionStats {
    active_torrent_count: u64,
    paused_torrent_count: u64,
    torrent_count: u64,
    download_speed: u64,
    upload_speed: u64,
    #[serde(rename = "cumulative-stats")]
    cumulative: WireTotals,
    #[serde(rename = "current-stats")]
    current: WireTotals,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTotals {
    uploaded_bytes: u64,
    downloaded_bytes: u64,
    files_added: u64,
    session_count: u64,
    seconds_active: u64,
}

impl From<WireTotals> for TransferTotals {
    fn from(wire: WireTotals) -> Self {
        Self {
            uploaded_bytes: wire.uploaded_bytes,
            downloaded_bytes: wire.downloaded_bytes,
            files_added: wire.files_added,
            session_count: wire.session_count,
            seconds_active: wire.seconds_active,
        }
    }
}

impl From<WireSessionStats> for SessionStats {
    fn from(wire: WireSessionStats) -> Self {
        Self {
            active_torrent_count: wire.active_torrent_count,
            paused_torrent_count: wire.paused_torrent_count,
            torrent_count: wire.torrent_count,
            download_speed: wire.download_speed,
            upload_speed: wire.upload_speed,
            cumulative: wire.cumulative.into(),
            current: wire.current.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn torrent_get_request_serializes_ids_untagged() -> anyhow::Result<()> {
        let ids = [TorrentId::Id(7), TorrentId::hash("abcdef")];
        let request = Request {
            method: "torrent-get",
            arguments: TorrentGet {
                fields: &["id", "name"],
                ids: Some(&ids),
            },
        };
        assert_eq!(
            serde_json::to_value(&request)?,
            json!({
                "method": "torrent-get",
                "arguments": {"fields": ["id", "name"], "ids": [7, "abcdef"]}
            })
        );

        let all = TorrentGet {
            fields: FETCH_FIELDS,
            ids: None,
        };
        assert!(serde_json::to_value(&all)?.get("ids").is_none());
        Ok(())
    }

    #[test]
    fn mutation_arguments_use_rpc_key_names() -> anyhow::Result<()> {
        let id = TorrentId::Id(3);
        assert_eq!(
            serde_json::to_value(TorrentRemove {
                ids: [&id],
                delete_local_data: true,
            })?,
            json!({"ids": [3], "delete-local-data": true})
        );
        assert_eq!(
            serde_json::to_value(TorrentSetLocation {
                ids: [&id],
                location: "/archive",
                move_data: true,
            })?,
            json!({"ids": [3], "location": "/archive", "move": true})
        );
        assert_eq!(
            serde_json::to_value(TorrentRenamePath {
                ids: [&id],
                path: "Old",
                name: "Bar",
            })?,
            json!({"ids": [3], "path": "Old", "name": "Bar"})
        );
        Ok(())
    }

    #[test]
    fn wire_torrent_converts_to_snapshot() -> anyhow::Result<()> {
        let list: TorrentList = serde_json::from_value(json!({
            "torrents": [{
                "id": 4,
                "hashString": "0123456789abcdef0123456789abcdef01234567",
                "name": "demo",
                "status": 6,
                "downloadDir": "/downloads",
                "percentDone": 1.0,
                "totalSize": 1024,
                "rateDownload": 0,
                "rateUpload": 2048,
                "downloadedEver": 1024,
                "uploadedEver": 4096,
                "error": 2,
                "errorString": "Tracker gave HTTP response code 404"
            }]
        }))?;
        let snapshot = list
            .torrents
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("missing torrent"))?
            .into_snapshot()?;
        assert_eq!(snapshot.id, 4);
        assert_eq!(snapshot.state, TorrentState::Seeding);
        assert_eq!(snapshot.rate_upload, 2048);
        assert_eq!(
            snapshot.error.as_deref(),
            Some("Tracker gave HTTP response code 404")
        );
        Ok(())
    }

    #[test]
    fn status_codes_map_to_states() {
        let expected = [
            TorrentState::Stopped,
            TorrentState::QueuedCheck,
            TorrentState::Checking,
            TorrentState::QueuedDownload,
            TorrentState::Downloading,
            TorrentState::QueuedSeed,
            TorrentState::Seeding,
        ];
        for (status, state) in (0..).zip(expected) {
            assert_eq!(torrent_state(status).ok(), Some(state));
        }
        assert!(matches!(
            torrent_state(7),
            Err(ClientError::Protocol { .. })
        ));
    }

    #[test]
    fn duplicate_add_resolves_to_existing_torrent() -> anyhow::Result<()> {
        let response: Response<TorrentAdded> = serde_json::from_value(json!({
            "result": "success",
            "arguments": {
                "torrent-duplicate": {"id": 9, "hashString": "aa", "name": "demo"}
            }
        }))?;
        assert_eq!(response.result, SUCCESS);
        let added = response
            .arguments
            .ok_or_else(|| anyhow::anyhow!("missing arguments"))?
            .into_added()?;
        assert_eq!(added.id, 9);
        assert_eq!(added.name, "demo");
        Ok(())
    }

    #[test]
    fn session_stats_convert_both_periods() -> anyhow::Result<()> {
        let totals = json!({
            "uploadedBytes": 1, "downloadedBytes": 2, "filesAdded": 3,
            "sessionCount": 4, "secondsActive": 5
        });
        let wire: WireSessionStats = serde_json::from_value(json!({
            "activeTorrentCount": 1,
            "pausedTorrentCount": 2,
            "torrentCount": 3,
            "downloadSpeed": 10,
            "uploadSpeed": 20,
            "cumulative-stats": totals.clone(),
            "current-stats": totals
        }))?;
        let stats = SessionStats::from(wire);
        assert_eq!(stats.torrent_count, 3);
        assert_eq!(stats.cumulative.session_count, 4);
        assert_eq!(stats.current, stats.cumulative);
        Ok(())
    }
}
