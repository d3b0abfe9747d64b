use std::time::Duration;

use anyhow::{Context, Result, bail};
use mockito::{Matcher, Mock, Server, ServerGuard};
use seedkeeper_bridge::{BackendBridge, BridgeConfig};
use seedkeeper_test_support::fixtures::{sample_metainfo, transmission_addr};
use seedkeeper_torrent_core::{
    AddTorrent, BackendClient, BackendEndpoint, ClientError, Connector, Deadline,
    TorrentBackend, TorrentId, TorrentState,
};
use seedkeeper_transmission::{RpcFailure, TransmissionConfig, TransmissionConnector};
use serde_json::{Value, json};

const RPC_PATH: &str = "/transmission/rpc";
const SESSION_ID: &str = "test-session";
// base64("admin:secret")
const BASIC_AUTH: &str = "Basic YWRtaW46c2VjcmV0";

fn endpoint(server: &ServerGuard) -> BackendEndpoint {
    let addr = server.socket_address();
    BackendEndpoint::new(
        addr.ip().to_string(),
        addr.port(),
        Some("admin".into()),
        Some("secret".into()),
    )
}

fn connector() -> TransmissionConnector {
    TransmissionConnector::new(TransmissionConfig {
        request_timeout: Duration::from_secs(5),
        ..TransmissionConfig::default()
    })
}

fn conflict(server: &mut ServerGuard) -> Mock {
    server
        .mock("POST", RPC_PATH)
        .match_header("x-transmission-session-id", Matcher::Missing)
        .with_status(409)
        .with_header("X-Transmission-Session-Id", SESSION_ID)
        .create()
}

fn rpc(server: &mut ServerGuard, request: Value, response: &Value) -> Mock {
    server
        .mock("POST", RPC_PATH)
        .match_header("x-transmission-session-id", SESSION_ID)
        .match_header("authorization", BASIC_AUTH)
        .match_body(Matcher::PartialJson(request))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(response.to_string())
        .create()
}

fn session_get(server: &mut ServerGuard) -> Mock {
    rpc(
        server,
        json!({"method": "session-get"}),
        &json!({"result": "success", "arguments": {"version": "4.0.5"}}),
    )
}

fn wire_torrent(id: i64, name: &str, status: i64) -> Value {
    json!({
        "id": id,
        "hashString": "0123456789abcdef0123456789abcdef01234567",
        "name": name,
        "status": status,
        "downloadDir": "/downloads",
        "percentDone": 0.25,
        "totalSize": 1_048_576,
        "rateDownload": 4096,
        "rateUpload": 0,
        "downloadedEver": 262_144,
        "uploadedEver": 0,
        "error": 0,
        "errorString": ""
    })
}

#[test]
fn connect_learns_session_id_and_replays_request() -> Result<()> {
    let mut server = Server::new();
    let handshake = conflict(&mut server);
    let session = session_get(&mut server);

    connector().connect(&endpoint(&server))?;

    handshake.assert();
    session.assert();
    Ok(())
}

#[test]
fn fetch_requests_ids_and_converts_snapshots() -> Result<()> {
    let mut server = Server::new();
    let _handshake = conflict(&mut server);
    let _session = session_get(&mut server);
    let fetch = rpc(
        &mut server,
        json!({"method": "torrent-get", "arguments": {"ids": [5]}}),
        &json!({"result": "success", "arguments": {"torrents": [wire_torrent(5, "demo", 4)]}}),
    );

    let mut client = connector().connect(&endpoint(&server))?;
    let snapshot = client.get_torrent(&TorrentId::Id(5))?;

    assert_eq!(snapshot.id, 5);
    assert_eq!(snapshot.name, "demo");
    assert_eq!(snapshot.state, TorrentState::Downloading);
    assert_eq!(snapshot.rate_download, 4096);
    assert_eq!(snapshot.error, None);
    fetch.assert();
    Ok(())
}

#[test]
fn missing_torrent_is_not_found() -> Result<()> {
    let mut server = Server::new();
    let _handshake = conflict(&mut server);
    let _session = session_get(&mut server);
    let _fetch = rpc(
        &mut server,
        json!({"method": "torrent-get"}),
        &json!({"result": "success", "arguments": {"torrents": []}}),
    );

    let mut client = connector().connect(&endpoint(&server))?;
    let err = client
        .get_torrent(&TorrentId::hash("ffff"))
        .err()
        .context("empty result must fail")?;
    assert!(matches!(
        err,
        ClientError::NotFound {
            torrent_id: TorrentId::Hash(_)
        }
    ));
    Ok(())
}

#[test]
fn rejected_result_carries_daemon_text() -> Result<()> {
    let mut server = Server::new();
    let _handshake = conflict(&mut server);
    let _session = session_get(&mut server);
    let _add = rpc(
        &mut server,
        json!({"method": "torrent-add"}),
        &json!({"result": "invalid or corrupt torrent file"}),
    );

    let mut client = connector().connect(&endpoint(&server))?;
    let err = client
        .add_torrent(b"garbage", "/downloads", false)
        .err()
        .context("daemon rejection must surface")?;
    match err {
        ClientError::Rejected { message } => {
            assert_eq!(message, "invalid or corrupt torrent file");
        }
        other => bail!("unexpected error {other:?}"),
    }
    Ok(())
}

#[test]
fn unauthorized_daemon_is_a_connection_failure() -> Result<()> {
    let mut server = Server::new();
    let _denied = server.mock("POST", RPC_PATH).with_status(401).create();

    let err = connector()
        .connect(&endpoint(&server))
        .err()
        .context("401 must fail")?;
    let ClientError::Connection { source } = err else {
        bail!("expected connection failure");
    };
    assert!(matches!(
        source.downcast_ref::<RpcFailure>(),
        Some(RpcFailure::HttpStatus { status: 401, .. })
    ));
    Ok(())
}

#[test]
fn repeated_conflicts_abort_the_handshake() -> Result<()> {
    let mut server = Server::new();
    let _always = server
        .mock("POST", RPC_PATH)
        .with_status(409)
        .with_header("X-Transmission-Session-Id", SESSION_ID)
        .expect(2)
        .create();

    let err = connector()
        .connect(&endpoint(&server))
        .err()
        .context("handshake must give up")?;
    let ClientError::Connection { source } = err else {
        bail!("expected connection failure");
    };
    assert!(matches!(
        source.downcast_ref::<RpcFailure>(),
        Some(RpcFailure::SessionHandshake {
            method: "session-get"
        })
    ));
    Ok(())
}

#[test]
fn mutations_send_expected_arguments() -> Result<()> {
    let mut server = Server::new();
    let _handshake = conflict(&mut server);
    let _session = session_get(&mut server);
    let ok = json!({"result": "success", "arguments": {}});
    let mocks = [
        rpc(
            &mut server,
            json!({"method": "torrent-remove", "arguments": {"ids": [3], "delete-local-data": true}}),
            &ok,
        ),
        rpc(
            &mut server,
            json!({"method": "torrent-set-location", "arguments": {"ids": [3], "location": "/archive", "move": true}}),
            &ok,
        ),
        rpc(
            &mut server,
            json!({"method": "torrent-rename-path", "arguments": {"ids": [3], "path": "Old", "name": "Bar"}}),
            &ok,
        ),
        rpc(&mut server, json!({"method": "torrent-verify", "arguments": {"ids": [3]}}), &ok),
        rpc(&mut server, json!({"method": "torrent-reannounce", "arguments": {"ids": [3]}}), &ok),
        rpc(&mut server, json!({"method": "torrent-stop", "arguments": {"ids": [3]}}), &ok),
    ];

    let mut client = connector().connect(&endpoint(&server))?;
    let id = TorrentId::Id(3);
    client.remove_torrent(&id, true)?;
    client.move_torrent_data(&id, "/archive")?;
    client.rename_torrent_path(&id, "Old", "Bar")?;
    client.verify_torrent(&id)?;
    client.reannounce_torrent(&id)?;
    client.stop_torrent(&id)?;

    for mock in &mocks {
        mock.assert();
    }
    Ok(())
}

#[test]
fn session_stats_convert_from_wire() -> Result<()> {
    let mut server = Server::new();
    let _handshake = conflict(&mut server);
    let _session = session_get(&mut server);
    let totals = json!({
        "uploadedBytes": 10, "downloadedBytes": 20, "filesAdded": 2,
        "sessionCount": 7, "secondsActive": 3600
    });
    let _stats = rpc(
        &mut server,
        json!({"method": "session-stats"}),
        &json!({"result": "success", "arguments": {
            "activeTorrentCount": 1,
            "pausedTorrentCount": 1,
            "torrentCount": 2,
            "downloadSpeed": 100,
            "uploadSpeed": 50,
            "cumulative-stats": totals.clone(),
            "current-stats": totals
        }}),
    );

    let mut client = connector().connect(&endpoint(&server))?;
    let stats = client.session_stats()?;
    assert_eq!(stats.torrent_count, 2);
    assert_eq!(stats.upload_speed, 50);
    assert_eq!(stats.cumulative.session_count, 7);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bridge_adds_named_torrent_over_rpc() -> Result<()> {
    let mut server = Server::new_async().await;
    let addr = server.socket_address();
    let endpoint = BackendEndpoint::new(
        addr.ip().to_string(),
        addr.port(),
        Some("admin".into()),
        Some("secret".into()),
    );
    let ok = json!({"result": "success", "arguments": {}});
    let mut expected = Vec::new();
    for (request, response) in [
        (json!({"method": "session-get"}), ok.clone()),
        (
            json!({"method": "torrent-add", "arguments": {"paused": true, "download-dir": "/downloads"}}),
            json!({"result": "success", "arguments": {"torrent-added": {
                "id": 1, "hashString": "0123456789abcdef0123456789abcdef01234567", "name": "ubuntu.iso"
            }}}),
        ),
        (
            json!({"method": "torrent-rename-path", "arguments": {"ids": [1], "path": "ubuntu.iso", "name": "Foo"}}),
            ok.clone(),
        ),
        (json!({"method": "torrent-start", "arguments": {"ids": [1]}}), ok.clone()),
        (
            json!({"method": "torrent-get", "arguments": {"ids": [1]}}),
            json!({"result": "success", "arguments": {"torrents": [wire_torrent(1, "Foo", 4)]}}),
        ),
    ] {
        let mock = server
            .mock("POST", RPC_PATH)
            .match_header("x-transmission-session-id", SESSION_ID)
            .match_body(Matcher::PartialJson(request))
            .with_status(200)
            .with_body(response.to_string())
            .expect(1)
            .create_async()
            .await;
        expected.push(mock);
    }
    let _handshake = server
        .mock("POST", RPC_PATH)
        .match_header("x-transmission-session-id", Matcher::Missing)
        .with_status(409)
        .with_header("X-Transmission-Session-Id", SESSION_ID)
        .create_async()
        .await;

    let bridge = BackendBridge::new(endpoint, connector(), &BridgeConfig::default())?;
    bridge
        .ensure_connected(Deadline::after(Duration::from_secs(5)))
        .await?;
    let snapshot = bridge
        .add(AddTorrent::new(sample_metainfo("ubuntu.iso"), "/downloads").with_name("Foo"))
        .await?;
    bridge.shutdown().await;

    assert_eq!(snapshot.name, "Foo");
    assert_eq!(snapshot.state, TorrentState::Downloading);
    for mock in &expected {
        mock.assert_async().await;
    }
    Ok(())
}

#[tokio::test]
async fn live_daemon_answers_session_stats() -> Result<()> {
    let Some((host, port)) = transmission_addr() else {
        return Ok(());
    };
    let bridge = BackendBridge::open(host, port, None, None, TransmissionConnector::default())?;
    bridge
        .ensure_connected(Deadline::after(Duration::from_secs(30)))
        .await?;
    let stats = bridge.session_stats().await?;
    let torrents = bridge.fetch(None).await?;
    assert_eq!(
        stats.torrent_count,
        u64::try_from(torrents.len()).context("torrent count")?
    );
    bridge.shutdown().await;
    Ok(())
}
