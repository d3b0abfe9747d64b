use std::time::Duration;

use anyhow::{Result, bail};
use seedkeeper_app::{AppConfig, AppError, BackendConfig, BackendKind, BackendRegistry, start};
use seedkeeper_test_support::fixtures::sample_metainfo;
use seedkeeper_torrent_core::{AddTorrent, BridgeError, Deadline, TorrentState};

const DOCUMENT: &str = r#"{
    "log_level": "debug",
    "backends": [
        {"name": "scratch", "kind": "memory", "bridge": {"worker_threads": 1}},
        {"name": "archive", "kind": "memory"}
    ]
}"#;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn configured_backends_serve_lifecycle_calls() -> Result<()> {
    let config = AppConfig::from_json(DOCUMENT)?;
    let registry = start(&config, Deadline::after(Duration::from_secs(2))).await?;

    let scratch = registry.get("scratch")?;
    let added = scratch
        .add(AddTorrent::new(sample_metainfo("ubuntu.iso"), "/downloads").with_name("Foo"))
        .await?;
    assert_eq!(added.name, "Foo");
    assert_eq!(added.state, TorrentState::Downloading);

    scratch.pause(added.torrent_id()).await?;
    let fetched = scratch.fetch(Some(vec![added.torrent_id()])).await?;
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].state, TorrentState::Stopped);

    let archive = registry.get("archive")?;
    assert!(archive.fetch(None).await?.is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_backend_is_reported_by_name() -> Result<()> {
    let mut offline = BackendConfig::new("offline", BackendKind::Transmission);
    offline.port = 1;
    offline.bridge.connect_backoff = Duration::from_millis(10);
    let config = AppConfig {
        backends: vec![BackendConfig::new("local", BackendKind::Memory), offline],
        ..AppConfig::default()
    };
    let registry = BackendRegistry::from_config(&config)?;

    let err = match registry.ensure_all_connected(Deadline::expired()).await {
        Ok(()) => bail!("offline backend must fail"),
        Err(err) => err,
    };
    assert_eq!(err.unreachable_backends(), vec!["offline"]);
    let AppError::Unreachable { failures } = err else {
        bail!("expected unreachable error");
    };
    assert!(matches!(
        failures[0].error,
        BridgeError::Connect { attempts: 1, .. }
    ));

    let stats = registry.get("local")?.session_stats().await?;
    assert_eq!(stats.torrent_count, 0);
    Ok(())
}

#[test]
fn invalid_document_never_builds_bridges() {
    let result = AppConfig::from_json(
        r#"{"backends": [{"name": "remote", "kind": "transmission", "port": 0}]}"#,
    );
    assert!(matches!(
        result,
        Err(AppError::InvalidBackend { field: "port", .. })
    ));
}
