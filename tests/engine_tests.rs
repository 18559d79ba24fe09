//! Sync engine integration tests
//!
//! Drive a real engine over a temp cache with a fake manifest and the file
//! transport, checking the cycle from server timestamp to served lookups.

mod common;

use std::path::PathBuf;
use std::time::Duration;

use bundlesync::error::manifest::fetch_failed;
use bundlesync::{
    BundleDescriptor, BundleSync, BundleSyncError, LoadedBundle, ProvenanceTier, SyncEvent,
    SyncState, Trigger,
};
use common::{CountingTransport, FakeManifest, TestWorkspace, wait_for_pending};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

async fn started(engine: &BundleSync, timestamp: u64) -> bundlesync::CycleHandle {
    match engine.on_server_timestamp(timestamp).await.unwrap() {
        Trigger::Started(handle) => handle,
        other => panic!("expected a new cycle, got {other:?}"),
    }
}

fn spawn_load(engine: &BundleSync, name: &str) -> JoinHandle<bundlesync::Result<LoadedBundle>> {
    let engine = engine.clone();
    let name = name.to_string();
    tokio::spawn(async move { engine.load(&name).await })
}

async fn next_event(events: &mut broadcast::Receiver<SyncEvent>) -> SyncEvent {
    tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("no event in time")
        .expect("event channel closed")
}

#[tokio::test]
async fn test_new_version_replaces_cached_one() {
    let ws = TestWorkspace::new();
    ws.seed_cache("onboarding", "v1", "onboarding-v1.pkg");
    ws.write_marker(100);
    let address = ws.publish_file("onboarding", "v2");
    let manifest = FakeManifest::new(vec![BundleDescriptor::remote(
        "onboarding",
        "v2",
        address,
    )]);
    let transport = CountingTransport::new();
    let engine = ws.start_engine(&manifest, &transport).await;

    let handle = started(&engine, 200).await;
    assert_eq!(handle.timestamp(), 200);
    let lookup = spawn_load(&engine, "onboarding");

    let report = handle.wait().await.unwrap();
    assert_eq!(report.timestamp, 200);
    assert_eq!(report.installed, vec!["onboarding".to_string()]);

    let loaded = lookup.await.unwrap().unwrap();
    assert_eq!(loaded.version(), "v2");
    assert_eq!(loaded.descriptor.tier, ProvenanceTier::Newest);
    assert_eq!(
        loaded.path,
        ws.cache_version_dir("onboarding", "v2")
            .join("onboarding-v2.pkg")
    );
    assert_eq!(loaded.files, vec![PathBuf::from("onboarding-v2.pkg")]);

    assert!(!ws.cache_version_dir("onboarding", "v1").exists());
    assert_eq!(ws.read_marker(), Some(200));

    let status = engine.status().await.unwrap();
    assert_eq!(status.state, SyncState::Synced);
    assert!(status.manifest_retrieved);
    assert!(status.downloaded);
    assert_eq!(status.local_timestamp, Some(200));
    assert_eq!(transport.count(), 1);
}

#[tokio::test]
async fn test_confirmed_version_is_not_downloaded() {
    let ws = TestWorkspace::new();
    ws.seed_cache("onboarding", "v1", "onboarding-v1.pkg");
    let address = ws.publish_file("onboarding", "v1");
    let manifest = FakeManifest::new(vec![BundleDescriptor::remote(
        "onboarding",
        "v1",
        address,
    )]);
    let transport = CountingTransport::new();
    let engine = ws.start_engine(&manifest, &transport).await;

    let report = started(&engine, 200).await.wait().await.unwrap();

    assert!(report.installed.is_empty());
    assert_eq!(transport.count(), 0);
    let snapshot = engine.inventory().await.unwrap();
    let entry = snapshot.local.get("onboarding").unwrap();
    assert_eq!(entry.version, "v1");
    assert_eq!(entry.tier, ProvenanceTier::Newest);
    assert!(snapshot.remote.is_empty());
    assert_eq!(ws.read_marker(), Some(200));
}

#[tokio::test]
async fn test_forced_sync_reinstalls_confirmed_version() {
    let ws = TestWorkspace::new();
    ws.seed_cache("onboarding", "v1", "onboarding-v1.pkg");
    let address = ws.publish_file("onboarding", "v1");
    let manifest = FakeManifest::new(vec![BundleDescriptor::remote(
        "onboarding",
        "v1",
        address,
    )]);
    let transport = CountingTransport::new();
    let engine = ws.start_engine(&manifest, &transport).await;

    started(&engine, 200).await.wait().await.unwrap();
    assert_eq!(transport.count(), 0);

    let report = engine.sync_downloads(true, 300).await.unwrap();
    assert_eq!(report.installed, vec!["onboarding".to_string()]);
    assert_eq!(transport.count(), 1);
    assert_eq!(ws.read_marker(), Some(300));

    let loaded = engine.load("onboarding").await.unwrap();
    assert_eq!(loaded.version(), "v1");
    assert_eq!(loaded.descriptor.tier, ProvenanceTier::Newest);
    assert_eq!(
        loaded.path,
        ws.cache_version_dir("onboarding", "v1")
            .join("onboarding-v1.pkg")
    );
}

#[tokio::test]
async fn test_missing_bundle_after_manifest_is_not_found() {
    let ws = TestWorkspace::new();
    let manifest = FakeManifest::new(Vec::new());
    let transport = CountingTransport::new();
    let engine = ws.start_engine(&manifest, &transport).await;

    engine.fetch_manifest().await.unwrap();

    let err = engine.load("missing").await.unwrap_err();
    assert_eq!(
        err,
        BundleSyncError::BundleNotFound {
            name: "missing".to_string()
        }
    );
    assert_eq!(engine.status().await.unwrap().pending_requests, 0);
}

#[tokio::test]
async fn test_invalid_name_is_rejected_before_queueing() {
    let ws = TestWorkspace::new();
    let manifest = FakeManifest::new(Vec::new());
    let transport = CountingTransport::new();
    let engine = ws.start_engine(&manifest, &transport).await;

    let err = engine.load("../escape").await.unwrap_err();
    assert!(matches!(err, BundleSyncError::InvalidBundleName { .. }));
    assert_eq!(engine.status().await.unwrap().pending_requests, 0);
}

#[tokio::test]
async fn test_equal_timestamp_flushes_queue_without_fetching() {
    let ws = TestWorkspace::new();
    ws.seed_cache("onboarding", "v1", "onboarding-v1.pkg");
    ws.seed_prepackaged("tutorial", "1.0", "tutorial.pkg");
    ws.write_marker(100);
    let manifest = FakeManifest::new(Vec::new());
    let transport = CountingTransport::new();
    let engine = ws.start_engine(&manifest, &transport).await;

    let onboarding = spawn_load(&engine, "onboarding");
    let tutorial = spawn_load(&engine, "tutorial");
    wait_for_pending(&engine, 2).await;

    let trigger = engine.on_server_timestamp(100).await.unwrap();
    assert!(matches!(trigger, Trigger::AlreadyFresh));

    let onboarding = onboarding.await.unwrap().unwrap();
    assert_eq!(onboarding.version(), "v1");
    assert_eq!(onboarding.descriptor.tier, ProvenanceTier::LocalCache);
    let tutorial = tutorial.await.unwrap().unwrap();
    assert_eq!(tutorial.descriptor.tier, ProvenanceTier::Prepackaged);

    assert_eq!(manifest.calls(), 0);
    assert_eq!(transport.count(), 0);
    assert_eq!(engine.status().await.unwrap().state, SyncState::Synced);

    // Fresh now: lookups are answered without queueing
    assert_eq!(engine.load("onboarding").await.unwrap().version(), "v1");
}

#[tokio::test]
async fn test_queued_lookups_share_one_outcome() {
    let ws = TestWorkspace::new();
    ws.seed_cache("onboarding", "v1", "onboarding-v1.pkg");
    let address = ws.publish_file("onboarding", "v2");
    let manifest = FakeManifest::gated(vec![BundleDescriptor::remote(
        "onboarding",
        "v2",
        address,
    )]);
    let transport = CountingTransport::new();
    let engine = ws.start_engine(&manifest, &transport).await;

    let handle = started(&engine, 200).await;
    let lookups: Vec<_> = (0..3).map(|_| spawn_load(&engine, "onboarding")).collect();
    wait_for_pending(&engine, 3).await;
    assert_eq!(
        engine.status().await.unwrap().state,
        SyncState::Syncing(bundlesync::SyncPhase::Manifest)
    );

    manifest.release();
    handle.wait().await.unwrap();

    let mut outcomes = Vec::new();
    for lookup in lookups {
        outcomes.push(lookup.await.unwrap().unwrap());
    }
    assert_eq!(outcomes[0].version(), "v2");
    assert!(outcomes.iter().all(|loaded| *loaded == outcomes[0]));
    assert_eq!(engine.status().await.unwrap().pending_requests, 0);
}

#[tokio::test]
async fn test_timestamp_during_cycle_is_dropped() {
    let ws = TestWorkspace::new();
    let address = ws.publish_file("onboarding", "v2");
    let manifest = FakeManifest::gated(vec![BundleDescriptor::remote(
        "onboarding",
        "v2",
        address,
    )]);
    let transport = CountingTransport::new();
    let engine = ws.start_engine(&manifest, &transport).await;

    let handle = started(&engine, 200).await;
    let trigger = engine.on_server_timestamp(300).await.unwrap();
    assert!(matches!(trigger, Trigger::Dropped));

    manifest.release();
    handle.wait().await.unwrap();
    assert_eq!(ws.read_marker(), Some(200));

    // The dropped update is picked up by the next report
    let handle = started(&engine, 300).await;
    manifest.release();
    let report = handle.wait().await.unwrap();
    assert!(report.installed.is_empty());
    assert_eq!(ws.read_marker(), Some(300));
    assert_eq!(manifest.calls(), 2);
    assert_eq!(transport.count(), 1);
}

#[tokio::test]
async fn test_repeated_sync_is_idempotent_unless_forced() {
    let ws = TestWorkspace::new();
    let address = ws.publish_file("onboarding", "v2");
    let manifest = FakeManifest::new(vec![BundleDescriptor::remote(
        "onboarding",
        "v2",
        address,
    )]);
    let transport = CountingTransport::new();
    let engine = ws.start_engine(&manifest, &transport).await;

    started(&engine, 200).await.wait().await.unwrap();
    assert_eq!(transport.count(), 1);

    let report = engine.sync_downloads(false, 300).await.unwrap();
    assert!(report.installed.is_empty());
    assert_eq!(transport.count(), 1);
    assert_eq!(ws.read_marker(), Some(300));

    let report = engine.sync_downloads(true, 400).await.unwrap();
    assert_eq!(report.installed, vec!["onboarding".to_string()]);
    assert_eq!(transport.count(), 2);
    assert_eq!(ws.read_marker(), Some(400));
    assert_eq!(engine.load("onboarding").await.unwrap().version(), "v2");
}

#[tokio::test]
async fn test_failed_download_does_not_block_siblings() {
    let ws = TestWorkspace::new();
    let alpha = ws.publish_file("alpha", "v1");
    let gamma = ws.publish_file("gamma", "v1");
    let missing = ws.server_dir().join("broken-v1.pkg").display().to_string();
    let manifest = FakeManifest::new(vec![
        BundleDescriptor::remote("alpha", "v1", alpha),
        BundleDescriptor::remote("broken", "v1", missing),
        BundleDescriptor::remote("gamma", "v1", gamma),
    ]);
    let transport = CountingTransport::new();
    let engine = ws.start_engine(&manifest, &transport).await;

    let err = started(&engine, 200).await.wait().await.unwrap_err();
    assert!(matches!(err, BundleSyncError::DownloadFailed { ref name, .. } if name == "broken"));

    let snapshot = engine.inventory().await.unwrap();
    assert_eq!(snapshot.local.get("alpha").unwrap().tier, ProvenanceTier::Newest);
    assert_eq!(snapshot.local.get("gamma").unwrap().tier, ProvenanceTier::Newest);
    assert!(!snapshot.local.contains("broken"));
    assert!(!ws.cache_version_dir("broken", "v1").exists());

    let status = engine.status().await.unwrap();
    assert_eq!(status.state, SyncState::Synced);
    assert!(!status.downloaded);
    assert_eq!(ws.read_marker(), Some(200));

    assert!(engine.load("alpha").await.is_ok());
    assert!(matches!(
        engine.load("broken").await,
        Err(BundleSyncError::BundleNotFound { .. })
    ));
}

#[tokio::test]
async fn test_manifest_failure_aborts_cycle() {
    let ws = TestWorkspace::new();
    ws.seed_cache("onboarding", "v1", "onboarding-v1.pkg");
    ws.write_marker(100);
    let manifest = FakeManifest::failing(fetch_failed("connection refused"));
    let transport = CountingTransport::new();
    let engine = ws.start_engine(&manifest, &transport).await;
    let mut events = engine.subscribe();

    let lookup = spawn_load(&engine, "onboarding");
    wait_for_pending(&engine, 1).await;

    let err = started(&engine, 200).await.wait().await.unwrap_err();
    assert!(matches!(err, BundleSyncError::ManifestFetchFailed { .. }));

    // Queued lookups fall back to what is cached
    let loaded = lookup.await.unwrap().unwrap();
    assert_eq!(loaded.version(), "v1");

    assert_eq!(
        next_event(&mut events).await,
        SyncEvent::ManifestRetrieved {
            result: Err(err.clone())
        }
    );
    assert_eq!(ws.read_marker(), Some(100));
    let status = engine.status().await.unwrap();
    assert_eq!(status.state, SyncState::Unsynced);
    assert!(!status.manifest_retrieved);
    assert_eq!(status.local_timestamp, Some(100));
    assert_eq!(transport.count(), 0);
}

#[tokio::test]
async fn test_concurrent_requests_are_rejected_while_fetching() {
    let ws = TestWorkspace::new();
    let address = ws.publish_file("onboarding", "v1");
    let manifest = FakeManifest::gated(vec![BundleDescriptor::remote(
        "onboarding",
        "v1",
        address,
    )]);
    let transport = CountingTransport::new();
    let engine = ws.start_engine(&manifest, &transport).await;

    let first = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.fetch_manifest().await })
    };
    let gate = &manifest;
    common::eventually(|| async move { gate.calls() == 1 }).await;

    assert_eq!(
        engine.fetch_manifest().await.unwrap_err(),
        BundleSyncError::ManifestFetchInProgress
    );
    assert_eq!(
        engine.sync_downloads(false, 200).await.unwrap_err(),
        BundleSyncError::SyncInProgress
    );

    manifest.release();
    let remote = first.await.unwrap().unwrap();
    assert_eq!(remote.len(), 1);
    assert_eq!(manifest.calls(), 1);

    // Downloads reuse the retrieved manifest
    let report = engine.sync_downloads(false, 200).await.unwrap();
    assert_eq!(report.installed, vec!["onboarding".to_string()]);
    assert_eq!(manifest.calls(), 1);
}

#[tokio::test]
async fn test_equal_timestamp_during_manifest_fetch_flushes_queue() {
    let ws = TestWorkspace::new();
    ws.seed_cache("onboarding", "v1", "onboarding-v1.pkg");
    ws.write_marker(100);
    let address = ws.publish_file("onboarding", "v1");
    let manifest = FakeManifest::gated(vec![BundleDescriptor::remote(
        "onboarding",
        "v1",
        address,
    )]);
    let transport = CountingTransport::new();
    let engine = ws.start_engine(&manifest, &transport).await;

    let fetch = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.fetch_manifest().await })
    };
    let gate = &manifest;
    common::eventually(|| async move { gate.calls() == 1 }).await;

    let lookup = spawn_load(&engine, "onboarding");
    wait_for_pending(&engine, 1).await;

    let trigger = engine.on_server_timestamp(200).await.unwrap();
    assert!(matches!(trigger, Trigger::Dropped));
    assert_eq!(engine.status().await.unwrap().pending_requests, 1);

    let trigger = engine.on_server_timestamp(100).await.unwrap();
    assert!(matches!(trigger, Trigger::AlreadyFresh));
    let loaded = lookup.await.unwrap().unwrap();
    assert_eq!(loaded.version(), "v1");

    manifest.release();
    fetch.await.unwrap().unwrap();
    let status = engine.status().await.unwrap();
    assert_eq!(status.state, SyncState::Synced);
    assert_eq!(status.pending_requests, 0);
    assert_eq!(ws.read_marker(), Some(100));
    assert_eq!(transport.count(), 0);
}

#[tokio::test]
async fn test_archive_package_is_unpacked() {
    let ws = TestWorkspace::new();
    let address = ws.publish_archive(
        "guide",
        "v1",
        &[
            ("guide.bundle/strings.json", "{}"),
            ("guide.bundle/images/logo.png", "png"),
        ],
    );
    let manifest = FakeManifest::new(vec![BundleDescriptor::remote("guide", "v1", address)]);
    let transport = CountingTransport::new();
    let engine = ws.start_engine(&manifest, &transport).await;

    started(&engine, 200).await.wait().await.unwrap();

    let loaded = engine.load("guide").await.unwrap();
    assert_eq!(loaded.path, ws.cache_version_dir("guide", "v1").join("guide.bundle"));
    assert_eq!(
        loaded.files,
        vec![
            PathBuf::from("images/logo.png"),
            PathBuf::from("strings.json")
        ]
    );
}

#[tokio::test]
async fn test_eviction_can_be_disabled() {
    let ws = TestWorkspace::new();
    ws.seed_cache("onboarding", "v1", "onboarding-v1.pkg");
    let address = ws.publish_file("onboarding", "v2");
    let manifest = FakeManifest::new(vec![BundleDescriptor::remote(
        "onboarding",
        "v2",
        address,
    )]);
    let transport = CountingTransport::new();
    let mut config = ws.engine_config();
    config.evict_old_versions = false;
    let engine = ws.start_engine_with(config, &manifest, &transport).await;

    started(&engine, 200).await.wait().await.unwrap();

    assert!(ws.cache_version_dir("onboarding", "v1").exists());
    assert!(ws.cache_version_dir("onboarding", "v2").exists());
    assert_eq!(engine.load("onboarding").await.unwrap().version(), "v2");
}

#[tokio::test]
async fn test_cycle_events_in_order() {
    let ws = TestWorkspace::new();
    let alpha = ws.publish_file("alpha", "v1");
    let beta = ws.publish_file("beta", "v1");
    let manifest = FakeManifest::new(vec![
        BundleDescriptor::remote("alpha", "v1", alpha),
        BundleDescriptor::remote("beta", "v1", beta),
    ]);
    let transport = CountingTransport::new();
    let engine = ws.start_engine(&manifest, &transport).await;
    let mut events = engine.subscribe();

    started(&engine, 200).await.wait().await.unwrap();

    assert_eq!(
        next_event(&mut events).await,
        SyncEvent::ManifestRetrieved { result: Ok(2) }
    );
    assert_eq!(
        next_event(&mut events).await,
        SyncEvent::DownloadsStarted {
            timestamp: 200,
            total: 2
        }
    );
    let mut installed = Vec::new();
    for _ in 0..2 {
        match next_event(&mut events).await {
            SyncEvent::BundleInstalled { name, version } => {
                assert_eq!(version, "v1");
                installed.push(name);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
    installed.sort();
    assert_eq!(installed, vec!["alpha", "beta"]);
    assert_eq!(
        next_event(&mut events).await,
        SyncEvent::DownloadsFinished {
            timestamp: 200,
            error: None
        }
    );
}

#[tokio::test]
async fn test_restart_rebuilds_from_disk() {
    let ws = TestWorkspace::new();
    let address = ws.publish_file("onboarding", "v2");
    let manifest = FakeManifest::new(vec![BundleDescriptor::remote(
        "onboarding",
        "v2",
        address,
    )]);
    let transport = CountingTransport::new();

    {
        let engine = ws.start_engine(&manifest, &transport).await;
        started(&engine, 200).await.wait().await.unwrap();
    }

    let engine = ws.start_engine(&manifest, &transport).await;
    let status = engine.status().await.unwrap();
    assert_eq!(status.state, SyncState::Unsynced);
    assert_eq!(status.local_timestamp, Some(200));
    assert_eq!(status.local_bundles, 1);

    assert!(matches!(
        engine.on_server_timestamp(200).await.unwrap(),
        Trigger::AlreadyFresh
    ));
    let loaded = engine.load("onboarding").await.unwrap();
    assert_eq!(loaded.version(), "v2");
    assert_eq!(loaded.descriptor.tier, ProvenanceTier::LocalCache);
    assert_eq!(transport.count(), 1);
}
