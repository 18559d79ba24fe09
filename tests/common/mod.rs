//! Common test utilities for bundlesync integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::{NamedTempFile, TempDir};
use tokio::sync::Semaphore;

use bundlesync::error::{BundleSyncError, Result};
use bundlesync::extract::TarExtractor;
use bundlesync::manifest::ManifestFetcher;
use bundlesync::transport::{FileTransport, Transport};
use bundlesync::{BundleDescriptor, BundleSync, EngineConfig};

/// A test workspace: cache, prepackaged assets and a "server" directory
pub struct TestWorkspace {
    /// Temporary directory
    pub temp: TempDir,
    /// Path to workspace root
    pub path: PathBuf,
}

impl TestWorkspace {
    /// Create a new test workspace
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = temp.path().to_path_buf();
        Self { temp, path }
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.path.join("cache")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.path.join("assets")
    }

    pub fn server_dir(&self) -> PathBuf {
        self.path.join("server")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.server_dir().join("manifest.json")
    }

    /// Write a file in workspace
    pub fn write_file(&self, path: &str, content: &str) -> PathBuf {
        let file_path = self.path.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
        file_path
    }

    /// Check if a file exists in workspace
    pub fn file_exists(&self, path: &str) -> bool {
        self.path.join(path).exists()
    }

    /// Place `cache/<name>/<version>/<file>`
    pub fn seed_cache(&self, name: &str, version: &str, file: &str) -> PathBuf {
        self.write_file(
            &format!("cache/{name}/{version}/{file}"),
            &format!("{name}@{version}"),
        )
    }

    /// Place `assets/<name>/<version>/<file>`
    pub fn seed_prepackaged(&self, name: &str, version: &str, file: &str) -> PathBuf {
        self.write_file(
            &format!("assets/{name}/{version}/{file}"),
            &format!("{name}@{version}"),
        )
    }

    pub fn cache_version_dir(&self, name: &str, version: &str) -> PathBuf {
        self.cache_dir().join(name).join(version)
    }

    /// Publish a single-file package on the server, returning its address
    pub fn publish_file(&self, name: &str, version: &str) -> String {
        self.write_file(
            &format!("server/{name}-{version}.pkg"),
            &format!("{name}@{version}"),
        )
        .display()
        .to_string()
    }

    /// Publish a gzipped tarball on the server, returning its address
    pub fn publish_archive(&self, name: &str, version: &str, files: &[(&str, &str)]) -> String {
        let path = self.server_dir().join(format!("{name}-{version}.tar.gz"));
        std::fs::create_dir_all(self.server_dir()).expect("Failed to create server directory");
        write_tar_gz(&path, files);
        path.display().to_string()
    }

    /// Write `server/manifest.json` from (name, version, url) entries
    pub fn write_manifest(&self, entries: &[(&str, &str, Option<&str>)]) -> PathBuf {
        let bundles: Vec<serde_json::Value> = entries
            .iter()
            .map(|(name, version, url)| match url {
                Some(url) => serde_json::json!({ "name": name, "version": version, "url": url }),
                None => serde_json::json!({ "name": name, "version": version }),
            })
            .collect();
        let document = serde_json::json!({ "bundles": bundles });
        self.write_file(
            "server/manifest.json",
            &serde_json::to_string_pretty(&document).expect("Failed to serialize manifest"),
        )
    }

    pub fn write_marker(&self, timestamp: u64) {
        self.write_file("cache/.bundles_last_updated", &format!("{timestamp}\n"));
    }

    pub fn read_marker(&self) -> Option<u64> {
        std::fs::read_to_string(self.cache_dir().join(".bundles_last_updated"))
            .ok()
            .and_then(|content| content.trim().parse().ok())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            cache_dir: self.cache_dir(),
            prepackaged_dir: Some(self.assets_dir()),
            evict_old_versions: true,
        }
    }

    /// Start an engine over this workspace with the given fakes
    pub async fn start_engine(
        &self,
        manifest: &Arc<FakeManifest>,
        transport: &Arc<CountingTransport>,
    ) -> BundleSync {
        self.start_engine_with(self.engine_config(), manifest, transport)
            .await
    }

    pub async fn start_engine_with(
        &self,
        config: EngineConfig,
        manifest: &Arc<FakeManifest>,
        transport: &Arc<CountingTransport>,
    ) -> BundleSync {
        BundleSync::start(
            config,
            manifest.clone(),
            transport.clone(),
            Arc::new(TarExtractor::new()),
        )
        .await
        .expect("Failed to start engine")
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a `.tar.gz` holding `files` (path, content)
pub fn write_tar_gz(path: &Path, files: &[(&str, &str)]) {
    let file = std::fs::File::create(path).expect("Failed to create archive");
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder
            .append_data(&mut header, name, content.as_bytes())
            .expect("Failed to append archive entry");
    }
    builder
        .into_inner()
        .expect("Failed to finish archive")
        .finish()
        .expect("Failed to finish gzip stream");
}

/// Manifest fetcher returning canned descriptors, optionally held until released
pub struct FakeManifest {
    response: Mutex<Result<Vec<BundleDescriptor>>>,
    calls: AtomicUsize,
    gate: Option<Semaphore>,
}

impl FakeManifest {
    pub fn new(descriptors: Vec<BundleDescriptor>) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Ok(descriptors)),
            calls: AtomicUsize::new(0),
            gate: None,
        })
    }

    pub fn failing(error: BundleSyncError) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Err(error)),
            calls: AtomicUsize::new(0),
            gate: None,
        })
    }

    /// Every fetch waits for one [`release`](Self::release)
    pub fn gated(descriptors: Vec<BundleDescriptor>) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Ok(descriptors)),
            calls: AtomicUsize::new(0),
            gate: Some(Semaphore::new(0)),
        })
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn set(&self, descriptors: Vec<BundleDescriptor>) {
        *self.response.lock().expect("manifest lock poisoned") = Ok(descriptors);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ManifestFetcher for FakeManifest {
    async fn fetch(&self) -> Result<Vec<BundleDescriptor>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("manifest gate closed").forget();
        }
        self.response
            .lock()
            .expect("manifest lock poisoned")
            .clone()
    }
}

/// File transport that records every address it is asked for
#[derive(Default)]
pub struct CountingTransport {
    inner: FileTransport,
    downloads: Mutex<Vec<String>>,
}

impl CountingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.downloads.lock().expect("transport lock poisoned").len()
    }

    pub fn addresses(&self) -> Vec<String> {
        self.downloads.lock().expect("transport lock poisoned").clone()
    }
}

#[async_trait]
impl Transport for CountingTransport {
    async fn download(&self, address: &str) -> Result<NamedTempFile> {
        self.downloads
            .lock()
            .expect("transport lock poisoned")
            .push(address.to_string());
        self.inner.download(address).await
    }
}

/// Poll until `predicate` holds, failing the test after two seconds
pub async fn eventually<F, Fut>(mut predicate: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..400 {
        if predicate().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

/// Wait until the engine holds `count` queued lookups
pub async fn wait_for_pending(engine: &BundleSync, count: usize) {
    eventually(|| async move {
        engine
            .status()
            .await
            .map(|status| status.pending_requests == count)
            .unwrap_or(false)
    })
    .await;
}

/// Command for the bundlesync binary, isolated from the user's environment
pub fn bundlesync_cmd(workspace: &TestWorkspace) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("bundlesync").expect("binary not built");
    cmd.current_dir(&workspace.path)
        .env_remove("BUNDLESYNC_CONFIG")
        .env_remove("BUNDLESYNC_PREPACKAGED_DIR")
        .env_remove("BUNDLESYNC_MANIFEST")
        .env_remove("RUST_LOG")
        .env("BUNDLESYNC_CACHE_DIR", workspace.cache_dir())
        .env("XDG_CONFIG_HOME", workspace.path.join("config"))
        .env("HOME", &workspace.path);
    cmd
}
