//! Filesystem transport for `file://` URLs and plain paths

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, download::unsupported_address, fs::read_failed};

use super::{Transport, local_path_for};

/// Copies packages from the local filesystem into temp files
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTransport;

impl FileTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for FileTransport {
    async fn download(&self, address: &str) -> Result<NamedTempFile> {
        let source = local_path_for(address).ok_or_else(|| unsupported_address(address))?;

        let temp = crate::temp::download_temp_file()?;
        let bytes = tokio::fs::copy(&source, temp.path())
            .await
            .map_err(|e| read_failed(source.display().to_string(), e.to_string()))?;
        debug!(source = %source.display(), bytes, "Fetched package");

        Ok(temp)
    }
}
