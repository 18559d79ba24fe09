//! Tar archive extraction, optionally gzip-compressed

use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::{debug, warn};

use crate::error::{
    Result,
    fs::{read_failed, write_failed},
};

use super::Extractor;

/// Extracts `.tar`, `.tar.gz` and `.tgz` packages
///
/// Compression is detected from the gzip magic bytes, not the file name, because
/// downloads arrive as anonymous temp files.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarExtractor;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

impl TarExtractor {
    pub fn new() -> Self {
        Self
    }

    fn unpack<R: Read>(
        mut archive: ::tar::Archive<R>,
        source: &Path,
        destination: &Path,
    ) -> Result<Vec<PathBuf>> {
        let source_display = source.display().to_string();
        let mut produced: Vec<PathBuf> = Vec::new();

        let entries = archive
            .entries()
            .map_err(|e| read_failed(&source_display, e.to_string()))?;

        for entry in entries {
            let mut entry = entry.map_err(|e| read_failed(&source_display, e.to_string()))?;
            let entry_path = entry
                .path()
                .map_err(|e| read_failed(&source_display, e.to_string()))?
                .into_owned();

            let unpacked = entry.unpack_in(destination).map_err(|e| {
                write_failed(destination.display().to_string(), e.to_string())
            })?;
            if !unpacked {
                warn!(entry = %entry_path.display(), "Skipping archive entry outside destination");
                continue;
            }

            if let Some(top) = top_level_component(&entry_path) {
                let top = destination.join(top);
                if !produced.contains(&top) {
                    produced.push(top);
                }
            }
        }

        debug!(
            destination = %destination.display(),
            entries = produced.len(),
            "Archive extracted"
        );
        Ok(produced)
    }
}

impl Extractor for TarExtractor {
    fn extract(&self, source: &Path, destination: &Path) -> Result<Vec<PathBuf>> {
        let mut magic = [0u8; 2];
        let is_gzip = File::open(source)
            .and_then(|mut file| file.read_exact(&mut magic))
            .map(|()| magic == GZIP_MAGIC)
            .unwrap_or(false);

        let file = File::open(source)
            .map_err(|e| read_failed(source.display().to_string(), e.to_string()))?;

        if is_gzip {
            Self::unpack(::tar::Archive::new(GzDecoder::new(file)), source, destination)
        } else {
            Self::unpack(::tar::Archive::new(file), source, destination)
        }
    }
}

fn top_level_component(path: &Path) -> Option<PathBuf> {
    path.components().find_map(|component| match component {
        Component::Normal(name) => Some(PathBuf::from(name)),
        _ => None,
    })
}
