//! Loaded bundle artifacts
//!
//! A lookup resolves to a [`LoadedBundle`]: the descriptor it came from plus the
//! files the installed package contains.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{
    Result,
    bundle::{load_failed, not_found},
};

use super::BundleDescriptor;

/// An installed bundle that was opened successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedBundle {
    pub descriptor: BundleDescriptor,
    /// Artifact path (a file or an unpacked package directory)
    pub path: PathBuf,
    /// Files in the package, relative to `path`, sorted. A single-file artifact lists its own name.
    pub files: Vec<PathBuf>,
}

impl LoadedBundle {
    /// Open the artifact a descriptor points at
    ///
    /// Blocking: walks the package directory.
    pub fn open(descriptor: &BundleDescriptor) -> Result<Self> {
        let Some(path) = descriptor.location.local_path() else {
            return Err(not_found(&descriptor.name));
        };

        let files = list_package_files(&descriptor.name, path)?;

        Ok(Self {
            descriptor: descriptor.clone(),
            path: path.to_path_buf(),
            files,
        })
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn version(&self) -> &str {
        &self.descriptor.version
    }
}

fn list_package_files(name: &str, path: &Path) -> Result<Vec<PathBuf>> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| load_failed(name, path.display().to_string(), e.to_string()))?;

    if metadata.is_file() {
        // Opening proves the artifact is readable, not just present
        std::fs::File::open(path)
            .map_err(|e| load_failed(name, path.display().to_string(), e.to_string()))?;
        let file_name = path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| path.to_path_buf());
        return Ok(vec![file_name]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).min_depth(1).sort_by_file_name() {
        let entry =
            entry.map_err(|e| load_failed(name, path.display().to_string(), e.to_string()))?;
        if entry.file_type().is_file() {
            if let Ok(relative) = entry.path().strip_prefix(path) {
                files.push(relative.to_path_buf());
            }
        }
    }

    if files.is_empty() {
        return Err(load_failed(
            name,
            path.display().to_string(),
            "package contains no files",
        ));
    }

    Ok(files)
}
