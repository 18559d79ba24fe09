//! Persisted "last known server update time" marker
//!
//! The marker holds a server-issued timestamp as decimal seconds since the epoch.
//! It is never derived from the local clock.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, fs::write_failed};

/// Read the marker; `None` when it is absent or does not hold a decimal number
pub fn read_marker(path: &Path) -> Option<u64> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No readable timestamp marker");
            return None;
        }
    };

    match content.trim().parse::<u64>() {
        Ok(timestamp) => Some(timestamp),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Ignoring unparseable timestamp marker");
            None
        }
    }
}

/// Replace the marker atomically (write to a sibling temp file, then rename)
pub fn write_marker(path: &Path, timestamp: u64) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let display = path.display().to_string();

    let mut file =
        NamedTempFile::new_in(dir).map_err(|e| write_failed(&display, e.to_string()))?;
    file.write_all(timestamp.to_string().as_bytes())
        .map_err(|e| write_failed(&display, e.to_string()))?;
    file.persist(path)
        .map_err(|e| write_failed(&display, e.error.to_string()))?;

    Ok(())
}
