//! Progress bar display for sync cycles

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use bundlesync::SyncEvent;

/// Progress display for one sync cycle
pub struct SyncProgress {
    bar: ProgressBar,
}

impl SyncProgress {
    /// Create a progress display; the length is set once downloads start
    pub fn new() -> Self {
        let style = ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

        let bar = ProgressBar::new(0);
        bar.set_style(style);
        bar.set_message("fetching manifest");

        Self { bar }
    }

    #[cfg(test)]
    fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Follow engine events until the download cycle finishes
    pub fn track(&self, mut events: broadcast::Receiver<SyncEvent>) -> JoinHandle<()> {
        let bar = self.bar.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if !apply(&bar, &event) {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Finish progress
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    /// Abandon on error
    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

/// Update the bar for one event; false once nothing more is expected
fn apply(bar: &ProgressBar, event: &SyncEvent) -> bool {
    match event {
        SyncEvent::ManifestRetrieved { result: Ok(_) } => {
            bar.set_message("manifest retrieved");
            true
        }
        SyncEvent::ManifestRetrieved { result: Err(_) } => false,
        SyncEvent::DownloadsStarted { total, .. } => {
            bar.set_length(*total as u64);
            bar.set_message("downloading");
            true
        }
        SyncEvent::BundleInstalled { name, version } => {
            bar.set_message(format!("{name} {version}"));
            bar.inc(1);
            true
        }
        SyncEvent::BundleFailed { name, error } => {
            bar.println(format!("  failed {name}: {error}"));
            bar.inc(1);
            true
        }
        SyncEvent::DownloadsFinished { .. } => false,
    }
}
