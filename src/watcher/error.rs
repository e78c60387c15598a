//! Watcher error types.

use std::path::PathBuf;

/// Errors from the directory subscription and the start-up scan.
#[derive(thiserror::Error, Debug)]
pub enum WatchError {
    /// The watched directory could not be listed.
    #[error("Cannot read directory {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Notify watcher error.
    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// The watched directory itself disappeared.
    #[error("Watched directory removed: {0}")]
    DirectoryRemoved(PathBuf),

    /// The event bridge stopped while the pipeline was still running.
    #[error("Watch subscription lost")]
    SubscriptionLost,
}
