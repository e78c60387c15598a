//! Directory watching.
//!
//! Start-up listing plus a debounced notify subscription on one directory.

mod directory_watcher;
mod error;
mod scan;

pub use directory_watcher::{classify, DirectoryWatcher, WatchEvent};
pub use error::WatchError;
pub use scan::scan_targets;
