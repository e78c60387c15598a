//! Directory watcher with notify integration.
//!
//! Watches one directory (non-recursive) and emits classified events on a
//! tokio channel.

use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Duration;

use notify_debouncer_full::{
    new_debouncer,
    notify::{
        self,
        event::{ModifyKind, RenameMode},
        Event, EventKind, RecursiveMode,
    },
    DebounceEventResult,
};
use tokio::sync::mpsc;

use super::error::WatchError;

/// How often the bridge thread checks for a stop request.
const BRIDGE_POLL: Duration = Duration::from_millis(100);

/// Events emitted by the directory watcher.
#[derive(Debug)]
pub enum WatchEvent {
    /// A file appeared (created or renamed into the directory).
    Added(PathBuf),
    /// A file's content changed.
    Modified(PathBuf),
    /// A file was deleted or renamed away.
    Removed(PathBuf),
    /// The OS dropped events; the directory should be listed again.
    Rescan,
    /// Recoverable watcher error.
    Error(WatchError),
    /// The subscription is dead.
    Fatal(WatchError),
}

impl WatchEvent {
    /// Path the event refers to, for file events.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Added(p) | Self::Modified(p) | Self::Removed(p) => Some(p),
            Self::Rescan | Self::Error(_) | Self::Fatal(_) => None,
        }
    }
}

/// Watches a directory for file changes.
///
/// Uses notify-debouncer-full and bridges events to a tokio mpsc channel.
/// Dropping the watcher stops the bridge thread and releases the OS watch.
pub struct DirectoryWatcher {
    directory: PathBuf,
    stop_tx: std_mpsc::Sender<()>,
    bridge_handle: Option<thread::JoinHandle<()>>,
}

impl DirectoryWatcher {
    /// Start watching `directory`.
    ///
    /// Returns the watcher and a receiver for watch events. The receiver
    /// yields `None` once the bridge thread has exited.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS watch cannot be established.
    pub fn new(
        directory: PathBuf,
        debounce: Duration,
    ) -> Result<(Self, mpsc::UnboundedReceiver<WatchEvent>), WatchError> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = std_mpsc::channel();
        let (notify_tx, notify_rx) = std_mpsc::channel();

        let mut debouncer = new_debouncer(debounce, None, move |result| {
            let _ = notify_tx.send(result);
        })?;
        debouncer.watch(&directory, RecursiveMode::NonRecursive)?;

        let watched = directory.clone();
        let bridge_handle = thread::spawn(move || {
            loop {
                if stop_rx.try_recv().is_ok() {
                    break;
                }
                match notify_rx.recv_timeout(BRIDGE_POLL) {
                    Ok(result) => {
                        if !forward(result, &watched, &event_tx) {
                            break;
                        }
                    }
                    Err(std_mpsc::RecvTimeoutError::Timeout) => {}
                    Err(std_mpsc::RecvTimeoutError::Disconnected) => {
                        tracing::error!("Debouncer channel closed");
                        break;
                    }
                }
            }

            // Keep debouncer alive until thread exits
            drop(debouncer);
            tracing::debug!(path = %watched.display(), "Watch released");
        });

        Ok((
            Self {
                directory,
                stop_tx,
                bridge_handle: Some(bridge_handle),
            },
            event_rx,
        ))
    }

    /// Stop the bridge thread and release the watch. Idempotent.
    pub fn stop(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.bridge_handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Watcher bridge thread panicked");
            }
        }
    }

    /// Get the directory being watched.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Send classified events; false once the receiver is gone.
fn forward(
    result: DebounceEventResult,
    directory: &Path,
    event_tx: &mpsc::UnboundedSender<WatchEvent>,
) -> bool {
    let events: Vec<WatchEvent> = match result {
        Ok(events) => events
            .iter()
            .flat_map(|e| classify(&e.event, directory))
            .collect(),
        Err(errors) => errors
            .into_iter()
            .map(|e| classify_error(e, directory))
            .collect(),
    };
    events.into_iter().all(|ev| event_tx.send(ev).is_ok())
}

/// Map a notify event to watch events.
#[must_use]
pub fn classify(event: &Event, directory: &Path) -> Vec<WatchEvent> {
    if event.need_rescan() {
        return vec![WatchEvent::Rescan];
    }

    let paths = &event.paths;
    let touches_root = paths.iter().any(|p| p == directory);
    let added = || -> Vec<WatchEvent> { paths.iter().cloned().map(WatchEvent::Added).collect() };
    let removed = || -> Vec<WatchEvent> { paths.iter().cloned().map(WatchEvent::Removed).collect() };

    match event.kind {
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From))
            if touches_root =>
        {
            vec![WatchEvent::Fatal(WatchError::DirectoryRemoved(
                directory.to_path_buf(),
            ))]
        }
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => added(),
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From)) => removed(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match paths.as_slice() {
            [from, to] => vec![
                WatchEvent::Removed(from.clone()),
                WatchEvent::Added(to.clone()),
            ],
            _ => Vec::new(),
        },
        EventKind::Modify(ModifyKind::Name(_)) => paths
            .iter()
            .map(|p| {
                if p.exists() {
                    WatchEvent::Added(p.clone())
                } else {
                    WatchEvent::Removed(p.clone())
                }
            })
            .collect(),
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(_) => paths.iter().cloned().map(WatchEvent::Modified).collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

fn classify_error(error: notify::Error, directory: &Path) -> WatchEvent {
    match error.kind {
        notify::ErrorKind::PathNotFound | notify::ErrorKind::WatchNotFound
            if error.paths.iter().any(|p| p == directory) =>
        {
            WatchEvent::Fatal(WatchError::DirectoryRemoved(directory.to_path_buf()))
        }
        notify::ErrorKind::MaxFilesWatch => WatchEvent::Fatal(WatchError::Notify(error)),
        _ => WatchEvent::Error(WatchError::Notify(error)),
    }
}
