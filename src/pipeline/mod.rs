//! Watch-and-convert pipeline.
//!
//! A [`Pipeline`] owns one directory, one matcher and one output file. It
//! runs a start-up scan, then converts on every matching add or modify
//! event until cancelled. Conversions are serialised on a per-pipeline
//! lock, so the output file never has two writers.

mod state;

pub use state::{PipelineState, PipelineStateMachine, PipelineStats};

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::{ConfigError, WatchConfig};
use crate::convert::{self, ConversionOutcome, ConversionResult, ConvertError};
use crate::display;
use crate::matcher::{is_noise, TargetMatcher};
use crate::watcher::{scan_targets, DirectoryWatcher, WatchError, WatchEvent};

/// Everything an event handler needs, shared by clones of a [`Pipeline`].
struct PipelineContext {
    directory: PathBuf,
    output: PathBuf,
    matcher: TargetMatcher,
    debounce: Duration,
    /// Held for the whole of each conversion.
    convert_lock: tokio::sync::Mutex<()>,
    machine: Mutex<PipelineStateMachine>,
}

/// Watch-and-convert pipeline. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Pipeline {
    ctx: Arc<PipelineContext>,
}

impl Pipeline {
    /// Build a pipeline from configuration.
    ///
    /// The directory is canonicalized when it exists so event paths and
    /// scan paths agree.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not validate.
    pub fn new(config: &WatchConfig) -> Result<Self, ConfigError> {
        let matcher = config.matcher()?;
        let directory =
            std::fs::canonicalize(&config.directory).unwrap_or_else(|_| config.directory.clone());
        let output = config.output_path_in(&directory);

        Ok(Self {
            ctx: Arc::new(PipelineContext {
                directory,
                output,
                matcher,
                debounce: Duration::from_millis(config.debounce_ms),
                convert_lock: tokio::sync::Mutex::new(()),
                machine: Mutex::new(PipelineStateMachine::new(config.failure_alert_threshold)),
            }),
        })
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.ctx.directory
    }

    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.ctx.output
    }

    #[must_use]
    pub fn matcher(&self) -> &TargetMatcher {
        &self.ctx.matcher
    }

    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.machine().state()
    }

    #[must_use]
    pub fn stats(&self) -> PipelineStats {
        self.machine().stats()
    }

    fn machine(&self) -> MutexGuard<'_, PipelineStateMachine> {
        self.ctx
            .machine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// True if `path` names a target file (noise names never do).
    #[must_use]
    pub fn is_candidate(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.is_candidate_name(name))
    }

    /// Candidate that can be read as a file. Directories named like a
    /// target are skipped; a path that has already vanished still passes so
    /// the failed read gets reported.
    fn is_convertible(&self, path: &Path) -> bool {
        self.is_candidate(path) && !path.is_dir()
    }

    fn is_candidate_name(&self, name: &str) -> bool {
        !is_noise(name) && self.ctx.matcher.is_target(name)
    }

    /// Targets currently in the directory, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Scan`] if the directory cannot be listed.
    pub fn find_targets(&self) -> Result<Vec<PathBuf>, WatchError> {
        scan_targets(&self.ctx.directory, |name| self.is_candidate_name(name))
    }

    /// Convert `input` into the output file, waiting for any conversion in
    /// flight to finish first.
    pub async fn convert(&self, input: &Path) -> ConversionResult {
        let _guard = self.ctx.convert_lock.lock().await;
        self.machine().transition(PipelineState::Converting);

        let source = input.to_path_buf();
        let destination = self.ctx.output.clone();
        let result = match tokio::task::spawn_blocking(move || {
            convert::convert(&source, &destination)
        })
        .await
        {
            Ok(result) => result,
            Err(e) => ConversionResult {
                source: input.to_path_buf(),
                destination: self.ctx.output.clone(),
                outcome: ConversionOutcome::Failed(ConvertError::Aborted {
                    path: input.to_path_buf(),
                    reason: e.to_string(),
                }),
            },
        };

        let alert = {
            let mut machine = self.machine();
            machine.transition(PipelineState::Idle);
            machine.record(&result)
        };
        self.report(&result, alert);
        result
    }

    fn report(&self, result: &ConversionResult, alert: bool) {
        match result.error() {
            None => tracing::info!(
                source = %result.source.display(),
                destination = %result.destination.display(),
                rows = result.rows().unwrap_or_default(),
                "Conversion succeeded"
            ),
            Some(err) => tracing::warn!(
                source = %result.source.display(),
                error = %err,
                "Conversion failed"
            ),
        }
        display::print_conversion(result);

        if alert {
            let consecutive = self.stats().consecutive_output_failures;
            tracing::error!(
                destination = %result.destination.display(),
                consecutive,
                "Output keeps failing to write"
            );
            display::print_alert(&result.destination, consecutive);
        }
    }

    /// List the directory and convert the first target by name, if any.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Scan`] if the directory cannot be listed.
    pub async fn startup_scan(&self) -> Result<Option<ConversionResult>, WatchError> {
        let targets = self.find_targets()?;
        let Some(first) = targets.first() else {
            tracing::info!(dir = %self.ctx.directory.display(), "No target yet, waiting");
            display::print_waiting(&self.ctx.directory);
            return Ok(None);
        };

        tracing::info!(
            path = %first.display(),
            candidates = targets.len(),
            "Found existing target"
        );
        display::print_scan_found(first, targets.len());
        Ok(Some(self.convert(first).await))
    }

    /// React to one watch event.
    ///
    /// Only [`WatchEvent::Fatal`] and a failed rescan produce an error;
    /// conversion failures are reported in the returned result.
    ///
    /// # Errors
    ///
    /// Returns the fatal watch error that should end the pipeline.
    pub async fn handle_event(
        &self,
        event: WatchEvent,
    ) -> Result<Option<ConversionResult>, WatchError> {
        match event {
            WatchEvent::Added(path) => {
                if !self.is_convertible(&path) {
                    tracing::trace!(path = %path.display(), "Ignoring add");
                    return Ok(None);
                }
                tracing::info!(path = %path.display(), "Target added");
                display::print_added(&path);
                Ok(Some(self.convert(&path).await))
            }
            WatchEvent::Modified(path) => {
                if !self.is_convertible(&path) {
                    tracing::trace!(path = %path.display(), "Ignoring modify");
                    return Ok(None);
                }
                tracing::info!(path = %path.display(), "Target modified");
                display::print_modified(&path);
                Ok(Some(self.convert(&path).await))
            }
            WatchEvent::Removed(path) => {
                if self.is_candidate(&path) {
                    tracing::info!(path = %path.display(), "Target removed, output kept");
                    display::print_removed(&path);
                }
                Ok(None)
            }
            WatchEvent::Rescan => {
                tracing::warn!("Filesystem events were dropped, rescanning");
                self.startup_scan().await
            }
            WatchEvent::Error(err) => {
                tracing::warn!(error = %err, "Watcher error");
                display::print_error(&err.to_string());
                Ok(None)
            }
            WatchEvent::Fatal(err) => Err(err),
        }
    }

    /// Scan, then convert on events until `shutdown` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the watch cannot be established, the directory
    /// cannot be listed, or the subscription dies.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), WatchError> {
        let (mut watcher, mut rx) =
            DirectoryWatcher::new(self.ctx.directory.clone(), self.ctx.debounce)?;
        tracing::info!(
            dir = %watcher.directory().display(),
            output = %self.ctx.output.display(),
            "Watching"
        );
        display::print_watch_start(watcher.directory(), &self.ctx.output);

        let outcome = match self.startup_scan().await {
            Ok(_) => self.event_loop(&mut rx, &shutdown).await,
            Err(e) => Err(e),
        };

        watcher.stop();
        match &outcome {
            Ok(()) => display::print_stop(),
            Err(e) => tracing::error!(error = %e, "Watcher stopped"),
        }
        outcome
    }

    async fn event_loop(
        &self,
        rx: &mut mpsc::UnboundedReceiver<WatchEvent>,
        shutdown: &CancellationToken,
    ) -> Result<(), WatchError> {
        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => {
                    tracing::info!("Shutdown requested");
                    return Ok(());
                }
                event = rx.recv() => {
                    let Some(event) = event else {
                        return Err(WatchError::SubscriptionLost);
                    };
                    for event in coalesce(drain(event, rx)) {
                        if shutdown.is_cancelled() {
                            return Ok(());
                        }
                        self.handle_event(event).await?;
                    }
                }
            }
        }
    }
}

fn drain(first: WatchEvent, rx: &mut mpsc::UnboundedReceiver<WatchEvent>) -> Vec<WatchEvent> {
    let mut batch = vec![first];
    while let Ok(event) = rx.try_recv() {
        batch.push(event);
    }
    batch
}

/// Drop add/modify events superseded by a later event on the same path.
///
/// Order is otherwise preserved; removals and errors are always kept.
#[must_use]
pub fn coalesce(events: Vec<WatchEvent>) -> Vec<WatchEvent> {
    let keep: Vec<bool> = events
        .iter()
        .enumerate()
        .map(|(i, event)| match event {
            WatchEvent::Added(path) | WatchEvent::Modified(path) => !events[i + 1..]
                .iter()
                .any(|later| later.path() == Some(path.as_path())),
            _ => true,
        })
        .collect();

    events
        .into_iter()
        .zip(keep)
        .filter_map(|(event, keep)| keep.then_some(event))
        .collect()
}
