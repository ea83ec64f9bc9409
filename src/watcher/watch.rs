//! The blocking watch loop.

use crossbeam_channel::{Receiver, RecvTimeoutError, unbounded};
use notify::event::{AccessKind, AccessMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Settings;
use crate::pipeline::{PipelineContext, RunOutcome};

use super::debouncer::Debouncer;
use super::error::WatchError;

/// Tick interval for flushing the debouncer while the channel is idle.
const TICK: Duration = Duration::from_millis(100);

/// Watches one directory for writes to the tracked alarm file and runs
/// the pipeline on each matching event.
///
/// Holds no pipeline state itself; the fingerprint lives in the
/// [`PipelineContext`] the loop borrows.
pub struct AlarmWatcher {
    watch_path: PathBuf,
    tracked_name: OsString,
    debouncer: Debouncer,
    event_rx: Receiver<notify::Result<Event>>,
    watcher: notify::RecommendedWatcher,
}

impl AlarmWatcher {
    /// Create a watcher for the configured directory and filename.
    pub fn new(settings: &Settings) -> Result<Self, WatchError> {
        let (event_tx, event_rx) = unbounded();
        let watcher = notify::recommended_watcher(move |res| {
            // The loop may have exited; a failed send is fine.
            let _ = event_tx.send(res);
        })?;

        Ok(Self {
            watch_path: settings.watch_path.clone(),
            tracked_name: OsString::from(&settings.alarm_file),
            debouncer: Debouncer::new(settings.debounce_ms),
            event_rx,
            watcher,
        })
    }

    /// Block on the event queue until the channel closes.
    ///
    /// Pipeline failures are logged and the loop continues; the next write
    /// to the alarm file is the retry trigger.
    pub fn watch(mut self, pipeline: &mut PipelineContext) -> Result<(), WatchError> {
        self.watcher
            .watch(&self.watch_path, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: self.watch_path.clone(),
                reason: e.to_string(),
            })?;

        crate::log_event!(
            "watcher",
            "monitoring",
            "{} in {}",
            self.tracked_name.to_string_lossy(),
            self.watch_path.display()
        );

        loop {
            match self.event_rx.recv_timeout(TICK) {
                Ok(Ok(event)) => self.handle_event(event, pipeline),
                Ok(Err(e)) => tracing::error!("[watcher] file watch error: {e}"),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Err(WatchError::ChannelClosed),
            }

            for path in self.debouncer.take_ready() {
                run_pipeline(&path, pipeline);
            }
        }
    }

    fn handle_event(&mut self, event: Event, pipeline: &mut PipelineContext) {
        for path in event.paths {
            if path.file_name() != Some(self.tracked_name.as_os_str()) {
                crate::debug_event!("watcher", "ignored", "{:?} {}", event.kind, path.display());
                continue;
            }

            match event.kind {
                // close-after-write is the canonical "file is complete"
                // signal; no debounce needed.
                EventKind::Access(AccessKind::Close(AccessMode::Write)) => {
                    self.debouncer.remove(&path);
                    run_pipeline(&path, pipeline);
                }
                EventKind::Create(_) | EventKind::Modify(_) => {
                    self.debouncer.record(path);
                }
                EventKind::Remove(_) => {
                    self.debouncer.remove(&path);
                    crate::debug_event!("watcher", "removed", "{}", path.display());
                }
                _ => {}
            }
        }
    }
}

/// Run one pipeline pass and log the outcome.
///
/// Returns true when the run completed without render or write failures.
pub fn run_pipeline(path: &Path, pipeline: &mut PipelineContext) -> bool {
    match pipeline.regenerate(path) {
        Ok(RunOutcome::Unchanged) => true,
        Ok(RunOutcome::Generated { written, failed }) => {
            crate::log_event!(
                "watcher",
                "run complete",
                "{} files written, {} targets failed",
                written.len(),
                failed.len()
            );
            failed.is_empty()
        }
        Err(e) => {
            tracing::error!("[watcher] run skipped: {e}");
            false
        }
    }
}
