//! Filesystem watch trigger for the regenerate pipeline.
//!
//! One `notify` watcher on the configured directory (non-recursive),
//! filtered to the tracked alarm filename. Close-after-write runs the
//! pipeline immediately; plain modify events are debounced for editors
//! and platforms that never emit close-write. The loop is single-threaded
//! and blocks on a channel; pipeline errors are logged and the loop keeps
//! watching.

mod debouncer;
mod error;
mod watch;

pub use debouncer::Debouncer;
pub use error::WatchError;
pub use watch::{AlarmWatcher, run_pipeline};
