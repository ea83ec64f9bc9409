pub mod alarms;
pub mod config;
pub mod dashboards;
pub mod fingerprint;
pub mod logging;
pub mod pipeline;
pub mod render;
pub mod validate;
pub mod watcher;

pub use alarms::{AlarmDefinition, AlarmDocument, GenerationTarget};
pub use config::Settings;
pub use fingerprint::Fingerprint;
pub use pipeline::{PipelineContext, PipelineError, RunOutcome};
pub use render::Renderer;
pub use validate::ValidationError;
pub use watcher::AlarmWatcher;
