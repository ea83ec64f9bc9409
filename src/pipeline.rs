//! The regenerate pipeline: read, fingerprint, parse, validate, render.
//!
//! All state that used to be process-global in earlier revisions (the last
//! fingerprint, the compiled templates, the output directories) lives in an
//! explicit [`PipelineContext`] created once at startup and passed to each
//! run. There is no teardown; the process is stateless across restarts.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::alarms::GenerationTarget;
use crate::config::Settings;
use crate::fingerprint::Fingerprint;
use crate::render::{RenderError, Renderer, write_atomic};
use crate::validate::{ValidationError, validate_document};

/// A fatal error for one pipeline run.
///
/// Inside the watch loop these are logged and the event is skipped; the
/// next write to the alarm file is the natural retry trigger.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to read {path}: {source}")]
    ReadInput {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse alarm definitions: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// One (role, group) pair that failed to render or write.
#[derive(Debug)]
pub struct TargetFailure {
    pub cluster_role: String,
    pub group: String,
    pub reason: String,
}

/// Result of a single pipeline run.
#[derive(Debug)]
pub enum RunOutcome {
    /// Input bytes matched the last fingerprint; nothing was written.
    Unchanged,
    /// The document was regenerated. `failed` lists targets that could not
    /// be rendered or written; targets are independent, so earlier pairs
    /// stay on disk when a later one fails.
    Generated {
        written: Vec<PathBuf>,
        failed: Vec<TargetFailure>,
    },
}

impl RunOutcome {
    /// True when the run produced no render or write failures.
    pub fn is_clean(&self) -> bool {
        match self {
            RunOutcome::Unchanged => true,
            RunOutcome::Generated { failed, .. } => failed.is_empty(),
        }
    }
}

/// Everything one run needs: output directories, compiled templates and
/// the fingerprint of the last successfully validated input.
pub struct PipelineContext {
    code_dir: PathBuf,
    config_dir: PathBuf,
    renderer: Renderer,
    last_fingerprint: Option<Fingerprint>,
}

impl PipelineContext {
    /// Build a context from settings, compiling both templates.
    pub fn new(settings: &Settings) -> Result<Self, PipelineError> {
        let renderer = Renderer::from_files(&settings.code_template, &settings.config_template)?;
        Ok(Self::with_renderer(
            settings.code_dir.clone(),
            settings.config_dir.clone(),
            renderer,
        ))
    }

    /// Build a context around an already compiled renderer.
    pub fn with_renderer(code_dir: PathBuf, config_dir: PathBuf, renderer: Renderer) -> Self {
        Self {
            code_dir,
            config_dir,
            renderer,
            last_fingerprint: None,
        }
    }

    /// Run the full pipeline against the alarm file at `input`.
    ///
    /// Validation failures abort before any output file is opened. Render
    /// and write failures are collected per target in the returned
    /// [`RunOutcome`] rather than aborting the run.
    pub fn regenerate(&mut self, input: &Path) -> Result<RunOutcome, PipelineError> {
        let bytes = fs::read(input).map_err(|source| PipelineError::ReadInput {
            path: input.to_path_buf(),
            source,
        })?;

        let fingerprint = Fingerprint::of(&bytes);
        if self.last_fingerprint.as_ref() == Some(&fingerprint) {
            crate::log_event!(
                "pipeline",
                "unchanged",
                "{} ({})",
                input.display(),
                fingerprint.short()
            );
            return Ok(RunOutcome::Unchanged);
        }

        let raw: serde_yaml::Value = serde_yaml::from_slice(&bytes)?;
        let doc = validate_document(&raw)?;

        // Only a validated document advances the fingerprint, so rewriting
        // an invalid file with the same content still reports the error.
        self.last_fingerprint = Some(fingerprint);

        let mut written = Vec::new();
        let mut failed = Vec::new();
        for target in doc.targets() {
            match self.generate_target(&target) {
                Ok(mut paths) => {
                    crate::log_event!(
                        "pipeline",
                        "generated",
                        "{} ({} alarms)",
                        target.output_stem(),
                        target.alarms.len()
                    );
                    written.append(&mut paths);
                }
                Err(e) => {
                    tracing::error!(
                        "[pipeline] target {}/{} failed: {e}",
                        target.cluster_role,
                        target.group
                    );
                    failed.push(TargetFailure {
                        cluster_role: target.cluster_role.to_string(),
                        group: target.group.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(RunOutcome::Generated { written, failed })
    }

    /// Forget the last fingerprint so the next run regenerates even for
    /// byte-identical input.
    pub fn clear_fingerprint(&mut self) {
        self.last_fingerprint = None;
    }

    fn generate_target(&self, target: &GenerationTarget<'_>) -> Result<Vec<PathBuf>, RenderError> {
        // Render both outputs before writing either, so a template failure
        // never leaves only one file of the pair behind.
        let code = self.renderer.render_code(target)?;
        let config = self.renderer.render_config(target)?;
        let code_path = write_atomic(&self.code_dir, &target.code_filename(), &code)?;
        let config_path = write_atomic(&self.config_dir, &target.config_filename(), &config)?;
        Ok(vec![code_path, config_path])
    }
}
