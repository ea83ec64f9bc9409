//! Template rendering for generation targets.
//!
//! Rendering is deterministic: the same document and templates always
//! produce byte-identical output. Strict mode is enabled so a template
//! referencing a field an alarm does not carry fails loudly instead of
//! emitting empty text into generated code.

use handlebars::Handlebars;
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::alarms::GenerationTarget;

const CODE_TEMPLATE: &str = "code";
const CONFIG_TEMPLATE: &str = "config";

/// A failure while loading a template, rendering it, or writing output.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to load template {template}: {source}")]
    TemplateLoad {
        template: String,
        source: Box<handlebars::TemplateError>,
    },

    #[error("template rendering failed: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("failed to write {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}

/// Compiled code and config templates.
pub struct Renderer {
    registry: Handlebars<'static>,
}

impl Renderer {
    /// Load and compile both templates from disk.
    pub fn from_files(code_template: &Path, config_template: &Path) -> Result<Self, RenderError> {
        let mut registry = Self::registry();
        for (name, path) in [(CODE_TEMPLATE, code_template), (CONFIG_TEMPLATE, config_template)] {
            registry
                .register_template_file(name, path)
                .map_err(|e| RenderError::TemplateLoad {
                    template: path.display().to_string(),
                    source: Box::new(e),
                })?;
        }
        Ok(Self { registry })
    }

    /// Compile both templates from strings.
    pub fn from_strings(code_template: &str, config_template: &str) -> Result<Self, RenderError> {
        let mut registry = Self::registry();
        for (name, text) in [(CODE_TEMPLATE, code_template), (CONFIG_TEMPLATE, config_template)] {
            registry
                .register_template_string(name, text)
                .map_err(|e| RenderError::TemplateLoad {
                    template: format!("<inline {name}>"),
                    source: Box::new(e),
                })?;
        }
        Ok(Self { registry })
    }

    fn registry() -> Handlebars<'static> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        // Output is Lua and plugin config, not HTML.
        registry.register_escape_fn(handlebars::no_escape);
        registry
    }

    /// Render the Lua code output for one target.
    pub fn render_code(&self, target: &GenerationTarget<'_>) -> Result<String, RenderError> {
        Ok(self.registry.render(CODE_TEMPLATE, &Self::context(target))?)
    }

    /// Render the companion config output for one target.
    pub fn render_config(&self, target: &GenerationTarget<'_>) -> Result<String, RenderError> {
        Ok(self.registry.render(CONFIG_TEMPLATE, &Self::context(target))?)
    }

    fn context(target: &GenerationTarget<'_>) -> serde_json::Value {
        let alarms: Vec<_> = target.alarms.iter().map(|a| &a.fields).collect();
        json!({
            "cluster_role": target.cluster_role,
            "group": target.group,
            "alarms": alarms,
        })
    }
}

/// Write `contents` to `dir/filename` through a temp file in the same
/// directory, renamed into place on success so readers never observe a
/// half-written file.
pub fn write_atomic(dir: &Path, filename: &str, contents: &str) -> Result<PathBuf, RenderError> {
    let dest = dir.join(filename);
    let write_err = |reason: String| RenderError::Write {
        path: dest.clone(),
        reason,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| write_err(e.to_string()))?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| write_err(e.to_string()))?;
    tmp.persist(&dest).map_err(|e| write_err(e.to_string()))?;
    Ok(dest)
}
