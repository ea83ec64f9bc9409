//! Layered configuration for the alarm manager.
//!
//! Sources, later wins:
//! - built-in defaults
//! - TOML configuration file
//! - `ALARM_`-prefixed environment variables (double underscore nests:
//!   `ALARM_LOGGING__DEFAULT=debug` sets `logging.default`)
//! - CLI flag overrides, applied by the binary after loading

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default configuration file location inside the container image.
pub const DEFAULT_CONFIG_FILE: &str = "/etc/stacklight/alarming/config/alarm-manager.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Directory watched for alarm definition writes (non-recursive).
    #[serde(default = "default_watch_path")]
    pub watch_path: PathBuf,

    /// Tracked filename inside the watch directory.
    #[serde(default = "default_alarm_file")]
    pub alarm_file: String,

    /// Destination directory for generated Lua code files.
    #[serde(default = "default_code_dir")]
    pub code_dir: PathBuf,

    /// Destination directory for generated config files.
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Handlebars template for the Lua code output.
    #[serde(default = "default_code_template")]
    pub code_template: PathBuf,

    /// Handlebars template for the config output.
    #[serde(default = "default_config_template")]
    pub config_template: PathBuf,

    /// How long a modified file must stay quiet before the pipeline runs,
    /// for platforms that do not report close-after-write.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level filter, e.g. "info" or "warn".
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `watcher = "debug"`.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_watch_path() -> PathBuf {
    PathBuf::from("/etc/stacklight/alarming")
}
fn default_alarm_file() -> String {
    "alarming.yaml".to_string()
}
fn default_code_dir() -> PathBuf {
    PathBuf::from("/etc/stacklight/alarming/lua")
}
fn default_config_dir() -> PathBuf {
    PathBuf::from("/etc/stacklight/alarming/cfg")
}
fn default_code_template() -> PathBuf {
    PathBuf::from("/etc/stacklight/alarming/templates/alarm_code.hbs")
}
fn default_config_template() -> PathBuf {
    PathBuf::from("/etc/stacklight/alarming/templates/alarm_config.hbs")
}
fn default_debounce_ms() -> u64 {
    200
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            watch_path: default_watch_path(),
            alarm_file: default_alarm_file(),
            code_dir: default_code_dir(),
            config_dir: default_config_dir(),
            code_template: default_code_template(),
            config_template: default_config_template(),
            debounce_ms: default_debounce_ms(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

/// A startup path check failure. Always fatal: the process exits non-zero
/// before watching begins.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("watch path {path} is not a readable directory")]
    WatchPathNotADirectory { path: PathBuf },

    #[error("template {path} is not a readable file")]
    TemplateNotReadable { path: PathBuf },

    #[error("output directory {path} is not writable: {reason}")]
    OutputDirNotWritable { path: PathBuf, reason: String },
}

impl Settings {
    /// Load configuration from defaults, the TOML file and the environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self, Box<figment::Error>> {
        let config_file = config_file.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed("ALARM_").map(|key| {
                // Double underscore separates nested levels.
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Full path of the tracked alarm file.
    pub fn alarm_path(&self) -> PathBuf {
        self.watch_path.join(&self.alarm_file)
    }

    /// Check every configured path before the watch loop starts.
    pub fn validate_paths(&self) -> Result<(), ConfigError> {
        if !self.watch_path.is_dir() || std::fs::read_dir(&self.watch_path).is_err() {
            return Err(ConfigError::WatchPathNotADirectory {
                path: self.watch_path.clone(),
            });
        }
        for template in [&self.code_template, &self.config_template] {
            if !template.is_file() || std::fs::File::open(template).is_err() {
                return Err(ConfigError::TemplateNotReadable {
                    path: template.clone(),
                });
            }
        }
        for dir in [&self.code_dir, &self.config_dir] {
            // Probe writability the same way the renderer writes.
            tempfile::NamedTempFile::new_in(dir).map_err(|e| {
                ConfigError::OutputDirNotWritable {
                    path: dir.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        Ok(())
    }
}
