//! Grafana dashboard JSON normalization.
//!
//! Rewrites exported dashboards into a reviewable canonical form: keys
//! sorted, per-user templating state stripped, time range pinned and the
//! version counter bumped. Files are modified in place.

use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Datasource name stamped onto every annotation.
pub const ANNOTATION_DATASOURCE: &str = "CCP InfluxDB";

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("'{path}' no such file or directory")]
    NoSuchPath { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("malformed JSON: no \"dashboard\" key")]
    NotADashboard,

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Expand a CLI path argument into the list of files to process: a file
/// is taken as-is, a directory expands to every `*.json` inside it.
pub fn expand_path(path: &Path) -> Result<Vec<PathBuf>, DashboardError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if path.is_dir() {
        let pattern = format!("{}/*.json", path.display());
        // The pattern is built from a literal "*.json"; it cannot fail to compile.
        let mut files: Vec<PathBuf> = glob::glob(&pattern)
            .map_err(|_| DashboardError::NoSuchPath {
                path: path.to_path_buf(),
            })?
            .filter_map(Result::ok)
            .collect();
        files.sort();
        return Ok(files);
    }
    Err(DashboardError::NoSuchPath {
        path: path.to_path_buf(),
    })
}

/// Normalize one parsed dashboard document in place.
///
/// Fails when the document has no top-level `dashboard` key.
pub fn normalize(root: &mut Value) -> Result<(), DashboardError> {
    let dashboard = root
        .get_mut("dashboard")
        .and_then(Value::as_object_mut)
        .ok_or(DashboardError::NotADashboard)?;

    if let Some(annotations) = dashboard
        .get_mut("annotations")
        .and_then(|a| a.get_mut("list"))
        .and_then(Value::as_array_mut)
    {
        for annotation in annotations.iter_mut().filter_map(Value::as_object_mut) {
            annotation.insert(
                "datasource".to_string(),
                Value::String(ANNOTATION_DATASOURCE.to_string()),
            );
        }
    }

    if let Some(variables) = dashboard
        .get_mut("templating")
        .and_then(|t| t.get_mut("list"))
        .and_then(Value::as_array_mut)
    {
        for variable in variables.iter_mut().filter_map(Value::as_object_mut) {
            // Only query variables carry dynamic state worth stripping.
            if variable.get("type").and_then(Value::as_str) == Some("query") {
                variable.insert("options".to_string(), Value::Array(Vec::new()));
                variable.insert("current".to_string(), Value::Object(Map::new()));
                variable.insert("refresh".to_string(), json!(1));
            }
        }
    }

    dashboard.insert("time".to_string(), json!({"from": "now-1h", "to": "now"}));
    dashboard.insert("sharedCrosshair".to_string(), Value::Bool(true));
    dashboard.insert("refresh".to_string(), Value::String("1m".to_string()));
    dashboard.insert("id".to_string(), Value::Null);

    let version = dashboard
        .get("version")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    dashboard.insert("version".to_string(), json!(version + 1));

    Ok(())
}

/// Read, normalize and rewrite one dashboard file in place.
///
/// Output is pretty-printed with two-space indent; keys come out in
/// lexicographic order from serde_json's default map representation.
pub fn format_file(path: &Path) -> Result<(), DashboardError> {
    let raw = std::fs::read(path).map_err(|source| DashboardError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut root: Value =
        serde_json::from_slice(&raw).map_err(|source| DashboardError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    normalize(&mut root)?;

    let mut pretty = serde_json::to_string_pretty(&root).map_err(|source| {
        DashboardError::Parse {
            path: path.to_path_buf(),
            source,
        }
    })?;
    pretty.push('\n');
    std::fs::write(path, pretty).map_err(|source| DashboardError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}
