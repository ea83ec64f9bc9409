//! Structural validation of the alarm definition document.
//!
//! Runs before any template is rendered or any output file is opened.
//! Checks short-circuit on the first failure and every error names the
//! offending key, alarm or group so the message is actionable on its own.

use indexmap::IndexMap;
use serde_yaml::Value;
use std::collections::HashSet;
use thiserror::Error;

use crate::alarms::{AlarmDefinition, AlarmDocument};

/// Accepted names for the group mapping key. `alarms_groups` is the
/// historical spelling still found in older alarm files.
pub const GROUP_MAPPING_KEYS: [&str; 2] = ["node_cluster_alarms", "alarms_groups"];

/// A structural or referential violation in the input document.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("document has no 'alarms' key")]
    MissingAlarms,

    #[error("'alarms' must be a sequence of mappings")]
    AlarmsNotASequence,

    #[error("'alarms' is empty")]
    AlarmsEmpty,

    #[error("alarm at position {index} is not a mapping")]
    AlarmNotAMapping { index: usize },

    #[error("alarm at position {index} has no string 'name' field")]
    AlarmNameMissing { index: usize },

    #[error("alarm '{name}' cannot be passed to the template: {reason}")]
    AlarmNotRenderable { name: String, reason: String },

    #[error("document has no 'node_cluster_alarms' key")]
    MissingGroupMapping,

    #[error("'node_cluster_alarms' must map cluster roles to group mappings")]
    GroupMappingNotAMapping,

    #[error("cluster role key is not a string")]
    RoleKeyNotAString,

    #[error("cluster role '{role}' must map group keys to alarm name sequences")]
    RoleNotAMapping { role: String },

    #[error("group key under role '{role}' is not a string")]
    GroupKeyNotAString { role: String },

    #[error("group key '{group}' under role '{role}' must contain only letters and digits")]
    InvalidGroupKey { role: String, group: String },

    #[error("group '{group}' under role '{role}' must be a sequence of alarm name strings")]
    GroupNotASequence { role: String, group: String },

    #[error("alarm '{alarm}' referenced by group '{group}' under role '{role}' is not defined")]
    UnresolvedAlarm {
        alarm: String,
        role: String,
        group: String,
    },
}

/// Validate a parsed document and build the typed [`AlarmDocument`].
///
/// Check order follows the generation pipeline: alarm list shape, alarm
/// names, group mapping shape, group key character set, then reference
/// resolution. The first violation aborts the whole run so no partial
/// output is ever produced from an invalid document.
pub fn validate_document(doc: &Value) -> Result<AlarmDocument, ValidationError> {
    let alarms_value = doc.get("alarms").ok_or(ValidationError::MissingAlarms)?;
    let seq = alarms_value
        .as_sequence()
        .ok_or(ValidationError::AlarmsNotASequence)?;
    if seq.is_empty() {
        return Err(ValidationError::AlarmsEmpty);
    }

    let mut alarms = Vec::with_capacity(seq.len());
    for (index, entry) in seq.iter().enumerate() {
        if !entry.is_mapping() {
            return Err(ValidationError::AlarmNotAMapping { index });
        }
        let name = entry
            .get("name")
            .and_then(Value::as_str)
            .ok_or(ValidationError::AlarmNameMissing { index })?
            .to_string();
        let fields = serde_json::to_value(entry).map_err(|e| {
            ValidationError::AlarmNotRenderable {
                name: name.clone(),
                reason: e.to_string(),
            }
        })?;
        alarms.push(AlarmDefinition { name, fields });
    }

    let defined: HashSet<&str> = alarms.iter().map(|a| a.name.as_str()).collect();

    let groups_value = GROUP_MAPPING_KEYS
        .iter()
        .find_map(|key| doc.get(key))
        .ok_or(ValidationError::MissingGroupMapping)?;
    let roles = groups_value
        .as_mapping()
        .ok_or(ValidationError::GroupMappingNotAMapping)?;

    let mut cluster_alarms = IndexMap::new();
    for (role_key, role_value) in roles {
        let role = role_key
            .as_str()
            .ok_or(ValidationError::RoleKeyNotAString)?;
        let groups = role_value
            .as_mapping()
            .ok_or_else(|| ValidationError::RoleNotAMapping { role: role.to_string() })?;

        let mut validated_groups = IndexMap::new();
        for (group_key, names_value) in groups {
            let group = group_key
                .as_str()
                .ok_or_else(|| ValidationError::GroupKeyNotAString { role: role.to_string() })?;
            // Group keys become output filename parts.
            if group.is_empty() || !group.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(ValidationError::InvalidGroupKey {
                    role: role.to_string(),
                    group: group.to_string(),
                });
            }

            let names_seq = names_value.as_sequence().ok_or_else(|| {
                ValidationError::GroupNotASequence {
                    role: role.to_string(),
                    group: group.to_string(),
                }
            })?;
            let mut names = Vec::with_capacity(names_seq.len());
            for name_value in names_seq {
                let name = name_value.as_str().ok_or_else(|| {
                    ValidationError::GroupNotASequence {
                        role: role.to_string(),
                        group: group.to_string(),
                    }
                })?;
                if !defined.contains(name) {
                    return Err(ValidationError::UnresolvedAlarm {
                        alarm: name.to_string(),
                        role: role.to_string(),
                        group: group.to_string(),
                    });
                }
                names.push(name.to_string());
            }
            validated_groups.insert(group.to_string(), names);
        }
        cluster_alarms.insert(role.to_string(), validated_groups);
    }

    Ok(AlarmDocument {
        alarms,
        cluster_alarms,
    })
}
