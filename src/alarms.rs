//! Data model for the alarm definition document.
//!
//! The document has two top-level sections: an ordered list of alarm
//! definitions, and a mapping from cluster role to alarm groups. Group
//! order and the alarm order inside each group are preserved exactly as
//! declared, since they flow straight into generated code.

use indexmap::IndexMap;
use serde_json::Value;

/// A single named monitoring rule.
///
/// Only `name` is interpreted here; thresholds, severities and free-text
/// attributes ride along opaquely in `fields` for the templates to use.
#[derive(Debug, Clone)]
pub struct AlarmDefinition {
    pub name: String,
    /// The full alarm mapping as a JSON object, `name` included.
    pub fields: Value,
}

/// Parsed and validated alarm document.
///
/// Construct via [`crate::validate::validate_document`]; the invariants
/// below hold for every instance:
/// - `alarms` is non-empty and every entry has a name,
/// - every name referenced by `cluster_alarms` resolves to a definition,
/// - every group key is strictly alphanumeric.
#[derive(Debug, Clone)]
pub struct AlarmDocument {
    pub alarms: Vec<AlarmDefinition>,
    /// cluster role -> group key -> ordered alarm names.
    pub cluster_alarms: IndexMap<String, IndexMap<String, Vec<String>>>,
}

impl AlarmDocument {
    /// Look up an alarm definition by name. When a name is defined more
    /// than once the last definition wins.
    pub fn alarm(&self, name: &str) -> Option<&AlarmDefinition> {
        self.alarms.iter().rev().find(|a| a.name == name)
    }

    /// Derive the generation targets, one per (cluster role, group) pair,
    /// in declared order. Recomputed on every run, never stored.
    pub fn targets(&self) -> Vec<GenerationTarget<'_>> {
        let mut targets = Vec::new();
        for (role, groups) in &self.cluster_alarms {
            for (group, names) in groups {
                let alarms = names
                    .iter()
                    .filter_map(|name| self.alarm(name))
                    .collect::<Vec<_>>();
                targets.push(GenerationTarget {
                    cluster_role: role,
                    group,
                    alarms,
                });
            }
        }
        targets
    }
}

/// One (cluster role, group) pair and its resolved alarms, determining one
/// generated code file and one generated config file.
#[derive(Debug, Clone)]
pub struct GenerationTarget<'a> {
    pub cluster_role: &'a str,
    pub group: &'a str,
    /// Alarm definitions in the group's declared order.
    pub alarms: Vec<&'a AlarmDefinition>,
}

impl GenerationTarget<'_> {
    /// Deterministic stem shared by both output files of this target.
    pub fn output_stem(&self) -> String {
        format!("afd_node_{}_{}_alarms", self.cluster_role, self.group)
    }

    /// Filename of the generated Lua code file.
    pub fn code_filename(&self) -> String {
        format!("{}.lua", self.output_stem())
    }

    /// Filename of the generated config file.
    pub fn config_filename(&self) -> String {
        format!("{}.cfg", self.output_stem())
    }
}
