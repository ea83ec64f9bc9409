//! End-to-end pipeline tests: YAML in, generated Lua and config files out.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use alarm_manager::render::Renderer;
use alarm_manager::{PipelineContext, RunOutcome};

const CODE_TEMPLATE: &str =
    "-- {{cluster_role}}/{{group}}\n{{#each alarms}}{{this.name}} = {{this.threshold}}\n{{/each}}";
const CONFIG_TEMPLATE: &str = "Import \"afd_node_{{cluster_role}}_{{group}}_alarms\"\n";

const BASIC_INPUT: &str = r#"
alarms:
  - name: cpu_high
    severity: warning
    threshold: 90
node_cluster_alarms:
  controller:
    default: [cpu_high]
"#;

struct Workspace {
    _dir: TempDir,
    input: PathBuf,
    code_dir: PathBuf,
    config_dir: PathBuf,
}

impl Workspace {
    fn new(yaml: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("alarming.yaml");
        let code_dir = dir.path().join("lua");
        let config_dir = dir.path().join("cfg");
        fs::write(&input, yaml).unwrap();
        fs::create_dir(&code_dir).unwrap();
        fs::create_dir(&config_dir).unwrap();
        Self {
            _dir: dir,
            input,
            code_dir,
            config_dir,
        }
    }

    fn pipeline(&self) -> PipelineContext {
        self.pipeline_with(CODE_TEMPLATE, CONFIG_TEMPLATE)
    }

    fn pipeline_with(&self, code: &str, config: &str) -> PipelineContext {
        let renderer = Renderer::from_strings(code, config).unwrap();
        PipelineContext::with_renderer(self.code_dir.clone(), self.config_dir.clone(), renderer)
    }

    fn output_files(&self) -> (Vec<String>, Vec<String>) {
        let list = |dir: &PathBuf| {
            let mut names: Vec<String> = fs::read_dir(dir)
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                .collect();
            names.sort();
            names
        };
        (list(&self.code_dir), list(&self.config_dir))
    }
}

#[test]
fn end_to_end_generates_one_pair_per_target() {
    let ws = Workspace::new(BASIC_INPUT);
    let mut pipeline = ws.pipeline();

    let outcome = pipeline.regenerate(&ws.input).unwrap();
    assert!(outcome.is_clean());

    let (code, config) = ws.output_files();
    assert_eq!(code, vec!["afd_node_controller_default_alarms.lua"]);
    assert_eq!(config, vec!["afd_node_controller_default_alarms.cfg"]);

    let lua = fs::read_to_string(ws.code_dir.join("afd_node_controller_default_alarms.lua")).unwrap();
    assert_eq!(lua, "-- controller/default\ncpu_high = 90\n");
}

#[test]
fn unchanged_input_short_circuits_without_writing() {
    let ws = Workspace::new(BASIC_INPUT);
    let mut pipeline = ws.pipeline();

    pipeline.regenerate(&ws.input).unwrap();

    // Remove the outputs; an unchanged second run must not recreate them.
    for (dir, name) in [
        (&ws.code_dir, "afd_node_controller_default_alarms.lua"),
        (&ws.config_dir, "afd_node_controller_default_alarms.cfg"),
    ] {
        fs::remove_file(dir.join(name)).unwrap();
    }

    let outcome = pipeline.regenerate(&ws.input).unwrap();
    assert!(matches!(outcome, RunOutcome::Unchanged));
    let (code, config) = ws.output_files();
    assert!(code.is_empty());
    assert!(config.is_empty());
}

#[test]
fn rewritten_content_triggers_regeneration() {
    let ws = Workspace::new(BASIC_INPUT);
    let mut pipeline = ws.pipeline();
    pipeline.regenerate(&ws.input).unwrap();

    fs::write(&ws.input, BASIC_INPUT.replace("90", "95")).unwrap();
    let outcome = pipeline.regenerate(&ws.input).unwrap();
    assert!(matches!(outcome, RunOutcome::Generated { .. }));

    let lua = fs::read_to_string(ws.code_dir.join("afd_node_controller_default_alarms.lua")).unwrap();
    assert!(lua.contains("cpu_high = 95"));
}

#[test]
fn regeneration_is_idempotent_byte_for_byte() {
    let ws = Workspace::new(BASIC_INPUT);
    let mut pipeline = ws.pipeline();

    pipeline.regenerate(&ws.input).unwrap();
    let lua_path = ws.code_dir.join("afd_node_controller_default_alarms.lua");
    let cfg_path = ws.config_dir.join("afd_node_controller_default_alarms.cfg");
    let first = (fs::read(&lua_path).unwrap(), fs::read(&cfg_path).unwrap());

    // Bypass the fingerprint short-circuit and run again on the same input.
    pipeline.clear_fingerprint();
    pipeline.regenerate(&ws.input).unwrap();
    let second = (fs::read(&lua_path).unwrap(), fs::read(&cfg_path).unwrap());

    assert_eq!(first, second);
}

#[test]
fn missing_alarms_key_fails_before_any_write() {
    let ws = Workspace::new("node_cluster_alarms:\n  controller:\n    default: []\n");
    let mut pipeline = ws.pipeline();

    let err = pipeline.regenerate(&ws.input).unwrap_err();
    assert!(err.to_string().contains("alarms"));

    let (code, config) = ws.output_files();
    assert!(code.is_empty());
    assert!(config.is_empty());
}

#[test]
fn unresolved_alarm_reference_fails_before_any_write() {
    let yaml = r#"
alarms:
  - name: cpu_high
node_cluster_alarms:
  controller:
    default: [disk_full]
"#;
    let ws = Workspace::new(yaml);
    let mut pipeline = ws.pipeline();

    let err = pipeline.regenerate(&ws.input).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("disk_full"));
    assert!(msg.contains("default"));

    let (code, config) = ws.output_files();
    assert!(code.is_empty());
    assert!(config.is_empty());
}

#[test]
fn non_alphanumeric_group_key_fails_before_any_write() {
    let yaml = r#"
alarms:
  - name: cpu_high
node_cluster_alarms:
  controller:
    "../evil": [cpu_high]
"#;
    let ws = Workspace::new(yaml);
    let mut pipeline = ws.pipeline();

    assert!(pipeline.regenerate(&ws.input).is_err());
    let (code, config) = ws.output_files();
    assert!(code.is_empty());
    assert!(config.is_empty());
}

#[test]
fn invalid_document_is_reported_again_after_identical_rewrite() {
    let ws = Workspace::new("alarms: []\nnode_cluster_alarms: {}\n");
    let mut pipeline = ws.pipeline();

    assert!(pipeline.regenerate(&ws.input).is_err());
    // Same bytes again: the fingerprint must not have advanced.
    assert!(pipeline.regenerate(&ws.input).is_err());
}

#[test]
fn render_failure_skips_one_target_and_keeps_the_others() {
    let yaml = r#"
alarms:
  - name: cpu_high
    threshold: 90
  - name: log_noise
    severity: warning
node_cluster_alarms:
  controller:
    default: [cpu_high]
    logs: [log_noise]
"#;
    let ws = Workspace::new(yaml);
    // Template requires `threshold`, which log_noise does not carry.
    let mut pipeline = ws.pipeline();

    let outcome = pipeline.regenerate(&ws.input).unwrap();
    match outcome {
        RunOutcome::Generated { written, failed } => {
            assert_eq!(written.len(), 2);
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].group, "logs");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let (code, _) = ws.output_files();
    assert_eq!(code, vec!["afd_node_controller_default_alarms.lua"]);
}

#[test]
fn multiple_roles_and_groups_each_get_a_pair() {
    let yaml = r#"
alarms:
  - name: cpu_high
    threshold: 90
  - name: disk_full
    threshold: 95
node_cluster_alarms:
  controller:
    default: [cpu_high]
  compute:
    default: [cpu_high]
    storage: [disk_full]
"#;
    let ws = Workspace::new(yaml);
    let mut pipeline = ws.pipeline();

    let outcome = pipeline.regenerate(&ws.input).unwrap();
    assert!(outcome.is_clean());

    let (code, config) = ws.output_files();
    assert_eq!(
        code,
        vec![
            "afd_node_compute_default_alarms.lua",
            "afd_node_compute_storage_alarms.lua",
            "afd_node_controller_default_alarms.lua",
        ]
    );
    assert_eq!(config.len(), 3);
}
