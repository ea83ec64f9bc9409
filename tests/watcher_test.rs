//! Live watch-loop test: a write to the tracked file regenerates output.

use std::fs;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

use alarm_manager::render::Renderer;
use alarm_manager::{AlarmWatcher, PipelineContext, Settings};

const INPUT: &str = r#"
alarms:
  - name: cpu_high
node_cluster_alarms:
  controller:
    default: [cpu_high]
"#;

#[test]
fn write_to_tracked_file_triggers_regeneration() {
    let dir = TempDir::new().unwrap();
    let code_dir = dir.path().join("lua");
    let config_dir = dir.path().join("cfg");
    fs::create_dir(&code_dir).unwrap();
    fs::create_dir(&config_dir).unwrap();

    let settings = Settings {
        watch_path: dir.path().to_path_buf(),
        alarm_file: "alarming.yaml".to_string(),
        code_dir: code_dir.clone(),
        config_dir: config_dir.clone(),
        debounce_ms: 50,
        ..Settings::default()
    };

    let renderer =
        Renderer::from_strings("{{#each alarms}}{{this.name}}{{/each}}", "{{group}}").unwrap();
    let mut pipeline =
        PipelineContext::with_renderer(code_dir.clone(), config_dir, renderer);

    let watcher = AlarmWatcher::new(&settings).unwrap();
    thread::spawn(move || {
        let _ = watcher.watch(&mut pipeline);
    });

    // Give the watcher time to register before writing.
    thread::sleep(Duration::from_millis(300));
    fs::write(dir.path().join("alarming.yaml"), INPUT).unwrap();

    let expected = code_dir.join("afd_node_controller_default_alarms.lua");
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if expected.is_file() {
            assert_eq!(fs::read_to_string(&expected).unwrap(), "cpu_high");
            return;
        }
        thread::sleep(Duration::from_millis(50));
    }
    panic!("watcher did not regenerate {}", expected.display());
}

#[test]
fn writes_to_other_files_are_ignored() {
    let dir = TempDir::new().unwrap();
    let code_dir = dir.path().join("lua");
    let config_dir = dir.path().join("cfg");
    fs::create_dir(&code_dir).unwrap();
    fs::create_dir(&config_dir).unwrap();

    let settings = Settings {
        watch_path: dir.path().to_path_buf(),
        alarm_file: "alarming.yaml".to_string(),
        code_dir: code_dir.clone(),
        config_dir: config_dir.clone(),
        debounce_ms: 50,
        ..Settings::default()
    };

    let renderer = Renderer::from_strings("x", "y").unwrap();
    let mut pipeline =
        PipelineContext::with_renderer(code_dir.clone(), config_dir, renderer);

    let watcher = AlarmWatcher::new(&settings).unwrap();
    thread::spawn(move || {
        let _ = watcher.watch(&mut pipeline);
    });

    thread::sleep(Duration::from_millis(300));
    fs::write(dir.path().join("unrelated.yaml"), INPUT).unwrap();
    thread::sleep(Duration::from_millis(500));

    assert!(fs::read_dir(&code_dir).unwrap().next().is_none());
}
