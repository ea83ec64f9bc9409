use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use alarm_manager::config::{DEFAULT_CONFIG_FILE, Settings};
use alarm_manager::watcher::{AlarmWatcher, run_pipeline};
use alarm_manager::{PipelineContext, log_event, logging};

/// Watches a directory for alarm definition writes and regenerates the
/// Lua alarm code and companion config files from templates.
#[derive(Parser)]
#[command(name = "alarm-manager", version, about)]
struct Cli {
    /// Configuration file (TOML).
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Directory to watch for changes.
    #[arg(short = 'w', long)]
    watch_path: Option<PathBuf>,

    /// Tracked filename inside the watch directory.
    #[arg(long)]
    alarm_file: Option<String>,

    /// Output directory for generated Lua code files.
    #[arg(long)]
    code_dir: Option<PathBuf>,

    /// Output directory for generated config files.
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Template for the Lua code output.
    #[arg(long)]
    code_template: Option<PathBuf>,

    /// Template for the config output.
    #[arg(long)]
    config_template: Option<PathBuf>,

    /// Run the pipeline once and exit without watching.
    #[arg(long)]
    once: bool,
}

impl Cli {
    fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(path) = &self.watch_path {
            settings.watch_path = path.clone();
        }
        if let Some(name) = &self.alarm_file {
            settings.alarm_file = name.clone();
        }
        if let Some(dir) = &self.code_dir {
            settings.code_dir = dir.clone();
        }
        if let Some(dir) = &self.config_dir {
            settings.config_dir = dir.clone();
        }
        if let Some(path) = &self.code_template {
            settings.code_template = path.clone();
        }
        if let Some(path) = &self.config_template {
            settings.config_template = path.clone();
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            // Startup errors may predate logging init, so report on stderr.
            eprintln!("alarm-manager: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns Ok(false) when a one-shot run finished with failures.
fn run(cli: &Cli) -> anyhow::Result<bool> {
    let mut settings =
        Settings::load(Some(&cli.config)).context("failed to load configuration")?;
    cli.apply_overrides(&mut settings);

    logging::init_with_config(&settings.logging);
    settings.validate_paths()?;

    let mut pipeline = PipelineContext::new(&settings)?;

    let alarm_path = settings.alarm_path();
    log_event!(
        "main",
        "starting",
        "watch {} -> code {} / config {}",
        alarm_path.display(),
        settings.code_dir.display(),
        settings.config_dir.display()
    );

    // Convert whatever is already on disk before watching.
    let mut initial_clean = true;
    if alarm_path.is_file() {
        initial_clean = run_pipeline(&alarm_path, &mut pipeline);
    } else if cli.once {
        anyhow::bail!("alarm file {} does not exist", alarm_path.display());
    } else {
        log_event!(
            "main",
            "waiting",
            "{} does not exist yet",
            alarm_path.display()
        );
    }

    if cli.once {
        return Ok(initial_clean);
    }

    let watcher = AlarmWatcher::new(&settings)?;
    watcher.watch(&mut pipeline)?;
    Ok(true)
}
