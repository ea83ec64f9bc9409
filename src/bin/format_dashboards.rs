use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use alarm_manager::dashboards;
use alarm_manager::logging;

/// Format dashboard JSON files with ordered keys.
///
/// Strips templating.list[].current and .options for query variables,
/// overrides the time entry to {"from": "now-1h", "to": "now"}, enables
/// sharedCrosshair and increments the version.
///
/// WARNING: this tool modifies all manipulated files in place. If a
/// directory is provided, every file with suffix '.json' is modified.
#[derive(Parser)]
#[command(name = "format-dashboards", version, about, verbatim_doc_comment)]
struct Cli {
    /// Path to a JSON file or a directory containing .json files.
    path: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init();

    let files = match dashboards::expand_path(&cli.path) {
        Ok(files) => files,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    for file in files {
        alarm_manager::log_event!("dashboards", "processing", "{}", file.display());
        if let Err(e) = dashboards::format_file(&file) {
            tracing::error!("{}: {e}", file.display());
            return ExitCode::FAILURE;
        }
        alarm_manager::log_event!("dashboards", "done", "{}", file.display());
    }

    ExitCode::SUCCESS
}
