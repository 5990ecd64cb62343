//! Photo Mover - copy a folder of photos and videos into a dated library
//!
//! A CLI tool that sorts photos into YEAR/MONTH folders by capture date,
//! collects movies and other files in fixed folders, and skips photos the
//! library already holds.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use photo_mover::process::CopyStatus;
use photo_mover::session::{RunEvent, RunState, start_run};
use photo_mover::state::{LOCATIONS_FILENAME, LastLocations};
use photo_mover::tree::{Node, NodeStatus};
use photo_mover::walk::EntryKind;
use photo_mover::{Cli, Config, CopyOutcome};
use std::path::{Path, PathBuf};
use tracing::{Level, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// CLI Output Module
mod cli_output {
    //! Styled terminal output
    //!
    //! Shared colors and layout for everything printed to stdout.

    use crossterm::{
        ExecutableCommand,
        cursor::MoveToColumn,
        style::{Color, Print, Stylize, style},
        terminal::{Clear, ClearType},
    };
    use std::io::stdout;

    /// CLI theme colors
    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    pub fn print_separator() {
        let _ = stdout().execute(Print(&format!("{}\n", "─".repeat(60))));
    }

    /// Print a centered title
    pub fn print_title(title: &str) {
        let width: usize = 60;
        let padding = width.saturating_sub(title.len()) / 2;
        let left_pad = " ".repeat(padding.saturating_sub(1));

        let _ = stdout().execute(Print(&format!(
            "{}{} {}{}\n",
            left_pad,
            "╔".bold().stylize(),
            title.bold().stylize(),
            "╗".bold().stylize(),
        )));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_error(msg: &str) {
        let _ = stdout().execute(Print(style("✗ ").with(CliTheme::ERROR).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_hint(msg: &str) {
        let _ = stdout().execute(Print(style("→ ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_key_value(key: &str, value: &str, value_color: Option<Color>) {
        let key_styled = style(key).with(CliTheme::HINT);
        let value_styled = match value_color {
            Some(color) => style(value).with(color),
            None => style(value).bold(),
        };
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(key_styled));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(value_styled));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_stat(key: &str, value: &str, color: Color) {
        let key_styled = style(key).with(CliTheme::HINT);
        let value_styled = style(value).with(color).bold();
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(key_styled));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(value_styled));
        let _ = stdout().execute(Print("\n"));
    }

    /// Print one processed file
    pub fn print_result(status_icon: &str, status_color: Color, source: &str, dest_or_msg: &str) {
        let icon_styled = style(status_icon).with(status_color).bold();
        let source_styled = style(source).italic();
        let msg_styled = style(dest_or_msg).with(CliTheme::HINT);

        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(icon_styled));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(source_styled));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(msg_styled));
        let _ = stdout().execute(Print("\n"));
    }

    /// Redraw the progress line in place
    pub fn print_progress(processed: usize, total: usize, current: &str) {
        let mut out = stdout();
        let _ = out.execute(MoveToColumn(0));
        let _ = out.execute(Clear(ClearType::CurrentLine));
        let _ = out.execute(Print(style(format!("[{}/{}] ", processed, total)).with(CliTheme::ACCENT)));
        let _ = out.execute(Print(style(current).with(CliTheme::HINT)));
    }

    /// Finish the progress line
    pub fn end_progress() {
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_log_path(path: &str) {
        let _ = stdout().execute(Print("\n"));
        let _ = stdout().execute(Print(style("  📁 ").with(CliTheme::ACCENT)));
        let _ = stdout().execute(Print(style("Log file: ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", path)));
    }

    pub fn print_blank() {
        let _ = stdout().execute(Print("\n"));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.sample_config {
        print!("{}", Config::sample_config());
        return Ok(());
    }

    // Get the executable directory for Config and Log directories
    let exe_dir = get_executable_dir()?;
    let log_path = get_log_path(&exe_dir, &cli);
    let _guard = setup_logging(&cli, &log_path)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Photo Mover starting");

    let mut config = load_config(&cli, &exe_dir)?;

    let locations_path = config
        .locations_file
        .clone()
        .unwrap_or_else(|| exe_dir.join("Config").join(LOCATIONS_FILENAME));
    let mut locations = if config.remember_locations {
        match LastLocations::load(&locations_path) {
            Ok(locations) => locations,
            Err(e) => {
                warn!(error = %e, "Ignoring remembered locations");
                LastLocations::new()
            }
        }
    } else {
        LastLocations::new()
    };
    fill_from_locations(&mut config, &locations);

    if cli.verbose {
        info!(?config, "Configuration loaded");
    }
    validate_config(&config, &cli)?;
    info!(log_file = %log_path.display(), "Log file location");

    run(&cli, config, &mut locations, &locations_path, &log_path)
}

/// Use remembered folders for whatever was not given
fn fill_from_locations(config: &mut Config, locations: &LastLocations) {
    if config.source_dir.is_none()
        && let Some(source) = locations.existing_source()
    {
        info!(?source, "Using remembered source folder");
        config.source_dir = Some(source.to_path_buf());
    }
    if config.dest_dir.is_none()
        && let Some(dest) = locations.existing_dest()
    {
        info!(?dest, "Using remembered destination folder");
        config.dest_dir = Some(dest.to_path_buf());
    }
}

fn run(
    cli: &Cli,
    config: Config,
    locations: &mut LastLocations,
    locations_path: &Path,
    log_path: &Path,
) -> Result<()> {
    use cli_output::*;

    let remember = config.remember_locations;
    let verbose = config.verbose;

    let handle = match start_run(config) {
        Ok(handle) => handle,
        Err(e) => {
            error!(error = %e, "Could not start");
            if e.is_preflight() {
                print_hint("Pass --source and --dest, or see --help");
            }
            return Err(e.into());
        }
    };

    if remember {
        let session = handle.session();
        locations.remember(session.source(), session.destination());
        if let Err(e) = locations.save(locations_path) {
            warn!(error = %e, "Could not remember locations");
        }
    }

    print_separator();
    print_key_value("Source", &handle.session().source().display().to_string(), None);
    print_key_value(
        "Destination",
        &handle.session().destination().display().to_string(),
        None,
    );
    print_separator();

    let mut failed: Vec<CopyOutcome> = Vec::new();
    for event in handle.events() {
        match event {
            RunEvent::Warning(warning) => {
                print_warning(&format!("Skipped {}: {}", warning.path.display(), warning.message));
            }
            RunEvent::Outcome(outcome) => {
                if verbose {
                    end_progress();
                    print_outcome(&outcome);
                }
                if outcome.status == CopyStatus::Error {
                    failed.push(outcome);
                }
            }
            RunEvent::Progress(progress) => {
                print_progress(
                    progress.processed,
                    progress.total,
                    &progress.current.display().to_string(),
                );
                if let Some(limit) = cli.limit
                    && progress.processed >= limit
                {
                    handle.stop();
                }
            }
            RunEvent::Finished(_) => end_progress(),
        }
    }

    let nodes = handle.session().tree().nodes();
    let summary = match handle.wait() {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "Processing failed");
            return Err(e.into());
        }
    };

    print_separator();
    match summary.state {
        RunState::Stopped => print_title("Stopped"),
        _ => print_title("Processing complete"),
    }
    print_separator();

    print_blank();
    print_stat("Copied", &summary.copied.to_string(), CliTheme::SUCCESS);
    print_stat("Renamed", &summary.renamed.to_string(), CliTheme::WARNING);
    print_stat("Duplicates", &summary.duplicates.to_string(), CliTheme::ACCENT);
    print_stat("Failed", &summary.failed.to_string(), CliTheme::ERROR);
    if summary.not_started > 0 {
        print_stat("Not started", &summary.not_started.to_string(), CliTheme::HINT);
    }
    print_blank();

    print_folders(&nodes);

    if !failed.is_empty() {
        print_separator();
        print_error(&format!("Failed files: {}", failed.len()));
        print_blank();
        for outcome in &failed {
            print_key_value(
                &outcome.source.display().to_string(),
                outcome.error.as_deref().unwrap_or("unknown error"),
                Some(CliTheme::ERROR),
            );
        }
    }

    print_separator();
    print_log_path(&log_path.display().to_string());

    info!(log_file = %log_path.display(), "Processing complete. Log saved to");
    Ok(())
}

fn print_outcome(outcome: &CopyOutcome) {
    use cli_output::*;

    let source = outcome.source.display().to_string();
    let dest = outcome
        .destination
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();

    match outcome.status {
        CopyStatus::Copied => print_result("✓", CliTheme::SUCCESS, &source, &format!("→ {}", dest)),
        CopyStatus::Renamed => print_result("↻", CliTheme::WARNING, &source, &format!("→ {}", dest)),
        CopyStatus::Duplicate => {
            print_result("≡", CliTheme::ACCENT, &source, &format!("already in {}", dest))
        }
        CopyStatus::Error => print_result(
            "✗",
            CliTheme::ERROR,
            &source,
            outcome.error.as_deref().unwrap_or("unknown error"),
        ),
    }
}

/// Print the rolled-up status of the top-level source folders
fn print_folders(nodes: &[Node]) {
    use cli_output::*;

    let folders: Vec<&Node> = nodes
        .iter()
        .filter(|n| n.kind == EntryKind::Directory && n.parent.is_some_and(|p| p.index() == 0))
        .collect();
    if folders.is_empty() {
        return;
    }

    print_hint("Folders");
    for folder in folders {
        let (label, color) = match folder.status {
            Some(NodeStatus::Copied) | Some(NodeStatus::Duplicate) => ("all copied", CliTheme::SUCCESS),
            Some(NodeStatus::Renamed) => ("some renamed", CliTheme::WARNING),
            Some(NodeStatus::Pending) => ("has failures", CliTheme::ERROR),
            None => ("not processed", CliTheme::HINT),
        };
        print_key_value(&folder.name, label, Some(color));
    }
    print_blank();
}

/// Get the directory where the executable is located
fn get_executable_dir() -> Result<PathBuf> {
    let exe_path = std::env::current_exe()?;
    Ok(exe_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".")))
}

/// Determine the log file path based on config file or timestamp
fn get_log_path(exe_dir: &Path, cli: &Cli) -> PathBuf {
    let log_dir = exe_dir.join("Log");
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    if let Some(config_name) = cli.config_name() {
        let config_log_dir = log_dir.join(&config_name);
        config_log_dir.join(format!("{}_{}.log", config_name, timestamp))
    } else {
        log_dir.join(format!("Run_{}.log", timestamp))
    }
}

/// Resolve config path - supports shorthand syntax
fn resolve_config_path(exe_dir: &Path, config_path: &Path) -> PathBuf {
    if config_path.exists() {
        return config_path.to_path_buf();
    }

    let with_extension = if config_path.extension().is_none() {
        config_path.with_extension("toml")
    } else {
        config_path.to_path_buf()
    };

    if with_extension.exists() {
        return with_extension;
    }

    let filename = config_path.file_name().unwrap_or(config_path.as_os_str());
    let mut in_config_dir = exe_dir.join("Config").join(filename);
    if in_config_dir.extension().is_none() {
        in_config_dir = in_config_dir.with_extension("toml");
    }

    if in_config_dir.exists() {
        return in_config_dir;
    }

    config_path.to_path_buf()
}

/// Load configuration from file or CLI arguments
fn load_config(cli: &Cli, exe_dir: &Path) -> Result<Config> {
    let config = if let Some(ref config_path) = cli.config {
        let resolved_path = resolve_config_path(exe_dir, config_path);
        info!(config_file = %resolved_path.display(), "Loading configuration from file");
        let file_config = Config::load_from_file(&resolved_path)?;
        cli.merge_with_config(file_config)
    } else {
        cli.to_config()
    };

    Ok(config)
}

/// Validate configuration before starting a session
fn validate_config(config: &Config, cli: &Cli) -> Result<()> {
    if let Err(e) = config.validate() {
        anyhow::bail!("{}", e);
    }
    if cli.limit == Some(0) {
        anyhow::bail!("--limit must be at least 1");
    }
    Ok(())
}

fn setup_logging(cli: &Cli, log_path: &Path) -> Result<WorkerGuard> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::registry().with(env_filter);

    // The console only gets warnings so the progress line stays readable
    if cli.json_log {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_filter(LevelFilter::WARN),
            )
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_filter(LevelFilter::WARN),
            )
            .init();
    }

    Ok(guard)
}
