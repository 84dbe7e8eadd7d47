//! Argument parsing, bootstrap and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use seedline_config::validate::validate_logging;
use seedline_config::{ConfigLoader, SeedlineConfig};
use seedline_telemetry::init_logging;

use crate::commands::{handle_init_files, handle_inspect, handle_layout};
use crate::error::{CliError, CliResult};

const BUILD_SHA: &str = match option_env!("SEEDLINE_BUILD_SHA") {
    Some(sha) => sha,
    None => "dev",
};

/// Parse arguments, run the command and return the process exit code.
///
/// Must be called from within a Tokio runtime.
#[must_use]
pub fn run() -> i32 {
    let cli = Cli::parse();
    match execute(cli) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

fn execute(cli: Cli) -> CliResult<()> {
    let config = load_config(&cli)?;
    if let Err(err) = init_logging(&config.logging_config(BUILD_SHA)) {
        eprintln!("warning: {err}");
    }
    dispatch(cli.command, &config)
}

pub(crate) fn dispatch(command: Command, config: &SeedlineConfig) -> CliResult<()> {
    match command {
        Command::Inspect(args) => handle_inspect(&args),
        Command::Layout(args) => handle_layout(&args, config),
        Command::InitFiles(args) => handle_init_files(&args, config),
    }
}

fn load_config(cli: &Cli) -> CliResult<SeedlineConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    let mut config = loader
        .load()
        .map_err(|err| CliError::failure(anyhow::Error::new(err).context("failed to load configuration")))?;
    if let Some(level) = &cli.log_level {
        config.logging.level.clone_from(level);
        validate_logging(&config.logging)
            .map_err(|_| CliError::validation(format!("invalid --log-level '{level}'")))?;
    }
    Ok(config)
}

#[derive(Parser)]
#[command(name = "seedline", about = "Inspect and prepare torrents for a Seedline engine")]
pub(crate) struct Cli {
    /// JSON configuration file; environment variables override it.
    #[arg(long, global = true, env = "SEEDLINE_CONFIG")]
    config: Option<PathBuf>,
    /// Log filter directive, overriding the configured level.
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Decode a `.torrent` file and print its metadata.
    Inspect(InspectArgs),
    /// Print where a session for this torrent keeps its files.
    Layout(TorrentArgs),
    /// Create empty placeholders for every file in the torrent.
    InitFiles(TorrentArgs),
}

#[derive(Args)]
pub(crate) struct InspectArgs {
    /// Path to the `.torrent` file.
    pub(crate) file: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub(crate) format: OutputFormat,
}

#[derive(Args)]
pub(crate) struct TorrentArgs {
    /// Path to the `.torrent` file.
    pub(crate) file: PathBuf,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "seedline",
            "inspect",
            "a.torrent",
            "--format",
            "json",
            "--log-level",
            "debug",
        ])
        .expect("parse");
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        let Command::Inspect(args) = cli.command else {
            panic!("expected inspect");
        };
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.file, PathBuf::from("a.torrent"));
    }

    #[test]
    fn parses_init_files() {
        let cli = Cli::try_parse_from(["seedline", "--config", "s.json", "init-files", "x.torrent"])
            .expect("parse");
        assert_eq!(cli.config, Some(PathBuf::from("s.json")));
        assert!(matches!(cli.command, Command::InitFiles(_)));
    }
}
