//! Process runtime: parse, configure, dispatch.

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use crate::ProcessExit;
use crate::app::{commands, config_runtime, terminal};
use crate::app_config;
use crate::cli::{Cli, Command};

pub(crate) async fn run() -> Result<ProcessExit> {
    // Parse before tracing so --help works without logs
    let cli = Cli::parse();

    let loaded = app_config::load_file_config_from(cli.config.as_deref())?;
    let file = loaded.config;

    let default_level = config_runtime::resolve_default_log_level(&cli, &file);
    let no_color = terminal::should_disable_color(
        cli.no_color,
        terminal::no_color_env_requested(),
        terminal::is_dumb_terminal(),
    );
    terminal::init_tracing(default_level, no_color);

    debug!(?cli, "CLI arguments parsed");
    if loaded.loaded_from_file {
        debug!(path = ?loaded.path, "Loaded config file");
    }

    match &cli.command {
        Command::Sites { json } => commands::run_sites(*json),
        Command::Series(args) => commands::run_series(args, &file).await,
        Command::Chapters(args) => commands::run_chapters(args, &file).await,
        Command::Download(args) => commands::run_download(args, &file, cli.quiet).await,
    }
}
