//! Merging CLI flags, the config file and library defaults.
//!
//! Precedence per setting: explicit CLI flag, then config file, then the
//! library default from [`ScraperConfig::default`].

use std::path::PathBuf;
use std::time::Duration;

use mangadl_core::ScraperConfig;

use crate::app_config::FileConfig;
use crate::cli::{Cli, DownloadArgs, NetworkArgs};

/// Default log level when `RUST_LOG` is unset.
///
/// Priority: quiet flag > verbose flag > config verbosity > info.
pub(crate) fn resolve_default_log_level(cli: &Cli, file: &FileConfig) -> &'static str {
    if cli.quiet {
        return "error";
    }
    match cli.verbose {
        0 => file.verbosity.map_or("info", |v| v.log_level()),
        1 => "debug",
        _ => "trace",
    }
}

/// Builds the library configuration for a network subcommand.
pub(crate) fn build_scraper_config(
    file: &FileConfig,
    network: &NetworkArgs,
    download: Option<&DownloadArgs>,
) -> ScraperConfig {
    let mut config = ScraperConfig::default();

    if let Some(attempts) = network.nav_attempts.or(file.nav_attempts) {
        config.navigation_attempts = attempts;
    }
    if let Some(secs) = network.nav_timeout.or(file.nav_timeout_secs) {
        config.navigation_timeout = Duration::from_secs(secs);
    }
    if let Some(user_agent) = network.user_agent.clone().or_else(|| file.user_agent.clone()) {
        config.user_agent = user_agent;
    }
    if let Some(ms) = file.selector_wait_ms {
        config.selector_wait = Duration::from_millis(ms);
    }
    if let Some(secs) = file.asset_timeout_secs {
        config.asset_timeout = Duration::from_secs(secs);
    }
    if let Some(attempts) = file.asset_attempts {
        config.asset_attempts = attempts;
    }
    if let Some(ms) = file.chapter_cooldown_ms {
        config.item_cooldown = Duration::from_millis(ms);
    }

    let concurrency = download.and_then(|d| d.concurrency).or(file.concurrency);
    if let Some(concurrency) = concurrency {
        config.asset_concurrency = usize::from(concurrency);
    }
    let chapter_attempts = download
        .and_then(|d| d.chapter_attempts)
        .or(file.chapter_attempts);
    if let Some(attempts) = chapter_attempts {
        config.item_attempts = attempts;
    }
    if let Some(quality) = download.and_then(|d| d.quality).or(file.jpeg_quality) {
        config.jpeg_quality = quality;
    }

    config
}

/// Output directory: flag, then config file, then the current directory.
pub(crate) fn resolve_output_dir(args: &DownloadArgs, file: &FileConfig) -> PathBuf {
    args.output_dir
        .clone()
        .or_else(|| file.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."))
}
