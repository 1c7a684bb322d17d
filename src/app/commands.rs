//! Subcommand handlers.

use std::fs;
use std::io::{self, IsTerminal};
use std::path::Path;

use anyhow::{Context, Result, bail};
use mangadl_core::{BatchReport, MangaScraper, SubItem, build_default_adapter_registry};
use tracing::{info, warn};

use crate::ProcessExit;
use crate::app::config_runtime::{build_scraper_config, resolve_output_dir};
use crate::app::exit_handler::determine_exit_outcome;
use crate::app::progress_manager::ChapterProgress;
use crate::app::terminal;
use crate::app_config::FileConfig;
use crate::cli::{ChaptersArgs, DownloadArgs, NetworkArgs, SeriesArgs};
use crate::output;

/// `mangadl sites`: needs no network access.
pub(crate) fn run_sites(json: bool) -> Result<ProcessExit> {
    let sites = build_default_adapter_registry().descriptors();
    if json {
        output::print_json(&sites)?;
    } else {
        output::print_sites(&sites);
    }
    Ok(ProcessExit::Success)
}

pub(crate) async fn run_series(args: &SeriesArgs, file: &FileConfig) -> Result<ProcessExit> {
    let scraper = build_scraper(file, &args.network, None)?;
    let mut series = scraper.list_top_level(&args.site_url).await?;
    if let Some(query) = args.filter.as_deref() {
        series = output::filter_series(query, series);
    }

    if args.json {
        output::print_json(&series)?;
    } else {
        output::print_series(&series);
    }
    Ok(ProcessExit::Success)
}

pub(crate) async fn run_chapters(args: &ChaptersArgs, file: &FileConfig) -> Result<ProcessExit> {
    let scraper = build_scraper(file, &args.network, None)?;
    let chapters = scraper.list_sub_items(&args.series_url).await?;

    if args.json {
        output::print_json(&chapters)?;
    } else {
        output::print_chapters(&chapters);
    }
    Ok(ProcessExit::Success)
}

pub(crate) async fn run_download(
    args: &DownloadArgs,
    file: &FileConfig,
    quiet: bool,
) -> Result<ProcessExit> {
    let scraper = build_scraper(file, &args.network, Some(args))?;

    let selected = select(&scraper, args).await?;
    if selected.is_empty() {
        info!("No chapters selected; nothing to download");
        return Ok(ProcessExit::Success);
    }

    let output_dir = resolve_output_dir(args, file);
    if !output_dir.exists() {
        fs::create_dir_all(&output_dir).with_context(|| {
            format!("Failed to create output directory '{}'", output_dir.display())
        })?;
        info!(dir = %output_dir.display(), "Created output directory");
    }

    let show_progress = terminal::should_show_progress(
        io::stderr().is_terminal(),
        quiet,
        terminal::is_dumb_terminal(),
    );
    let progress = ChapterProgress::new(show_progress, selected.len());

    info!(
        chapters = selected.len(),
        dir = %output_dir.display(),
        "Starting download"
    );
    let report = scraper
        .download_selection(&args.series_url, &selected, |event| progress.handle(&event))
        .await?;
    progress.finish();

    write_report(&report, &output_dir, quiet)?;
    Ok(determine_exit_outcome(&report))
}

/// Resolves the chapters a download run should fetch.
async fn select(scraper: &MangaScraper, args: &DownloadArgs) -> Result<Vec<SubItem>> {
    if let Some(path) = args.from_json.as_deref() {
        return output::read_chapters_json(path);
    }

    let chapters = scraper.list_sub_items(&args.series_url).await?;
    if args.all {
        return Ok(chapters);
    }
    let Some(spec) = args.chapters.as_deref() else {
        bail!("No chapter selection given; use --chapters, --from-json or --all");
    };
    if chapters.is_empty() {
        bail!("No chapters found at {}", args.series_url);
    }
    let indices = output::parse_selection(spec, chapters.len())?;
    Ok(output::select_chapters(&chapters, &indices))
}

fn write_report(report: &BatchReport, output_dir: &Path, quiet: bool) -> Result<()> {
    for artifact in &report.artifacts {
        let path = output::write_artifact(output_dir, artifact)?;
        info!(path = %path.display(), pages = artifact.page_count, "Saved document");
        if !quiet {
            println!("{}", path.display());
        }
    }

    for (item, error) in &report.failures {
        warn!(chapter = %item.title, kind = error.kind(), "Chapter failed");
        eprintln!("Failed: {}\n  {error}", item.title);
    }

    if !quiet && !report.failures.is_empty() {
        eprintln!(
            "{} of {} chapter(s) saved",
            report.artifacts.len(),
            report.artifacts.len() + report.failures.len()
        );
    }
    Ok(())
}

fn build_scraper(
    file: &FileConfig,
    network: &NetworkArgs,
    download: Option<&DownloadArgs>,
) -> Result<MangaScraper> {
    let config = build_scraper_config(file, network, download);
    let scraper = MangaScraper::new(config)?;
    Ok(with_selected_provider(scraper, network))
}

#[cfg(feature = "browser")]
fn with_selected_provider(scraper: MangaScraper, network: &NetworkArgs) -> MangaScraper {
    if !network.browser {
        return scraper;
    }
    let provider =
        mangadl_core::render::ChromeRenderProvider::new(scraper.config().user_agent.clone());
    scraper.with_provider(std::sync::Arc::new(provider))
}

#[cfg(not(feature = "browser"))]
fn with_selected_provider(scraper: MangaScraper, _network: &NetworkArgs) -> MangaScraper {
    scraper
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_run_sites_succeeds_offline() {
        assert_eq!(run_sites(false).unwrap(), ProcessExit::Success);
        assert_eq!(run_sites(true).unwrap(), ProcessExit::Success);
    }

    #[test]
    fn test_build_scraper_applies_cli_overrides() {
        let network = NetworkArgs {
            nav_attempts: Some(7),
            ..NetworkArgs::default()
        };
        let scraper = build_scraper(&FileConfig::default(), &network, None).unwrap();
        assert_eq!(scraper.config().navigation_attempts, 7);
    }

    #[tokio::test]
    async fn test_run_chapters_rejects_unsupported_site() {
        let args = ChaptersArgs {
            series_url: "https://unknown.example/manga/x".to_string(),
            json: false,
            network: NetworkArgs::default(),
        };
        let err = run_chapters(&args, &FileConfig::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown.example"));
    }
}
