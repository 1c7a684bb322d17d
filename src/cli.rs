//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

/// Download manga chapters as PDF documents.
///
/// Mangadl lists the series and chapters of supported reader sites and
/// assembles the selected chapters into one PDF each.
#[derive(Parser, Debug)]
#[command(name = "mangadl")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored log output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Config file path (default: $XDG_CONFIG_HOME/mangadl/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List supported sites and what each one can do
    Sites {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the series shown on a site page
    Series(SeriesArgs),

    /// List the chapters of a series, oldest first
    Chapters(ChaptersArgs),

    /// Download chapters of a series as PDF documents
    Download(DownloadArgs),
}

/// Arguments for `mangadl series`.
#[derive(Args, Debug)]
pub struct SeriesArgs {
    /// Site URL (home page or listing page)
    pub site_url: String,

    /// Only show series whose title resembles this text
    #[arg(long, value_name = "TEXT")]
    pub filter: Option<String>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub network: NetworkArgs,
}

/// Arguments for `mangadl chapters`.
#[derive(Args, Debug)]
pub struct ChaptersArgs {
    /// Series page URL
    pub series_url: String,

    /// Print as JSON (usable with `download --from-json`)
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub network: NetworkArgs,
}

/// Arguments for `mangadl download`.
#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("selection")
        .required(true)
        .args(["chapters", "from_json", "all"])
))]
pub struct DownloadArgs {
    /// Series page URL
    pub series_url: String,

    /// Chapters to download by list position, e.g. "1-3,7" (1-based)
    #[arg(long, value_name = "SPEC")]
    pub chapters: Option<String>,

    /// Download the chapters listed in a JSON file from `chapters --json`
    #[arg(long, value_name = "FILE")]
    pub from_json: Option<PathBuf>,

    /// Download every chapter
    #[arg(long)]
    pub all: bool,

    /// Output directory for PDF files (default: current directory)
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Maximum concurrent image downloads per chapter (1-32)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=32))]
    pub concurrency: Option<u8>,

    /// Attempts per chapter before giving up (1-10)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub chapter_attempts: Option<u32>,

    /// JPEG quality of PDF pages (1-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,

    #[command(flatten)]
    pub network: NetworkArgs,
}

/// Page-loading options shared by every network subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct NetworkArgs {
    /// Page load attempts before giving up (1-10)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub nav_attempts: Option<u32>,

    /// Page load timeout in seconds (1-3600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub nav_timeout: Option<u64>,

    /// User-Agent header for page loads and image downloads
    #[arg(long, value_name = "UA")]
    pub user_agent: Option<String>,

    /// Render pages in headless Chrome instead of parsing served HTML
    #[cfg(feature = "browser")]
    #[arg(long)]
    pub browser: bool,
}
