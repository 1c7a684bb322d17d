//! Optional `config.toml` holding defaults for CLI flags.
//!
//! The file is a flat list of `key = value` lines: integers, double-quoted
//! strings and `#` comments. Unknown keys and out-of-range values are errors.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};

const CONFIG_DIR_NAME: &str = "mangadl";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Settings read from the config file. `None` means "not set in the file".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Directory PDFs are written to.
    pub output_dir: Option<PathBuf>,
    /// Concurrent image downloads per chapter (1..=32).
    pub concurrency: Option<u8>,
    /// Page load attempts (1..=10).
    pub nav_attempts: Option<u32>,
    /// Page load timeout in seconds (1..=3600).
    pub nav_timeout_secs: Option<u64>,
    /// Per-strategy selector wait in milliseconds (1..=60000).
    pub selector_wait_ms: Option<u64>,
    /// Image download timeout in seconds (1..=3600).
    pub asset_timeout_secs: Option<u64>,
    /// Attempts per image (1..=10).
    pub asset_attempts: Option<u32>,
    /// Attempts per chapter (1..=10).
    pub chapter_attempts: Option<u32>,
    /// Cooldown between chapter attempts in milliseconds (0..=60000).
    pub chapter_cooldown_ms: Option<u64>,
    /// JPEG quality of PDF pages (1..=100).
    pub jpeg_quality: Option<u8>,
    /// User-Agent header.
    pub user_agent: Option<String>,
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Parses config file contents.
    ///
    /// # Errors
    ///
    /// Fails on syntax errors, unknown keys, wrong value types and values
    /// outside their allowed range.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut config = Self::default();
        for (index, line) in raw.lines().enumerate() {
            let line_no = index + 1;
            let line = without_comment(line).trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .map(|(key, value)| (key.trim(), value.trim()))
                .ok_or_else(|| anyhow!("line {line_no}: expected `key = value`"))?;
            let value = Value::parse(value)
                .with_context(|| format!("line {line_no}: invalid value for `{key}`"))?;
            config
                .set(key, value)
                .with_context(|| format!("line {line_no}: invalid value for `{key}`"))?;
        }
        config.check_ranges()?;
        Ok(config)
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        match key {
            "output_dir" => self.output_dir = Some(PathBuf::from(value.into_string()?)),
            "concurrency" => self.concurrency = Some(value.integer()?),
            "nav_attempts" => self.nav_attempts = Some(value.integer()?),
            "nav_timeout_secs" => self.nav_timeout_secs = Some(value.integer()?),
            "selector_wait_ms" => self.selector_wait_ms = Some(value.integer()?),
            "asset_timeout_secs" => self.asset_timeout_secs = Some(value.integer()?),
            "asset_attempts" => self.asset_attempts = Some(value.integer()?),
            "chapter_attempts" => self.chapter_attempts = Some(value.integer()?),
            "chapter_cooldown_ms" => self.chapter_cooldown_ms = Some(value.integer()?),
            "jpeg_quality" => self.jpeg_quality = Some(value.integer()?),
            "user_agent" => self.user_agent = Some(value.into_string()?),
            "verbosity" => self.verbosity = Some(value.into_string()?.parse()?),
            unknown => bail!("Unknown configuration key '{unknown}'"),
        }
        Ok(())
    }

    fn check_ranges(&self) -> Result<()> {
        in_range("concurrency", self.concurrency, 1, 32)?;
        in_range("jpeg_quality", self.jpeg_quality, 1, 100)?;
        in_range("nav_attempts", self.nav_attempts, 1, 10)?;
        in_range("asset_attempts", self.asset_attempts, 1, 10)?;
        in_range("chapter_attempts", self.chapter_attempts, 1, 10)?;
        in_range("nav_timeout_secs", self.nav_timeout_secs, 1, 3600)?;
        in_range("asset_timeout_secs", self.asset_timeout_secs, 1, 3600)?;
        in_range("selector_wait_ms", self.selector_wait_ms, 1, 60_000)?;
        in_range("chapter_cooldown_ms", self.chapter_cooldown_ms, 0, 60_000)?;
        if self
            .user_agent
            .as_deref()
            .is_some_and(|ua| ua.trim().is_empty())
        {
            bail!("`user_agent` must not be empty");
        }
        Ok(())
    }
}

fn in_range<T>(key: &str, value: Option<T>, min: T, max: T) -> Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    match value {
        Some(value) if value < min || value > max => {
            bail!("`{key}` = {value} is out of range (allowed {min}..={max})")
        }
        _ => Ok(()),
    }
}

/// The right-hand side of a config line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Text(String),
    Integer(u64),
}

impl Value {
    fn parse(raw: &str) -> Result<Self> {
        if let Some(inner) = raw.strip_prefix('"') {
            let text = inner
                .strip_suffix('"')
                .ok_or_else(|| anyhow!("unterminated string {raw}"))?;
            return Ok(Self::Text(text.to_string()));
        }
        raw.parse::<u64>().map(Self::Integer).map_err(|_| {
            anyhow!("expected a non-negative integer or a quoted string, got `{raw}`")
        })
    }

    fn into_string(self) -> Result<String> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Integer(n) => bail!("expected a quoted string, got {n}"),
        }
    }

    fn integer<T: TryFrom<u64>>(self) -> Result<T> {
        match self {
            Self::Integer(n) => T::try_from(n).map_err(|_| anyhow!("{n} is too large")),
            Self::Text(text) => bail!("expected an integer, got \"{text}\""),
        }
    }
}

/// Drops a trailing `#` comment; `#` inside a quoted string is kept.
fn without_comment(line: &str) -> &str {
    let mut quoted = false;
    let cut = line.char_indices().find_map(|(index, ch)| {
        if ch == '"' {
            quoted = !quoted;
        }
        (ch == '#' && !quoted).then_some(index)
    });
    cut.map_or(line, |index| &line[..index])
}

/// Log verbosity chosen in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Log level used when neither `RUST_LOG` nor a CLI flag decides.
    #[must_use]
    pub fn log_level(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Quiet => "error",
            Self::Debug => "trace",
        }
    }
}

impl FromStr for VerbositySetting {
    type Err = anyhow::Error;

    fn from_str(label: &str) -> Result<Self> {
        match label {
            "default" => Ok(Self::Default),
            "verbose" => Ok(Self::Verbose),
            "quiet" => Ok(Self::Quiet),
            "debug" => Ok(Self::Debug),
            other => bail!("unknown verbosity '{other}' (use default, verbose, quiet or debug)"),
        }
    }
}

/// Config file contents and where they came from.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// File that was (or would have been) read.
    pub path: Option<PathBuf>,
    pub config: FileConfig,
    /// False when no file existed and defaults are in effect.
    pub loaded_from_file: bool,
}

/// `$XDG_CONFIG_HOME/mangadl/config.toml`, else `$HOME/.config/mangadl/config.toml`.
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    let config_home = non_empty_env("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| non_empty_env("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(config_home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

fn non_empty_env(name: &str) -> Option<std::ffi::OsString> {
    env::var_os(name).filter(|value| !value.is_empty())
}

/// Loads `explicit`, which must exist, or the default file when present.
///
/// # Errors
///
/// Fails when the file cannot be read or does not parse.
pub fn load_file_config_from(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let (path, required) = match explicit {
        Some(path) => (Some(path.to_path_buf()), true),
        None => (resolve_default_config_path(), false),
    };
    let Some(file) = path.as_deref() else {
        return Ok(LoadedConfig::default());
    };
    if !required && !file.exists() {
        return Ok(LoadedConfig {
            path,
            ..LoadedConfig::default()
        });
    }

    let raw = fs::read_to_string(file)
        .with_context(|| format!("Failed to read config file '{}'", file.display()))?;
    let config = FileConfig::parse(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", file.display()))?;
    Ok(LoadedConfig {
        path,
        config,
        loaded_from_file: true,
    })
}
