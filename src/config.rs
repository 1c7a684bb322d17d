//! Runtime configuration for the scraping pipeline.
//!
//! [`ScraperConfig`] collects every tunable of the library in one place. The
//! CLI fills it from flags and its config file; library users can start from
//! [`ScraperConfig::default`] and override fields.

use std::time::Duration;

use thiserror::Error;

use crate::asset::{DEFAULT_ASSET_TIMEOUT, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_ASSET_BYTES};
use crate::render::DEFAULT_NAVIGATION_TIMEOUT;
use crate::retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
use crate::selector::DEFAULT_SELECTOR_WAIT;
use crate::user_agent;

/// Default number of concurrent image downloads per chapter.
pub const DEFAULT_ASSET_CONCURRENCY: usize = 6;

/// Highest accepted asset concurrency.
pub const MAX_ASSET_CONCURRENCY: usize = 32;

/// Default attempts per image (one retry for transient failures).
pub const DEFAULT_ASSET_ATTEMPTS: u32 = 2;

/// Errors from configuration validation and client construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric setting is outside its accepted range.
    #[error("invalid value for `{field}`: {value}. Expected range: {expected}")]
    OutOfRange {
        /// Setting name.
        field: &'static str,
        /// Rejected value.
        value: String,
        /// Accepted range, human readable.
        expected: &'static str,
    },

    /// The user agent is empty or not a valid header value.
    #[error("invalid user agent '{value}'\n  Suggestion: Use a non-empty ASCII user agent string")]
    InvalidUserAgent {
        /// Rejected value.
        value: String,
    },

    /// An HTTP client could not be constructed.
    #[error("failed to build HTTP client: {reason}")]
    HttpClient {
        /// Builder error message.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an `OutOfRange` error.
    pub fn out_of_range(field: &'static str, value: impl ToString, expected: &'static str) -> Self {
        Self::OutOfRange {
            field,
            value: value.to_string(),
            expected,
        }
    }

    /// Creates an `HttpClient` error.
    pub fn http_client(reason: impl Into<String>) -> Self {
        Self::HttpClient {
            reason: reason.into(),
        }
    }
}

/// All tunables of the scraping pipeline.
///
/// # Default Values
///
/// - navigation: 3 attempts, 2 s apart, 60 s timeout each
/// - selector wait: 5 s per strategy
/// - assets: 6 concurrent, 30 s timeout, 2 attempts, 32 MiB cap, JPEG quality 90
/// - chapters: 3 attempts, 2 s cooldown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScraperConfig {
    /// Page load attempts (including the first).
    pub navigation_attempts: u32,
    /// Delay between page load attempts.
    pub navigation_delay: Duration,
    /// Timeout of one page load attempt.
    pub navigation_timeout: Duration,
    /// Wait-for-presence timeout of one selector strategy.
    pub selector_wait: Duration,
    /// Concurrent image downloads per chapter.
    pub asset_concurrency: usize,
    /// Timeout of one image download.
    pub asset_timeout: Duration,
    /// Attempts per image for transient failures.
    pub asset_attempts: u32,
    /// Largest accepted image body.
    pub max_asset_bytes: u64,
    /// JPEG quality of canonical pages.
    pub jpeg_quality: u8,
    /// Attempts per chapter (resolution, download, assembly).
    pub item_attempts: u32,
    /// Cooldown between chapter attempts.
    pub item_cooldown: Duration,
    /// User agent for page loads and image downloads.
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            navigation_attempts: DEFAULT_MAX_ATTEMPTS,
            navigation_delay: DEFAULT_RETRY_DELAY,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            selector_wait: DEFAULT_SELECTOR_WAIT,
            asset_concurrency: DEFAULT_ASSET_CONCURRENCY,
            asset_timeout: DEFAULT_ASSET_TIMEOUT,
            asset_attempts: DEFAULT_ASSET_ATTEMPTS,
            max_asset_bytes: DEFAULT_MAX_ASSET_BYTES,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            item_attempts: DEFAULT_MAX_ATTEMPTS,
            item_cooldown: DEFAULT_RETRY_DELAY,
            user_agent: user_agent::browser_user_agent().to_string(),
        }
    }
}

impl ScraperConfig {
    /// Validates every field.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("navigation_attempts", self.navigation_attempts, 1, 10, "1..=10")?;
        check_range("asset_attempts", self.asset_attempts, 1, 10, "1..=10")?;
        check_range("item_attempts", self.item_attempts, 1, 10, "1..=10")?;
        check_range(
            "asset_concurrency",
            self.asset_concurrency,
            1,
            MAX_ASSET_CONCURRENCY,
            "1..=32",
        )?;
        check_range("jpeg_quality", self.jpeg_quality, 1, 100, "1..=100")?;
        check_timeout("navigation_timeout", self.navigation_timeout)?;
        check_timeout("asset_timeout", self.asset_timeout)?;
        check_timeout("selector_wait", self.selector_wait)?;
        if self.max_asset_bytes == 0 {
            return Err(ConfigError::out_of_range(
                "max_asset_bytes",
                self.max_asset_bytes,
                "1 or more",
            ));
        }
        if self.user_agent.trim().is_empty()
            || !self.user_agent.chars().all(|c| c.is_ascii() && !c.is_ascii_control())
        {
            return Err(ConfigError::InvalidUserAgent {
                value: self.user_agent.clone(),
            });
        }
        Ok(())
    }
}

fn check_range<T>(
    field: &'static str,
    value: T,
    min: T,
    max: T,
    expected: &'static str,
) -> Result<(), ConfigError>
where
    T: PartialOrd + ToString,
{
    if value < min || value > max {
        return Err(ConfigError::out_of_range(field, value, expected));
    }
    Ok(())
}

fn check_timeout(field: &'static str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() || value > Duration::from_secs(3600) {
        return Err(ConfigError::out_of_range(
            field,
            format!("{}ms", value.as_millis()),
            "1ms..=3600s",
        ));
    }
    Ok(())
}
