//! Shared User-Agent strings for page loads and image downloads.
//!
//! Reader sites serve stripped or empty markup to clients that do not look
//! like a desktop browser, so page and image traffic both default to a
//! browser User-Agent.

/// Desktop Chrome User-Agent used by default.
const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Default User-Agent for page loads and image downloads.
#[must_use]
pub fn browser_user_agent() -> &'static str {
    BROWSER_UA
}
