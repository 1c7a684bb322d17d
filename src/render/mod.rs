//! Rendering context abstraction used by site adapters.
//!
//! Site adapters never talk to a browser or an HTTP client directly. They ask
//! a [`RenderContext`] for a [`Page`] and run CSS selector queries against it.
//! The context itself comes from a [`RenderProvider`], acquired once per
//! top-level operation and released when that operation ends.
//!
//! # Providers
//!
//! - [`HttpRenderProvider`] - fetches the document over HTTP and parses the
//!   served HTML (no script execution). Default provider.
//! - `ChromeRenderProvider` - drives headless Chrome (feature `browser`).
//!
//! # Example
//!
//! ```no_run
//! use mangadl_core::render::{HttpRenderProvider, PageOptions, RenderProvider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = HttpRenderProvider::new("Mozilla/5.0")?;
//! let ctx = provider.acquire().await?;
//! let page = ctx.new_page("https://example.com/", PageOptions::default()).await?;
//! let titles = page.query("h1").await?;
//! page.close().await;
//! ctx.release().await;
//! println!("found {} headings", titles.len());
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "browser")]
mod chrome;
mod dom;
mod error;
mod http;

#[cfg(feature = "browser")]
pub use chrome::ChromeRenderProvider;
pub use dom::{ElementNode, collapse_whitespace, select_nodes};
pub use error::RenderError;
pub use http::{HttpRenderProvider, StaticPage};

use std::time::Duration;

use async_trait::async_trait;

/// Default navigation timeout for a single page load attempt (60 seconds).
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Condition that marks a page load as settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitCondition {
    /// The DOM has been parsed; subresources may still be loading.
    DomContentLoaded,
    /// The network has gone (mostly) quiet after the initial load.
    #[default]
    NetworkIdle,
}

/// Options for opening a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    /// When the load counts as finished.
    pub wait: WaitCondition,
    /// Upper bound for the load.
    pub timeout: Duration,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            wait: WaitCondition::default(),
            timeout: DEFAULT_NAVIGATION_TIMEOUT,
        }
    }
}

/// Source of rendering contexts.
///
/// # Object Safety
///
/// Uses `async_trait` so providers can be stored as `Arc<dyn RenderProvider>`.
#[async_trait]
pub trait RenderProvider: Send + Sync {
    /// Short provider name for logs ("http", "chrome").
    fn name(&self) -> &str;

    /// Produces a fresh rendering context.
    ///
    /// Every context returned must later be passed to [`RenderContext::release`].
    async fn acquire(&self) -> Result<Box<dyn RenderContext>, RenderError>;
}

/// One acquired rendering context (a browser instance, an HTTP session).
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Loads `url` into a new page view.
    async fn new_page(&self, url: &str, options: PageOptions)
    -> Result<Box<dyn Page>, RenderError>;

    /// Releases the context and everything it still holds open.
    async fn release(&self);
}

/// A loaded document view.
#[async_trait]
pub trait Page: Send + Sync {
    /// The URL the page was loaded from.
    fn url(&self) -> &str;

    /// Returns snapshots of all elements matching `selector`, in document order.
    async fn query(&self, selector: &str) -> Result<Vec<ElementNode>, RenderError>;

    /// Waits up to `timeout` for `selector` to match at least one element.
    ///
    /// Returns `Ok(false)` when the timeout elapses without a match.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration)
    -> Result<bool, RenderError>;

    /// Closes the page view.
    async fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_options_default() {
        let options = PageOptions::default();
        assert_eq!(options.wait, WaitCondition::NetworkIdle);
        assert_eq!(options.timeout, Duration::from_secs(60));
    }
}
