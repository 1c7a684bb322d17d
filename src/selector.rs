//! Selector fallback chains.
//!
//! Target sites change their markup often. Instead of a single selector per
//! field, adapters describe an ordered [`SelectorChain`] of strategies. The
//! chain tries each strategy in turn and returns the records of the first one
//! that both matches nodes and extracts at least one record. Later strategies
//! are not evaluated.
//!
//! # Example
//!
//! ```
//! use mangadl_core::render::StaticPage;
//! use mangadl_core::selector::SelectorChain;
//!
//! # async fn example() {
//! let page = StaticPage::new("https://example.com/", r#"<div class="b"><a href="/x">X</a></div>"#);
//! let chain = SelectorChain::new("links")
//!     .strategy(".a a", |nodes| nodes.iter().filter_map(|n| n.link("href")).collect())
//!     .strategy(".b a", |nodes| nodes.iter().filter_map(|n| n.link("href")).collect());
//! let links: Vec<String> = chain.resolve(&page).await;
//! assert_eq!(links, vec!["https://example.com/x".to_string()]);
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::ScrapeError;
use crate::render::{ElementNode, Page};

/// Default wait-for-presence timeout per strategy (5 seconds).
pub const DEFAULT_SELECTOR_WAIT: Duration = Duration::from_secs(5);

/// Turns the nodes matched by a selector into records.
pub type Extractor<T> = Arc<dyn Fn(&[ElementNode]) -> Vec<T> + Send + Sync>;

/// One (selector, extractor) pair.
pub struct Strategy<T> {
    selector: String,
    extract: Extractor<T>,
}

impl<T> Strategy<T> {
    /// Creates a strategy.
    pub fn new<F>(selector: impl Into<String>, extract: F) -> Self
    where
        F: Fn(&[ElementNode]) -> Vec<T> + Send + Sync + 'static,
    {
        Self {
            selector: selector.into(),
            extract: Arc::new(extract),
        }
    }

    /// The CSS selector of this strategy.
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }
}

impl<T> Clone for Strategy<T> {
    fn clone(&self) -> Self {
        Self {
            selector: self.selector.clone(),
            extract: Arc::clone(&self.extract),
        }
    }
}

impl<T> fmt::Debug for Strategy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy")
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}

/// Ordered extraction strategies for one kind of record.
pub struct SelectorChain<T> {
    what: String,
    strategies: Vec<Strategy<T>>,
    wait: Duration,
}

impl<T> SelectorChain<T> {
    /// Creates an empty chain; `what` names the records in logs and errors.
    #[must_use]
    pub fn new(what: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            strategies: Vec::new(),
            wait: DEFAULT_SELECTOR_WAIT,
        }
    }

    /// Appends a strategy.
    #[must_use]
    pub fn strategy<F>(mut self, selector: impl Into<String>, extract: F) -> Self
    where
        F: Fn(&[ElementNode]) -> Vec<T> + Send + Sync + 'static,
    {
        self.strategies.push(Strategy::new(selector, extract));
        self
    }

    /// Sets the per-strategy wait-for-presence timeout.
    #[must_use]
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    /// Name of the records this chain extracts.
    #[must_use]
    pub fn what(&self) -> &str {
        &self.what
    }

    /// The strategies in evaluation order.
    #[must_use]
    pub fn strategies(&self) -> &[Strategy<T>] {
        &self.strategies
    }
}

impl<T: Send> SelectorChain<T> {
    /// Returns the records of the first successful strategy, or an empty vec.
    pub async fn resolve(&self, page: &dyn Page) -> Vec<T> {
        for strategy in &self.strategies {
            let selector = strategy.selector();
            debug!(what = %self.what, selector, "trying selector strategy");

            let present = match tokio::time::timeout(
                self.wait,
                page.wait_for_selector(selector, self.wait),
            )
            .await
            {
                Ok(Ok(present)) => present,
                Ok(Err(error)) => {
                    warn!(what = %self.what, selector, error = %error, "selector wait failed");
                    continue;
                }
                Err(_) => false,
            };
            if !present {
                debug!(what = %self.what, selector, "selector not present");
                continue;
            }

            let nodes = match page.query(selector).await {
                Ok(nodes) => nodes,
                Err(error) => {
                    warn!(what = %self.what, selector, error = %error, "selector query failed");
                    continue;
                }
            };
            if nodes.is_empty() {
                continue;
            }

            let records = (strategy.extract)(&nodes);
            if records.is_empty() {
                debug!(
                    what = %self.what,
                    selector,
                    nodes = nodes.len(),
                    "strategy matched nodes but extracted nothing"
                );
                continue;
            }

            info!(
                what = %self.what,
                selector,
                count = records.len(),
                "selector strategy matched"
            );
            return records;
        }

        warn!(
            what = %self.what,
            url = page.url(),
            strategies = self.strategies.len(),
            "all selector strategies came back empty"
        );
        Vec::new()
    }

    /// Like [`resolve`](Self::resolve), but treats an empty result as an error.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::SelectorExhausted`] when no strategy succeeds.
    pub async fn resolve_required(&self, page: &dyn Page) -> Result<Vec<T>, ScrapeError> {
        let records = self.resolve(page).await;
        if records.is_empty() {
            return Err(ScrapeError::selector_exhausted(&self.what, page.url()));
        }
        Ok(records)
    }
}

impl<T> fmt::Debug for SelectorChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let selectors: Vec<&str> = self.strategies.iter().map(Strategy::selector).collect();
        f.debug_struct("SelectorChain")
            .field("what", &self.what)
            .field("strategies", &selectors)
            .field("wait", &self.wait)
            .finish()
    }
}
