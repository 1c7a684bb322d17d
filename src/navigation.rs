//! Navigation policy wrapping every page load with retry and timeout.

use std::time::Duration;

use tracing::{debug, instrument};

use crate::error::ScrapeError;
use crate::render::{
    DEFAULT_NAVIGATION_TIMEOUT, Page, PageOptions, RenderContext, RenderError, WaitCondition,
};
use crate::retry::{RetryPolicy, with_retry};

/// Slack added to the outer per-attempt deadline so a provider that enforces
/// `PageOptions::timeout` itself hits its own deadline first and can release
/// whatever it opened.
pub const PROVIDER_DEADLINE_GRACE: Duration = Duration::from_secs(5);

/// Bounded-retry page loading.
///
/// # Default Values
///
/// - 3 attempts, fixed 2 second delay between them
/// - wait condition: network idle
/// - 60 second timeout per attempt
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationPolicy {
    retry: RetryPolicy,
    wait: WaitCondition,
    timeout: Duration,
}

impl Default for NavigationPolicy {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            wait: WaitCondition::default(),
            timeout: DEFAULT_NAVIGATION_TIMEOUT,
        }
    }
}

impl NavigationPolicy {
    /// Creates a navigation policy.
    #[must_use]
    pub fn new(retry: RetryPolicy, wait: WaitCondition, timeout: Duration) -> Self {
        Self {
            retry,
            wait,
            timeout,
        }
    }

    /// The retry policy applied to page loads.
    #[must_use]
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Per-attempt timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Same policy with a different wait condition.
    #[must_use]
    pub fn with_wait(mut self, wait: WaitCondition) -> Self {
        self.wait = wait;
        self
    }

    /// Loads `url` in `ctx`, retrying failed attempts.
    ///
    /// Each attempt is bounded by the policy timeout plus
    /// [`PROVIDER_DEADLINE_GRACE`] even if the provider does not enforce a
    /// deadline itself.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Navigation`] with the last cause once the retry
    /// ceiling is reached.
    #[instrument(skip(self, ctx), fields(max_attempts = self.retry.max_attempts()))]
    pub async fn load_page(
        &self,
        ctx: &dyn RenderContext,
        url: &str,
    ) -> Result<Box<dyn Page>, ScrapeError> {
        let options = PageOptions {
            wait: self.wait,
            timeout: self.timeout,
        };

        let outer_deadline = options.timeout + PROVIDER_DEADLINE_GRACE;
        let page = with_retry(&self.retry, "navigation", |attempt| async move {
            debug!(attempt, url, "loading page");
            match tokio::time::timeout(outer_deadline, ctx.new_page(url, options)).await {
                Ok(result) => result,
                Err(_) => Err(RenderError::timeout(url, options.timeout)),
            }
        })
        .await
        .map_err(|exhausted| {
            ScrapeError::navigation(url, exhausted.attempts, exhausted.last_error)
        })?;

        debug!(url = page.url(), "page ready");
        Ok(page)
    }
}
