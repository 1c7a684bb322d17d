//! Headless Chrome rendering provider (feature `browser`).
//!
//! Each acquired context launches its own browser process; releasing the
//! context closes the browser and stops its CDP event loop.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};
use url::Url;

use super::dom::select_nodes;
use super::{
    ElementNode, Page, PageOptions, RenderContext, RenderError, RenderProvider, WaitCondition,
};

/// Extra settle time after the load event when waiting for network idle.
const NETWORK_IDLE_SETTLE: Duration = Duration::from_millis(500);

/// Poll interval for `wait_for_selector`.
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Rendering provider backed by a headless Chrome instance per context.
#[derive(Debug, Clone)]
pub struct ChromeRenderProvider {
    user_agent: String,
}

impl ChromeRenderProvider {
    /// Creates a provider whose pages identify with `user_agent`.
    #[must_use]
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }
}

#[async_trait]
impl RenderProvider for ChromeRenderProvider {
    fn name(&self) -> &'static str {
        "chrome"
    }

    #[instrument(level = "debug", skip(self))]
    async fn acquire(&self) -> Result<Box<dyn RenderContext>, RenderError> {
        let config = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .build()
            .map_err(RenderError::acquire)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|error| RenderError::acquire(error.to_string()))?;

        let event_loop = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        debug!("launched headless browser");
        Ok(Box::new(ChromeRenderContext {
            browser: Mutex::new(Some(browser)),
            event_loop,
            user_agent: self.user_agent.clone(),
        }))
    }
}

struct ChromeRenderContext {
    browser: Mutex<Option<Browser>>,
    event_loop: JoinHandle<()>,
    user_agent: String,
}

#[async_trait]
impl RenderContext for ChromeRenderContext {
    #[instrument(level = "debug", skip(self, options), fields(url = %url))]
    async fn new_page(
        &self,
        url: &str,
        options: PageOptions,
    ) -> Result<Box<dyn Page>, RenderError> {
        let guard = self.browser.lock().await;
        let Some(browser) = guard.as_ref() else {
            return Err(RenderError::load(url, "browser already released"));
        };

        let tab = TabGuard::new(
            browser
                .new_page("about:blank")
                .await
                .map_err(|error| RenderError::load(url, error.to_string()))?,
        );
        drop(guard);

        let loaded = tokio::time::timeout(options.timeout, async {
            tab.page().set_user_agent(self.user_agent.as_str()).await?;
            tab.page().goto(url).await?;
            tab.page().wait_for_navigation().await?;
            Ok::<(), chromiumoxide::error::CdpError>(())
        })
        .await;

        match loaded {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                tab.close().await;
                return Err(RenderError::load(url, error.to_string()));
            }
            Err(_) => {
                tab.close().await;
                return Err(RenderError::timeout(url, options.timeout));
            }
        }

        if options.wait == WaitCondition::NetworkIdle {
            tokio::time::sleep(NETWORK_IDLE_SETTLE).await;
        }

        let final_url = tab
            .page()
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());
        let page = tab.keep();
        Ok(Box::new(ChromePage {
            base_url: Url::parse(&final_url).ok(),
            url: final_url,
            page,
        }))
    }

    async fn release(&self) {
        let mut guard = self.browser.lock().await;
        if let Some(mut browser) = guard.take() {
            if let Err(error) = browser.close().await {
                warn!(error = %error, "failed to close browser cleanly");
            }
            if let Err(error) = browser.wait().await {
                warn!(error = %error, "failed to reap browser process");
            }
        }
        self.event_loop.abort();
        debug!("released headless browser");
    }
}

/// Owns a freshly opened tab until the load succeeds.
///
/// Dropping an armed guard (the load future was cancelled) schedules the tab
/// close on the current runtime.
struct TabGuard {
    page: chromiumoxide::Page,
    armed: bool,
}

impl TabGuard {
    fn new(page: chromiumoxide::Page) -> Self {
        Self { page, armed: true }
    }

    fn page(&self) -> &chromiumoxide::Page {
        &self.page
    }

    /// Hands the tab to the caller; it is no longer closed on drop.
    fn keep(mut self) -> chromiumoxide::Page {
        self.armed = false;
        self.page.clone()
    }

    async fn close(mut self) {
        self.armed = false;
        close_quietly(&self.page).await;
    }
}

impl Drop for TabGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let page = self.page.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { close_quietly(&page).await });
            }
            Err(_) => warn!("no runtime to close abandoned tab"),
        }
    }
}

async fn close_quietly(page: &chromiumoxide::Page) {
    if let Err(error) = page.clone().close().await {
        debug!(error = %error, "page close failed");
    }
}

struct ChromePage {
    url: String,
    base_url: Option<Url>,
    page: chromiumoxide::Page,
}

#[async_trait]
impl Page for ChromePage {
    fn url(&self) -> &str {
        &self.url
    }

    async fn query(&self, selector: &str) -> Result<Vec<ElementNode>, RenderError> {
        let html = self
            .page
            .content()
            .await
            .map_err(|error| RenderError::query(&self.url, selector, error.to_string()))?;
        select_nodes(&html, selector, self.base_url.as_ref())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, RenderError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Ok(elements) = self.page.find_elements(selector).await {
                if !elements.is_empty() {
                    return Ok(true);
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn close(&self) {
        close_quietly(&self.page).await;
    }
}
