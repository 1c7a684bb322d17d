//! HTTP-backed rendering provider.
//!
//! Fetches documents with `reqwest` and answers selector queries by parsing
//! the served HTML. Script-generated markup is not visible to this provider;
//! sites that need it should use the `browser` feature.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, ClientBuilder};
use tracing::{debug, instrument};
use url::Url;

use super::dom::select_nodes;
use super::{ElementNode, Page, PageOptions, RenderContext, RenderError, RenderProvider};

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default size limit for one HTML document (8 MiB).
pub const DEFAULT_MAX_PAGE_BYTES: u64 = 8 * 1024 * 1024;

/// Rendering provider that loads pages over plain HTTP.
#[derive(Debug, Clone)]
pub struct HttpRenderProvider {
    client: Client,
    max_page_bytes: u64,
}

impl HttpRenderProvider {
    /// Creates a provider whose page requests carry `user_agent`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Acquire`] if the HTTP client cannot be built.
    pub fn new(user_agent: &str) -> Result<Self, RenderError> {
        let client = ClientBuilder::new()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .gzip(true)
            .build()
            .map_err(|error| {
                RenderError::acquire(format!("HTTP client construction failed: {error}"))
            })?;
        Ok(Self {
            client,
            max_page_bytes: DEFAULT_MAX_PAGE_BYTES,
        })
    }

    /// Same provider with a different per-document size limit.
    #[must_use]
    pub fn with_max_page_bytes(mut self, max_page_bytes: u64) -> Self {
        self.max_page_bytes = max_page_bytes;
        self
    }
}

#[async_trait]
impl RenderProvider for HttpRenderProvider {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn acquire(&self) -> Result<Box<dyn RenderContext>, RenderError> {
        debug!("acquired http rendering context");
        Ok(Box::new(HttpRenderContext {
            client: self.client.clone(),
            max_page_bytes: self.max_page_bytes,
        }))
    }
}

struct HttpRenderContext {
    client: Client,
    max_page_bytes: u64,
}

#[async_trait]
impl RenderContext for HttpRenderContext {
    #[instrument(level = "debug", skip(self, options), fields(url = %url))]
    async fn new_page(
        &self,
        url: &str,
        options: PageOptions,
    ) -> Result<Box<dyn Page>, RenderError> {
        // A fully received response body is both "DOM loaded" and "network
        // idle" for a static document, so the wait condition needs no mapping.
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|error| map_reqwest_error(url, options.timeout, &error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::http_status(url, status.as_u16()));
        }

        if response
            .content_length()
            .is_some_and(|length| length > self.max_page_bytes)
        {
            return Err(RenderError::too_large(url, self.max_page_bytes));
        }

        let final_url = response.url().to_string();
        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|error| map_reqwest_error(url, options.timeout, &error))?;
            if (body.len() + chunk.len()) as u64 > self.max_page_bytes {
                return Err(RenderError::too_large(url, self.max_page_bytes));
            }
            body.extend_from_slice(&chunk);
        }
        let html = String::from_utf8_lossy(&body).into_owned();

        debug!(bytes = html.len(), final_url = %final_url, "page loaded");
        Ok(Box::new(StaticPage::new(final_url, html)))
    }

    async fn release(&self) {
        debug!("released http rendering context");
    }
}

fn map_reqwest_error(url: &str, timeout: Duration, error: &reqwest::Error) -> RenderError {
    if error.is_timeout() {
        RenderError::timeout(url, timeout)
    } else {
        RenderError::load(url, error.to_string())
    }
}

/// A page backed by an HTML string.
///
/// Produced by [`HttpRenderProvider`]; also usable directly to run adapters
/// against captured markup.
#[derive(Debug, Clone)]
pub struct StaticPage {
    url: String,
    base_url: Option<Url>,
    html: String,
}

impl StaticPage {
    /// Wraps `html` as if it had been loaded from `url`.
    #[must_use]
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        let url = url.into();
        let base_url = Url::parse(&url).ok();
        Self {
            url,
            base_url,
            html: html.into(),
        }
    }
}

#[async_trait]
impl Page for StaticPage {
    fn url(&self) -> &str {
        &self.url
    }

    async fn query(&self, selector: &str) -> Result<Vec<ElementNode>, RenderError> {
        select_nodes(&self.html, selector, self.base_url.as_ref())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        _timeout: Duration,
    ) -> Result<bool, RenderError> {
        // Static markup never changes after load.
        Ok(!select_nodes(&self.html, selector, self.base_url.as_ref())?.is_empty())
    }

    async fn close(&self) {}
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::render::WaitCondition;

    #[tokio::test]
    async fn test_static_page_query_resolves_links() {
        let page = StaticPage::new(
            "https://example.com/series/",
            r#"<div class="x"><a href="c1">One</a></div>"#,
        );
        let nodes = page.query(".x a").await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(
            nodes[0].link("href").as_deref(),
            Some("https://example.com/series/c1")
        );
    }

    #[tokio::test]
    async fn test_static_page_wait_for_selector_reports_presence() {
        let page = StaticPage::new("https://example.com/", "<p class='a'>x</p>");
        assert!(
            page.wait_for_selector("p.a", Duration::from_millis(10))
                .await
                .unwrap()
        );
        assert!(
            !page
                .wait_for_selector("p.b", Duration::from_millis(10))
                .await
                .unwrap()
        );
    }

    #[test]
    fn test_http_provider_name() {
        let provider = HttpRenderProvider::new("test-agent").unwrap();
        assert_eq!(provider.name(), "http");
    }

    fn page_options() -> PageOptions {
        PageOptions {
            wait: WaitCondition::DomContentLoaded,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_new_page_rejects_oversized_documents() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/huge"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("x".repeat(4096)),
            )
            .mount(&server)
            .await;

        let provider = HttpRenderProvider::new("test-agent")
            .unwrap()
            .with_max_page_bytes(1024);
        let ctx = provider.acquire().await.unwrap();
        let err = ctx
            .new_page(&format!("{}/huge", server.uri()), page_options())
            .await
            .err()
            .unwrap();

        assert!(matches!(err, RenderError::TooLarge { limit_bytes: 1024, .. }));
    }

    #[tokio::test]
    async fn test_new_page_loads_documents_within_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/small"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<p class='a'>hello</p>"),
            )
            .mount(&server)
            .await;

        let provider = HttpRenderProvider::new("test-agent")
            .unwrap()
            .with_max_page_bytes(1024);
        let ctx = provider.acquire().await.unwrap();
        let page = ctx
            .new_page(&format!("{}/small", server.uri()), page_options())
            .await
            .unwrap();

        let nodes = page.query("p.a").await.unwrap();
        assert_eq!(nodes.len(), 1);
    }
}
