//! Direct HTTP download of page images.
//!
//! Images are fetched with a plain HTTP client, never through a rendering
//! context. Bodies are streamed into memory with a size cap.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder};
use tracing::{debug, instrument};

use super::AssetError;

/// Default per-image timeout (30 seconds).
pub const DEFAULT_ASSET_TIMEOUT: Duration = Duration::from_secs(30);

/// Default size limit for one image (32 MiB).
pub const DEFAULT_MAX_ASSET_BYTES: u64 = 32 * 1024 * 1024;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Options for one image request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Upper bound for the whole request including the body.
    pub timeout: Duration,
    /// Extra request headers (e.g. `Referer`).
    pub headers: Vec<(String, String)>,
    /// Largest accepted body.
    pub max_bytes: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_ASSET_TIMEOUT,
            headers: Vec::new(),
            max_bytes: DEFAULT_MAX_ASSET_BYTES,
        }
    }
}

/// Fetches raw bytes for an image URL.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Downloads `url`.
    async fn get(&self, url: &str, options: &FetchOptions) -> Result<Vec<u8>, AssetError>;
}

/// [`AssetFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpAssetFetcher {
    client: Client,
}

impl HttpAssetFetcher {
    /// Creates a fetcher whose requests carry `user_agent`.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error if the client cannot be built.
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = ClientBuilder::new()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .gzip(true)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    #[instrument(level = "debug", skip(self, options), fields(url = %url))]
    async fn get(&self, url: &str, options: &FetchOptions) -> Result<Vec<u8>, AssetError> {
        let headers = build_headers(url, &options.headers)?;
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "image/avif,image/webp,image/*,*/*;q=0.8")
            .headers(headers)
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::http_status(url, status.as_u16()));
        }
        if response
            .content_length()
            .is_some_and(|length| length > options.max_bytes)
        {
            return Err(AssetError::too_large(url, options.max_bytes));
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| map_reqwest_error(url, e))?;
            if (body.len() + chunk.len()) as u64 > options.max_bytes {
                return Err(AssetError::too_large(url, options.max_bytes));
            }
            body.extend_from_slice(&chunk);
        }

        debug!(bytes = body.len(), "image downloaded");
        Ok(body)
    }
}

fn build_headers(url: &str, pairs: &[(String, String)]) -> Result<HeaderMap, AssetError> {
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| AssetError::invalid_header(url, name))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| AssetError::invalid_header(url, name))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

fn map_reqwest_error(url: &str, error: reqwest::Error) -> AssetError {
    if error.is_timeout() {
        AssetError::timeout(url)
    } else {
        AssetError::network(url, error)
    }
}
