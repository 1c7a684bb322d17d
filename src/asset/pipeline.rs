//! Bounded concurrent download and transcode of one chapter's pages.
//!
//! # Concurrency Model
//!
//! - Each page runs in its own Tokio task, tagged with its page index
//! - A semaphore permit is acquired before spawning each task
//! - Permits are released automatically when a task completes (RAII)
//! - Transcoding runs on the blocking pool
//! - Results are merged back in page-index order once all tasks finish
//!
//! # Failure Handling
//!
//! A page that fails to download or transcode is logged, recorded in the
//! [`AssetReport`] and left out. Transient download failures are retried
//! first; permanent ones (404, undecodable bytes) are not.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::config::{ConfigError, DEFAULT_ASSET_ATTEMPTS, MAX_ASSET_CONCURRENCY};
use crate::model::{AssetReference, CanonicalAsset};
use crate::retry::{RetryPolicy, with_retry_if};

use super::fetch::{DEFAULT_ASSET_TIMEOUT, DEFAULT_MAX_ASSET_BYTES};
use super::{AssetError, AssetFetcher, FetchOptions, Transcoder, classify_error};

/// Delay between attempts of one page download.
pub const ASSET_RETRY_DELAY: Duration = Duration::from_millis(500);

/// A page that was left out of the chapter.
#[derive(Debug)]
pub struct AssetFailure {
    /// Page position in the chapter.
    pub index: usize,
    /// Image URL.
    pub url: String,
    /// Why the page was dropped.
    pub error: AssetError,
}

/// Outcome of fetching one chapter's pages.
#[derive(Debug, Default)]
pub struct AssetReport {
    /// Successfully transcoded pages, in page order.
    pub assets: Vec<CanonicalAsset>,
    /// Dropped pages, in page order.
    pub failures: Vec<AssetFailure>,
    /// Number of references that were attempted.
    pub requested: usize,
}

impl AssetReport {
    /// Returns true if no page survived.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Concurrent page downloader and transcoder.
pub struct AssetPipeline {
    fetcher: Arc<dyn AssetFetcher>,
    transcoder: Arc<dyn Transcoder>,
    semaphore: Arc<Semaphore>,
    concurrency: usize,
    retry_policy: RetryPolicy,
    timeout: Duration,
    max_bytes: u64,
}

impl AssetPipeline {
    /// Creates a pipeline running at most `concurrency` page tasks at once.
    ///
    /// Defaults: 2 attempts per page, 30 s timeout, 32 MiB size cap.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] unless `concurrency` is in 1..=32.
    #[instrument(level = "debug", skip(fetcher, transcoder))]
    pub fn new(
        fetcher: Arc<dyn AssetFetcher>,
        transcoder: Arc<dyn Transcoder>,
        concurrency: usize,
    ) -> Result<Self, ConfigError> {
        if !(1..=MAX_ASSET_CONCURRENCY).contains(&concurrency) {
            return Err(ConfigError::out_of_range(
                "asset_concurrency",
                concurrency,
                "1..=32",
            ));
        }
        Ok(Self {
            fetcher,
            transcoder,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            retry_policy: RetryPolicy::fixed(DEFAULT_ASSET_ATTEMPTS, ASSET_RETRY_DELAY),
            timeout: DEFAULT_ASSET_TIMEOUT,
            max_bytes: DEFAULT_MAX_ASSET_BYTES,
        })
    }

    /// Sets the per-page retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Sets the per-page download timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the per-page size cap.
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Downloads and transcodes every reference, keeping page order.
    ///
    /// `headers` are sent with every image request (e.g. `Referer`).
    /// Individual page failures never make this method fail.
    #[instrument(skip(self, references, headers), fields(pages = references.len()))]
    pub async fn fetch_and_transcode(
        &self,
        references: &[AssetReference],
        headers: &[(String, String)],
    ) -> AssetReport {
        let options = Arc::new(FetchOptions {
            timeout: self.timeout,
            headers: headers.to_vec(),
            max_bytes: self.max_bytes,
        });
        let mut handles = Vec::with_capacity(references.len());

        for reference in references {
            // Closed only if the pipeline is dropped mid-run.
            let Ok(permit) = Arc::clone(&self.semaphore).acquire_owned().await else {
                break;
            };

            let fetcher = Arc::clone(&self.fetcher);
            let transcoder = Arc::clone(&self.transcoder);
            let options = Arc::clone(&options);
            let policy = self.retry_policy.clone();
            let task_reference = reference.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let result = fetch_one(
                    fetcher.as_ref(),
                    transcoder,
                    &policy,
                    &task_reference,
                    &options,
                )
                .await;
                (task_reference, result)
            });
            handles.push((reference.index, reference.url.clone(), handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (index, url, handle) in handles {
            match handle.await {
                Ok((reference, result)) => results.push((reference.index, reference.url, result)),
                Err(join_error) => {
                    warn!(index, error = %join_error, "page task panicked");
                    results.push((
                        index,
                        url.clone(),
                        Err(AssetError::transcode(url, "page task panicked")),
                    ));
                }
            }
        }
        results.sort_by_key(|(index, _, _)| *index);

        let mut report = AssetReport {
            requested: references.len(),
            ..AssetReport::default()
        };
        for (index, url, result) in results {
            match result {
                Ok(asset) => report.assets.push(asset),
                Err(error) => {
                    warn!(index, url = %url, error = %error, "skipping page");
                    report.failures.push(AssetFailure { index, url, error });
                }
            }
        }

        info!(
            requested = report.requested,
            succeeded = report.assets.len(),
            failed = report.failures.len(),
            "chapter pages processed"
        );
        report
    }
}

impl std::fmt::Debug for AssetPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetPipeline")
            .field("concurrency", &self.concurrency)
            .field("retry_policy", &self.retry_policy)
            .field("timeout", &self.timeout)
            .field("max_bytes", &self.max_bytes)
            .finish_non_exhaustive()
    }
}

async fn fetch_one(
    fetcher: &dyn AssetFetcher,
    transcoder: Arc<dyn Transcoder>,
    policy: &RetryPolicy,
    reference: &AssetReference,
    options: &FetchOptions,
) -> Result<CanonicalAsset, AssetError> {
    let url = reference.url.as_str();
    let bytes = with_retry_if(
        policy,
        "page download",
        |attempt| async move {
            debug!(index = reference.index, attempt, url, "downloading page");
            match tokio::time::timeout(options.timeout, fetcher.get(url, options)).await {
                Ok(result) => result,
                Err(_) => Err(AssetError::timeout(url)),
            }
        },
        |error: &AssetError| classify_error(error).is_retryable(),
    )
    .await
    .map_err(|exhausted| exhausted.last_error)?;

    let owned_url = url.to_string();
    tokio::task::spawn_blocking(move || transcoder.to_canonical(&owned_url, &bytes))
        .await
        .unwrap_or_else(|join_error| {
            Err(AssetError::transcode(
                url,
                format!("transcoder panicked: {join_error}"),
            ))
        })
}
