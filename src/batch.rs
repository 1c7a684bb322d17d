//! Batch orchestrator: one document per selected chapter.
//!
//! Chapters are processed one after another. Each chapter goes through image
//! resolution, the asset pipeline and document assembly under an item-level
//! retry policy. A chapter that still fails is recorded in the
//! [`BatchReport`] and the batch moves on.
//!
//! # Outcomes
//!
//! - every chapter assembled: [`BatchReport::is_complete`]
//! - some chapters failed: [`BatchReport::is_partial`]
//! - no document at all: [`BatchReport::is_total_failure`]

use tracing::{info, instrument, warn};

use crate::adapter::{AdapterRegistry, Capability, ScrapeSession};
use crate::asset::AssetPipeline;
use crate::document::{self, AssemblyError, DOCUMENT_EXTENSION};
use crate::error::ScrapeError;
use crate::model::{DocumentArtifact, SubItem};
use crate::retry::{RetryPolicy, with_retry_if};

/// Characters that cannot appear in file names on common filesystems.
const FORBIDDEN_FILE_NAME_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replaces every filesystem-hostile character in `title` with `_`.
///
/// The replacement is one-for-one, so the result has the same number of
/// characters as the input.
///
/// ```
/// use mangadl_core::batch::sanitize_file_name;
///
/// assert_eq!(
///     sanitize_file_name(r#"Chapter 10: "Arrival"/End"#),
///     "Chapter 10_ _Arrival__End"
/// );
/// ```
#[must_use]
pub fn sanitize_file_name(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if FORBIDDEN_FILE_NAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Progress notifications emitted while a batch runs.
#[derive(Debug)]
pub enum BatchEvent<'a> {
    /// Work on a chapter begins.
    Started {
        /// Zero-based position in the selection.
        index: usize,
        /// Selection size.
        total: usize,
        /// The chapter.
        item: &'a SubItem,
    },
    /// A chapter produced a document.
    Finished {
        /// Zero-based position in the selection.
        index: usize,
        /// The document.
        artifact: &'a DocumentArtifact,
    },
    /// A chapter failed for good.
    Failed {
        /// Zero-based position in the selection.
        index: usize,
        /// The chapter.
        item: &'a SubItem,
        /// Error from the final attempt.
        error: &'a ScrapeError,
    },
}

/// Result of a batch download.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Documents in selection order.
    pub artifacts: Vec<DocumentArtifact>,
    /// Chapters that produced no document, with the final error.
    pub failures: Vec<(SubItem, ScrapeError)>,
}

impl BatchReport {
    /// Returns true if every selected chapter produced a document.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns true if some, but not all, chapters failed.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.artifacts.is_empty() && !self.failures.is_empty()
    }

    /// Returns true if chapters were selected but none produced a document.
    #[must_use]
    pub fn is_total_failure(&self) -> bool {
        self.artifacts.is_empty() && !self.failures.is_empty()
    }
}

/// Drives chapters through resolution, download and assembly.
#[derive(Debug)]
pub struct BatchOrchestrator<'a> {
    registry: &'a AdapterRegistry,
    pipeline: &'a AssetPipeline,
    retry_policy: RetryPolicy,
}

impl<'a> BatchOrchestrator<'a> {
    /// Creates an orchestrator with the default item retry policy
    /// (3 attempts, 2 s apart).
    #[must_use]
    pub fn new(registry: &'a AdapterRegistry, pipeline: &'a AssetPipeline) -> Self {
        Self {
            registry,
            pipeline,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Sets the per-chapter retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Downloads every chapter in `selected` as one document each.
    ///
    /// `on_event` is called as chapters start, finish and fail. An empty
    /// selection returns an empty report.
    ///
    /// # Errors
    ///
    /// Only dispatch failures for `series_url` itself propagate
    /// ([`ScrapeError::UnsupportedSite`], [`ScrapeError::CapabilityNotSupported`]);
    /// chapter failures are collected in the report.
    #[instrument(skip(self, session, selected, on_event), fields(chapters = selected.len()))]
    pub async fn download_selection<F>(
        &self,
        session: &ScrapeSession<'_>,
        series_url: &str,
        selected: &[SubItem],
        mut on_event: F,
    ) -> Result<BatchReport, ScrapeError>
    where
        F: FnMut(BatchEvent<'_>) + Send,
    {
        self.registry
            .resolve_capable(series_url, Capability::ResolveAssets)?;

        let mut report = BatchReport::default();
        let total = selected.len();

        for (index, item) in selected.iter().enumerate() {
            on_event(BatchEvent::Started { index, total, item });

            let outcome = with_retry_if(
                &self.retry_policy,
                "chapter",
                |_attempt| self.process_item(session, series_url, item),
                |error: &ScrapeError| is_item_retryable(error),
            )
            .await;

            match outcome {
                Ok(artifact) => {
                    on_event(BatchEvent::Finished {
                        index,
                        artifact: &artifact,
                    });
                    report.artifacts.push(artifact);
                }
                Err(exhausted) => {
                    let error = exhausted.last_error;
                    warn!(
                        chapter = %item.title,
                        attempts = exhausted.attempts,
                        kind = error.kind(),
                        error = %error,
                        "chapter failed"
                    );
                    on_event(BatchEvent::Failed {
                        index,
                        item,
                        error: &error,
                    });
                    report.failures.push((item.clone(), error));
                }
            }
        }

        info!(
            succeeded = report.artifacts.len(),
            failed = report.failures.len(),
            "batch finished"
        );
        Ok(report)
    }

    async fn process_item(
        &self,
        session: &ScrapeSession<'_>,
        series_url: &str,
        item: &SubItem,
    ) -> Result<DocumentArtifact, ScrapeError> {
        let references = self
            .registry
            .resolve_assets(session, series_url, item)
            .await?;

        let headers = self.registry.resolve(series_url)?.asset_headers(item);
        let report = self.pipeline.fetch_and_transcode(&references, &headers).await;
        if report.is_empty() {
            return Err(ScrapeError::no_assets(&item.title, report.requested));
        }

        let page_count = report.assets.len();
        let pages = report.assets;
        let data = tokio::task::spawn_blocking(move || document::assemble(&pages))
            .await
            .unwrap_or_else(|join_error| {
                Err(AssemblyError::encode(format!(
                    "assembler panicked: {join_error}"
                )))
            })
            .map_err(|e| ScrapeError::assembly(&item.title, e))?;

        Ok(DocumentArtifact {
            display_title: item.title.clone(),
            file_name: format!("{}.{DOCUMENT_EXTENSION}", sanitize_file_name(&item.title)),
            data,
            page_count,
        })
    }
}

/// Dispatch errors cannot change between attempts.
fn is_item_retryable(error: &ScrapeError) -> bool {
    !matches!(
        error,
        ScrapeError::UnsupportedSite { .. } | ScrapeError::CapabilityNotSupported { .. }
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_each_forbidden_char() {
        assert_eq!(
            sanitize_file_name(r#"Chapter 10: "Arrival"/End"#),
            "Chapter 10_ _Arrival__End"
        );
        assert_eq!(sanitize_file_name(r"a<b>c\d|e?f*g"), "a_b_c_d_e_f_g");
    }

    #[test]
    fn test_sanitize_keeps_length_and_plain_titles() {
        let title = "Chapter 7.5 - Side Story";
        assert_eq!(sanitize_file_name(title), title);
        let hostile = "::::";
        assert_eq!(
            sanitize_file_name(hostile).chars().count(),
            hostile.chars().count()
        );
    }

    #[test]
    fn test_report_outcomes_are_distinguishable() {
        let artifact = DocumentArtifact {
            display_title: "Chapter 1".to_string(),
            file_name: "Chapter 1.pdf".to_string(),
            data: vec![],
            page_count: 1,
        };
        let failure = || {
            (
                SubItem::new("Chapter 2", "https://x/c2"),
                ScrapeError::no_assets("Chapter 2", 3),
            )
        };

        let empty = BatchReport::default();
        assert!(empty.is_complete());
        assert!(!empty.is_total_failure());

        let partial = BatchReport {
            artifacts: vec![artifact],
            failures: vec![failure()],
        };
        assert!(partial.is_partial());
        assert!(!partial.is_total_failure());

        let total = BatchReport {
            artifacts: vec![],
            failures: vec![failure()],
        };
        assert!(total.is_total_failure());
        assert!(!total.is_partial());
    }

    #[test]
    fn test_dispatch_errors_are_not_retried() {
        assert!(!is_item_retryable(&ScrapeError::unsupported_site("u")));
        assert!(is_item_retryable(&ScrapeError::no_assets("c", 2)));
        assert!(is_item_retryable(&ScrapeError::selector_exhausted(
            "chapter images",
            "u"
        )));
    }
}
