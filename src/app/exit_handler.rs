//! Exit code logic for the mangadl process.
//!
//! Single responsibility: map a batch outcome to the process exit outcome.

use mangadl_core::BatchReport;

use crate::ProcessExit;

/// Determines the process exit outcome from a finished batch.
pub(crate) fn determine_exit_outcome(report: &BatchReport) -> ProcessExit {
    if report.is_total_failure() {
        ProcessExit::TotalFailure
    } else if report.is_partial() {
        ProcessExit::Partial
    } else {
        ProcessExit::Success
    }
}

#[cfg(test)]
mod tests {
    use mangadl_core::{DocumentArtifact, ScrapeError, SubItem};

    use super::*;

    fn artifact() -> DocumentArtifact {
        DocumentArtifact {
            display_title: "Chapter 1".to_string(),
            file_name: "Chapter 1.pdf".to_string(),
            data: Vec::new(),
            page_count: 1,
        }
    }

    fn failure() -> (SubItem, ScrapeError) {
        (
            SubItem::new("Chapter 2", "https://x/c2"),
            ScrapeError::no_assets("Chapter 2", 4),
        )
    }

    #[test]
    fn test_exit_outcome_success_when_no_failures() {
        let report = BatchReport {
            artifacts: vec![artifact()],
            failures: vec![],
        };
        assert_eq!(determine_exit_outcome(&report), ProcessExit::Success);
    }

    #[test]
    fn test_exit_outcome_success_for_empty_selection() {
        assert_eq!(
            determine_exit_outcome(&BatchReport::default()),
            ProcessExit::Success
        );
    }

    #[test]
    fn test_exit_outcome_partial_when_mixed() {
        let report = BatchReport {
            artifacts: vec![artifact()],
            failures: vec![failure()],
        };
        assert_eq!(determine_exit_outcome(&report), ProcessExit::Partial);
    }

    #[test]
    fn test_exit_outcome_total_failure_when_all_failed() {
        let report = BatchReport {
            artifacts: vec![],
            failures: vec![failure(), failure()],
        };
        assert_eq!(determine_exit_outcome(&report), ProcessExit::TotalFailure);
    }
}
