//! Progress UI for download runs.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use mangadl_core::BatchEvent;

/// Chapter progress bar; a no-op when disabled.
pub(crate) struct ChapterProgress {
    bar: Option<ProgressBar>,
}

impl ChapterProgress {
    /// Creates the bar when `enabled`, sized to `total` chapters.
    pub(crate) fn new(enabled: bool, total: usize) -> Self {
        if !enabled {
            return Self { bar: None };
        }
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar: Some(bar) }
    }

    /// Returns true if a bar is shown.
    pub(crate) fn is_enabled(&self) -> bool {
        self.bar.is_some()
    }

    /// Updates the bar from a batch event.
    pub(crate) fn handle(&self, event: &BatchEvent<'_>) {
        let Some(bar) = &self.bar else {
            return;
        };
        match event {
            BatchEvent::Started { item, .. } => {
                bar.set_message(format!("Downloading {}...", item.title));
            }
            BatchEvent::Finished { artifact, .. } => {
                bar.println(format!(
                    "✓ {} ({} pages)",
                    artifact.display_title, artifact.page_count
                ));
                bar.inc(1);
            }
            BatchEvent::Failed { item, error, .. } => {
                bar.println(format!("✗ {}: {}", item.title, error.kind()));
                bar.inc(1);
            }
        }
    }

    /// Removes the bar from the terminal.
    pub(crate) fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use mangadl_core::SubItem;

    use super::*;

    #[test]
    fn test_disabled_progress_ignores_events() {
        let progress = ChapterProgress::new(false, 3);
        assert!(!progress.is_enabled());
        let item = SubItem::new("Chapter 1", "https://x/c1");
        progress.handle(&BatchEvent::Started {
            index: 0,
            total: 3,
            item: &item,
        });
        progress.finish();
    }

    #[test]
    fn test_enabled_progress_counts_finished_chapters() {
        let progress = ChapterProgress::new(true, 2);
        assert!(progress.is_enabled());
        let item = SubItem::new("Chapter 1", "https://x/c1");
        let error = mangadl_core::ScrapeError::no_assets("Chapter 1", 2);
        progress.handle(&BatchEvent::Failed {
            index: 0,
            item: &item,
            error: &error,
        });
        assert_eq!(progress.bar.as_ref().map(ProgressBar::position), Some(1));
        progress.finish();
    }
}
