//! Progress-callback trait for per-card export events.
//!
//! Inject an [`Arc<dyn ExportProgressCallback>`] via
//! [`crate::config::ExportConfigBuilder::progress_callback`] to receive
//! events as the pipeline captures each card and completes each page.
//!
//! Callbacks are the least-invasive integration point: a caller can forward
//! events to a terminal progress bar, a channel, or a UI without the
//! library knowing how the host application communicates. Captures are
//! strictly sequential, so implementations will never see two events for
//! the same run concurrently, but the trait is still `Send + Sync` because
//! the run itself executes inside a tokio task.

use std::sync::Arc;

/// Called by the export pipeline as it processes each card and page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ExportProgressCallback: Send + Sync {
    /// Called once after the readiness gate opens, before any capture.
    ///
    /// # Arguments
    /// * `total_cards` — number of cards that will be captured
    /// * `total_pages` — number of pages the document will contain
    fn on_export_start(&self, total_cards: usize, total_pages: usize) {
        let _ = (total_cards, total_pages);
    }

    /// Called just before a card is rendered and captured.
    ///
    /// # Arguments
    /// * `card_index`  — 0-indexed position in the deck
    /// * `total_cards` — total cards in the deck
    fn on_card_start(&self, card_index: usize, total_cards: usize) {
        let _ = (card_index, total_cards);
    }

    /// Called when a card's snapshot has been captured and placed.
    fn on_card_placed(&self, card_index: usize, total_cards: usize) {
        let _ = (card_index, total_cards);
    }

    /// Called when every slot of a page has been filled.
    ///
    /// # Arguments
    /// * `page_index`  — 0-indexed page number
    /// * `total_pages` — total pages in the document
    fn on_page_complete(&self, page_index: usize, total_pages: usize) {
        let _ = (page_index, total_pages);
    }

    /// Called once after the document has been finalised.
    ///
    /// # Arguments
    /// * `total_cards` — cards captured into the artifact
    /// * `pdf_bytes`   — size of the finished artifact in bytes
    fn on_export_complete(&self, total_cards: usize, pdf_bytes: usize) {
        let _ = (total_cards, pdf_bytes);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ExportProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExportConfig`].
pub type ProgressCallback = Arc<dyn ExportProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        starts: AtomicUsize,
        placed: AtomicUsize,
        pages: AtomicUsize,
        completed_bytes: AtomicUsize,
    }

    impl ExportProgressCallback for TrackingCallback {
        fn on_card_start(&self, _card: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }
        fn on_card_placed(&self, _card: usize, _total: usize) {
            self.placed.fetch_add(1, Ordering::SeqCst);
        }
        fn on_page_complete(&self, _page: usize, _total: usize) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }
        fn on_export_complete(&self, _cards: usize, bytes: usize) {
            self.completed_bytes.store(bytes, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_export_start(4, 1);
        cb.on_card_start(0, 4);
        cb.on_card_placed(0, 4);
        cb.on_page_complete(0, 1);
        cb.on_export_complete(4, 12345);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let cb = TrackingCallback {
            starts: AtomicUsize::new(0),
            placed: AtomicUsize::new(0),
            pages: AtomicUsize::new(0),
            completed_bytes: AtomicUsize::new(0),
        };

        cb.on_export_start(5, 2);
        for i in 0..5 {
            cb.on_card_start(i, 5);
            cb.on_card_placed(i, 5);
        }
        cb.on_page_complete(0, 2);
        cb.on_page_complete(1, 2);
        cb.on_export_complete(5, 9000);

        assert_eq!(cb.starts.load(Ordering::SeqCst), 5);
        assert_eq!(cb.placed.load(Ordering::SeqCst), 5);
        assert_eq!(cb.pages.load(Ordering::SeqCst), 2);
        assert_eq!(cb.completed_bytes.load(Ordering::SeqCst), 9000);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn ExportProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_export_start(1, 1);
        cb.on_card_placed(0, 1);
    }
}
