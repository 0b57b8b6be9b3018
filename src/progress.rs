//! Progress-callback trait for conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the orchestrator moves through its stages and pages.
//!
//! # Example
//!
//! ```rust
//! use paper2epub::{ConversionConfig, ConversionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, text_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} done ({} bytes)", page_num, total_pages, text_len);
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::ConversionStage;
use std::sync::Arc;

/// Called by the orchestrator as it processes a document.
///
/// Implementations must be `Send + Sync`: with `concurrency > 1` the page
/// methods are called from concurrently running futures. All methods have
/// no-op defaults.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before any page is recognized.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called on every state-machine transition.
    fn on_stage(&self, stage: ConversionStage) {
        let _ = stage;
    }

    /// Called just before a page is sent to the recognizer.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page yields text.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, text_len: usize) {
        let _ = (page_num, total_pages, text_len);
    }

    /// Called when a page fails and is skipped.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called after the figure scan with the number of kept figures.
    fn on_figures_extracted(&self, count: usize) {
        let _ = count;
    }

    /// Called once after the book has been written.
    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StageRecorder {
        stages: Mutex<Vec<ConversionStage>>,
    }

    impl ConversionProgressCallback for StageRecorder {
        fn on_stage(&self, stage: ConversionStage) {
            self.stages.lock().unwrap().push(stage);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(5);
        cb.on_stage(ConversionStage::Init);
        cb.on_page_start(1, 5);
        cb.on_page_complete(1, 5, 42);
        cb.on_page_error(2, 5, "some error");
        cb.on_figures_extracted(3);
        cb.on_conversion_complete(5, 4);
    }

    #[test]
    fn recorder_sees_stages_in_order() {
        let cb: Arc<StageRecorder> = Arc::new(StageRecorder::default());
        let dyn_cb: ProgressCallback = cb.clone();
        dyn_cb.on_stage(ConversionStage::Init);
        dyn_cb.on_stage(ConversionStage::TextExtracting);
        assert_eq!(
            *cb.stages.lock().unwrap(),
            vec![ConversionStage::Init, ConversionStage::TextExtracting]
        );
    }
}
