//! Progress-callback trait for conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConverterConfigBuilder::progress_callback`] to receive
//! events as a conversion runs. Page events fire for strategies that walk the
//! document page by page (rasterisation and text extraction).
//!
//! # Example
//!
//! ```rust
//! use pdfconvert::{ConversionProgressCallback, ConverterConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter {
//!     pages: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for PageCounter {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize) {
//!         self.pages.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num}/{total_pages}");
//!     }
//! }
//!
//! let counter = Arc::new(PageCounter { pages: AtomicUsize::new(0) });
//!
//! let config = ConverterConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the dispatcher and the page-walking pipeline stages.
///
/// Page events are emitted from blocking worker threads, so implementations
/// must be `Send + Sync`. All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once after the format has been validated, before any work.
    fn on_conversion_start(&self, format: &str) {
        let _ = format;
    }

    /// Called after each page has been rendered or extracted.
    ///
    /// # Arguments
    /// * `page_num`: 1-indexed page number
    /// * `total_pages`: pages in the document
    fn on_page_complete(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when the destination file has been written.
    fn on_conversion_complete(&self, format: &str, bytes: u64) {
        let _ = (format, bytes);
    }

    /// Called when the conversion failed; `message` is user-facing.
    fn on_conversion_error(&self, format: &str, message: &str) {
        let _ = (format, message);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConverterConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        pages: AtomicUsize,
        completed: Mutex<Option<(String, u64)>>,
        errors: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_page_complete(&self, _page_num: usize, _total_pages: usize) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }

        fn on_conversion_complete(&self, format: &str, bytes: u64) {
            *self.completed.lock().unwrap() = Some((format.to_string(), bytes));
        }

        fn on_conversion_error(&self, _format: &str, _message: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start("png");
        cb.on_page_complete(1, 5);
        cb.on_conversion_complete("png", 42);
        cb.on_conversion_error("png", "boom");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_conversion_start("tiff");
        tracker.on_page_complete(1, 2);
        tracker.on_page_complete(2, 2);
        tracker.on_conversion_complete("tiff", 1024);

        assert_eq!(tracker.pages.load(Ordering::SeqCst), 2);
        assert_eq!(
            *tracker.completed.lock().unwrap(),
            Some(("tiff".to_string(), 1024))
        );
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_conversion_start("txt");
        cb.on_page_complete(1, 1);
    }
}
