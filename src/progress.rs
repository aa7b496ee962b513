//! Per-image progress events.
//!
//! A [`ConversionProgressCallback`] set on the config is invoked by the
//! composer (one event group per page) and by the record codec (a single
//! image, reported as page 1 of 1). Events are raised on tokio's blocking
//! pool rather than on the awaiting task, hence the `Send + Sync` bound;
//! for a given request they are strictly ordered.
//!
//! # Example
//!
//! ```rust
//! use edgequake_img2pdf::{ConversionConfig, ConversionProgressCallback};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct ByteCounter(AtomicUsize);
//!
//! impl ConversionProgressCallback for ByteCounter {
//!     fn on_page_complete(&self, _page: usize, _total: usize, encoded_len: usize) {
//!         self.0.fetch_add(encoded_len, Ordering::Relaxed);
//!     }
//! }
//!
//! let bytes = Arc::new(ByteCounter::default());
//! let config = ConversionConfig::builder()
//!     .progress_callback(bytes.clone())
//!     .build()
//!     .unwrap();
//! assert!(config.progress_callback.is_some());
//! ```

use std::sync::Arc;

/// Observer of a single conversion request. Every method has an empty
/// default, so implementors only override what they display.
pub trait ConversionProgressCallback: Send + Sync {
    /// The request has a batch of `total_pages` images to encode.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Image `page_num` (1-indexed) is about to be compressed.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Image `page_num` was compressed into `encoded_len` JPEG bytes.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, encoded_len: usize) {
        let _ = (page_num, total_pages, encoded_len);
    }

    /// Image `page_num` failed; no further pages follow.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Encoding stopped after `success_count` of `total_pages` images.
    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// Ignores every event.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Shared callback handle stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct EventLog(Mutex<Vec<String>>);

    impl EventLog {
        fn push(&self, event: String) {
            self.0.lock().unwrap().push(event);
        }
    }

    impl ConversionProgressCallback for EventLog {
        fn on_page_start(&self, page_num: usize, total_pages: usize) {
            self.push(format!("start {page_num}/{total_pages}"));
        }

        fn on_page_complete(&self, page_num: usize, _total_pages: usize, encoded_len: usize) {
            self.push(format!("done {page_num} {encoded_len}"));
        }

        fn on_page_error(&self, page_num: usize, _total_pages: usize, error: &str) {
            self.push(format!("error {page_num} {error}"));
        }
    }

    #[test]
    fn defaults_are_silent() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_conversion_start(2);
        cb.on_page_start(1, 2);
        cb.on_page_complete(1, 2, 42);
        cb.on_page_error(2, 2, "bad image");
        cb.on_conversion_complete(2, 1);
    }

    #[test]
    fn overridden_methods_see_events_in_order() {
        let log = EventLog::default();
        log.on_conversion_start(2);
        log.on_page_start(1, 2);
        log.on_page_complete(1, 2, 100);
        log.on_page_start(2, 2);
        log.on_page_error(2, 2, "zero width");
        log.on_conversion_complete(2, 1);

        assert_eq!(
            *log.0.lock().unwrap(),
            vec!["start 1/2", "done 1 100", "start 2/2", "error 2 zero width"]
        );
    }
}
