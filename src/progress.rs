//! Progress-callback trait for per-document job events.
//!
//! Inject an [`Arc<dyn JobProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as a job walks its documents. The authoritative job state lives in
//! [`crate::store::JobStore`]; callbacks are for presentation only (terminal
//! progress bars, log forwarding).
//!
//! # Example
//!
//! ```rust
//! use edgequake_plan2csv::{ExtractionConfig, JobProgressCallback};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl JobProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, index: usize, total: usize, path: &Path, pairs: usize) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} {} → {} pairs", index, total, path.display(), pairs);
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the job runner as it processes each document.
///
/// Documents are processed sequentially, but implementations must still be
/// `Send + Sync`: the runner lives on a background Tokio task. All methods
/// have default no-op implementations.
pub trait JobProgressCallback: Send + Sync {
    /// Called once after discovery found at least one document.
    fn on_job_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called when discovery found nothing to process.
    fn on_no_files(&self, root: &Path) {
        let _ = root;
    }

    /// Called before a document is rasterised.
    ///
    /// `index` is 1-based.
    fn on_document_start(&self, index: usize, total: usize, path: &Path) {
        let _ = (index, total, path);
    }

    /// Called after a document's table was written.
    fn on_document_complete(&self, index: usize, total: usize, path: &Path, pairs: usize) {
        let _ = (index, total, path, pairs);
    }

    /// Called when a document failed.
    fn on_document_error(&self, index: usize, total: usize, path: &Path, error: &str) {
        let _ = (index, total, path, error);
    }

    /// Called once after all documents have been attempted.
    fn on_job_complete(&self, total_files: usize, succeeded: usize) {
        let _ = (total_files, succeeded);
    }

    /// Called when the job aborted before attempting every document.
    fn on_job_failed(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl JobProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn JobProgressCallback>;
