//! # edgequake-plan2csv
//!
//! Batch extraction of X;Y coordinate tables from scanned `plan.pdf` files.
//!
//! Point a job at a folder tree: every `plan.pdf` (any case) underneath it is
//! rasterised, run through OCR, filtered for plausible coordinate values and
//! written as a semicolon-separated `plan.csv` beside the source. Job and
//! per-file progress is tracked in memory for later polling.
//!
//! ## Pipeline Overview
//!
//! ```text
//! folder
//!  │
//!  ├─ 1. Discover  walk the tree for plan.pdf (case-insensitive)
//!  │    for each document, sequentially:
//!  ├─ 2. Render    rasterise pages via pdfium (spawn_blocking)
//!  ├─ 3. OCR       tesseract per page on a bounded, order-preserving pool
//!  ├─ 4. Filter    numbers of 5+ digits, value > 100000, encounter order
//!  ├─ 5. Pair      alternate X,Y; an odd trailing value is dropped
//!  └─ 6. Write     X;Y table, atomic temp + rename
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_plan2csv::{ExtractionConfig, JobService};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder()
//!         .pdfium_lib_path("/opt/pdfium/lib")
//!         .build()?;
//!     let service = JobService::new(config);
//!
//!     let job = service.submit("/data/plans")?;
//!     service.wait_for(job.job_id, Duration::from_millis(500)).await?;
//!
//!     let report = service.job_status(job.job_id)?;
//!     for f in report.files {
//!         println!("{} → {} ({})", f.path.display(), f.csv_path.display(), f.status);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `plan2csv` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `server` | off     | HTTP front end over [`JobService`] (axum) |
//!
//! ## External engines
//!
//! Rendering needs a pdfium shared library (`pdfium_lib_path`, or
//! `PDFIUM_LIB_PATH` for the CLI). Recognition needs the `tesseract` binary
//! with the configured language pack (`fra` by default).

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod job;
pub mod model;
pub mod pipeline;
pub mod progress;
#[cfg(feature = "server")]
pub mod server;
pub mod service;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DecimalSeparator, ExtractionConfig, ExtractionConfigBuilder};
pub use document::{extract_file, process_document, run_document, DocumentReport, DocumentStage};
pub use error::{DocumentError, PageError, Plan2CsvError};
pub use job::{run_job, JobSummary};
pub use model::{FileId, FileStatus, Job, JobId, JobStatus, ProcessedFile};
pub use pipeline::extract::{CoordinateFilter, CoordinatePair};
pub use pipeline::recognize::{OcrDevice, RecognizerOptions, TesseractRecognizer, TextRecognizer};
pub use pipeline::render::{PageRasterizer, PdfiumRasterizer, RasterPage};
pub use progress::{JobProgressCallback, NoopProgressCallback, ProgressCallback};
pub use service::{CsvDownload, FileReport, JobService, JobStatusReport, JobSubmission};
pub use store::JobStore;
