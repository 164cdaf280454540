//! Error types for the edgequake-plan2csv library.
//!
//! Three error types reflect three scopes of failure:
//!
//! * [`Plan2CsvError`]: **Fatal** for the operation that returned it: a bad
//!   folder at submission, an unknown job or file identifier, or a job-wide
//!   abort such as an OCR engine that cannot be constructed.
//!
//! * [`DocumentError`]: **Non-fatal** for the job: one document could not
//!   be rasterised or its table could not be written. The job records the
//!   document as `failed` and moves on to the next one.
//!
//! * [`PageError`]: **Non-fatal** for the document: recognition failed on a
//!   single page. That page contributes no numbers; the rest of the document
//!   is still paired and written.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-plan2csv library.
#[derive(Debug, Error)]
pub enum Plan2CsvError {
    // ── Submission (validation) errors ────────────────────────────────────
    /// No folder path was supplied, or it was blank.
    #[error("No folder path supplied.\nSelect a folder containing plan.pdf files.")]
    MissingInput,

    /// The folder does not exist or is not accessible.
    #[error("Folder '{path}' does not exist or is not accessible")]
    FolderNotFound { path: PathBuf },

    /// The path exists but is not a directory.
    #[error("'{path}' is not a directory")]
    NotADirectory { path: PathBuf },

    // ── Lookup errors ─────────────────────────────────────────────────────
    /// No job with this identifier.
    #[error("Job {id} not found")]
    JobNotFound { id: u64 },

    /// No processed-file record with this identifier.
    #[error("Processed file {id} not found")]
    FileNotFound { id: u64 },

    /// The record exists but its output table is no longer on disk.
    #[error("CSV file '{path}' does not exist")]
    OutputMissing { path: PathBuf },

    // ── Job-wide errors ───────────────────────────────────────────────────
    /// The OCR engine could not be constructed for this job.
    #[error("OCR engine unavailable: {detail}\nInstall tesseract and the configured language pack.")]
    RecognizerUnavailable { detail: String },

    /// A standalone single-document extraction failed.
    #[error(transparent)]
    Document(#[from] DocumentError),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Reading a file failed for a reason other than absence.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Plan2CsvError {
    /// True for unknown identifiers and missing outputs.
    ///
    /// Front ends map these to a not-found response rather than a server error.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Plan2CsvError::JobNotFound { .. }
                | Plan2CsvError::FileNotFound { .. }
                | Plan2CsvError::OutputMissing { .. }
        )
    }

    /// True for errors raised while validating a submission.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Plan2CsvError::MissingInput
                | Plan2CsvError::FolderNotFound { .. }
                | Plan2CsvError::NotADirectory { .. }
        )
    }
}

/// A failure confined to one document.
///
/// Stored as the document's `failed` status; the job continues.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// No rendering-engine location was configured.
    #[error("PDF rendering engine not configured.\nSet PDFIUM_LIB_PATH=/path/to/libpdfium.")]
    EngineNotConfigured,

    /// pdfium could not be loaded from the configured location.
    #[error("Failed to bind to pdfium library at '{path}': {detail}")]
    PdfiumBindingFailed { path: PathBuf, detail: String },

    /// The document could not be opened or parsed.
    #[error("PDF '{path}' is corrupt or unreadable: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// pdfium returned an error for a specific page.
    #[error("Rasterisation failed for page {page} of '{path}': {detail}")]
    RasterisationFailed {
        path: PathBuf,
        page: usize,
        detail: String,
    },

    /// Could not create or write the output table.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error (e.g. a panicked blocking task).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The recognizer failed on this page.
    #[error("Page {page}: text recognition failed: {detail}")]
    RecognitionFailed { page: usize, detail: String },

    /// The worker processing this page panicked.
    #[error("Page {page}: recognition worker panicked: {detail}")]
    WorkerPanicked { page: usize, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_not_found_display() {
        let e = Plan2CsvError::FolderNotFound {
            path: PathBuf::from("/data/plans"),
        };
        assert!(e.to_string().contains("/data/plans"), "got: {e}");
        assert!(e.is_validation());
        assert!(!e.is_not_found());
    }

    #[test]
    fn lookup_errors_are_not_found() {
        assert!(Plan2CsvError::JobNotFound { id: 7 }.is_not_found());
        assert!(Plan2CsvError::FileNotFound { id: 3 }.is_not_found());
        assert!(Plan2CsvError::OutputMissing {
            path: PathBuf::from("plan.csv")
        }
        .is_not_found());
        assert!(!Plan2CsvError::MissingInput.is_not_found());
    }

    #[test]
    fn rasterisation_display_names_page() {
        let e = DocumentError::RasterisationFailed {
            path: PathBuf::from("a/plan.pdf"),
            page: 4,
            detail: "bad xref".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 4"), "got: {msg}");
        assert!(msg.contains("bad xref"));
    }

    #[test]
    fn page_error_display() {
        let e = PageError::RecognitionFailed {
            page: 2,
            detail: "exit status 1".into(),
        };
        assert!(e.to_string().starts_with("Page 2"));
    }
}
