//! Single-document pipeline: rasterise → recognise → pair → write.
//!
//! [`process_document`] is the fallible core; [`run_document`] wraps it for
//! the job loop so that no per-document error ever escapes into the job.
//! [`extract_file`] is the standalone entry point used for one PDF outside
//! any job.

use crate::config::ExtractionConfig;
use crate::error::{DocumentError, Plan2CsvError};
use crate::model::FileStatus;
use crate::pipeline::extract::{pair_coordinates, CoordinateFilter, CoordinatePair};
use crate::pipeline::output::{format_table, output_path_for, write_table};
use crate::pipeline::pages::process_pages;
use crate::pipeline::recognize::{TesseractRecognizer, TextRecognizer};
use crate::pipeline::render::{render_document, PageRasterizer, PdfiumRasterizer};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Where a document is in its pipeline. Logged at `debug` on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStage {
    Pending,
    Rasterizing,
    Recognizing,
    Pairing,
    Writing,
    Completed,
    Failed,
}

impl fmt::Display for DocumentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentStage::Pending => "pending",
            DocumentStage::Rasterizing => "rasterizing",
            DocumentStage::Recognizing => "recognizing",
            DocumentStage::Pairing => "pairing",
            DocumentStage::Writing => "writing",
            DocumentStage::Completed => "completed",
            DocumentStage::Failed => "failed",
        })
    }
}

fn enter(path: &Path, stage: DocumentStage) {
    debug!("{} → {}", path.display(), stage);
}

/// Result of a successfully processed document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub source: PathBuf,
    pub csv_path: PathBuf,
    /// Pages rendered.
    pub pages: usize,
    /// Qualifying values found before pairing.
    pub values: usize,
    pub pairs: Vec<CoordinatePair>,
    #[serde(with = "secs")]
    pub elapsed: Duration,
}

mod secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}

/// What the job loop records for one document attempt.
#[derive(Debug)]
pub struct DocumentOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
    /// Seconds; 0 for a failed document.
    pub processing_time: f64,
    pub report: Option<DocumentReport>,
    pub error: Option<DocumentError>,
}

/// Run the whole pipeline on one document.
pub async fn process_document(
    path: &Path,
    rasterizer: &Arc<dyn PageRasterizer>,
    recognizer: &Arc<dyn TextRecognizer>,
    config: &ExtractionConfig,
) -> Result<DocumentReport, DocumentError> {
    let start = Instant::now();
    enter(path, DocumentStage::Pending);

    enter(path, DocumentStage::Rasterizing);
    let pages = render_document(rasterizer, path).await?;
    let page_count = pages.len();

    enter(path, DocumentStage::Recognizing);
    let filter = CoordinateFilter::new(config.min_coordinate);
    let values = process_pages(pages, recognizer, filter, config.workers).await;

    enter(path, DocumentStage::Pairing);
    if values.len() % 2 == 1 {
        debug!(
            "{}: odd value count ({}), dropping trailing {}",
            path.display(),
            values.len(),
            values[values.len() - 1]
        );
    }
    let pairs = pair_coordinates(&values);

    enter(path, DocumentStage::Writing);
    let csv_path = output_path_for(path);
    write_table(&csv_path, &format_table(&pairs, config.decimal_separator)).await?;

    let elapsed = start.elapsed();
    enter(path, DocumentStage::Completed);
    info!(
        "{}: {} pages, {} pairs → {} in {:.2}s",
        path.display(),
        page_count,
        pairs.len(),
        csv_path.display(),
        elapsed.as_secs_f64()
    );

    Ok(DocumentReport {
        source: path.to_path_buf(),
        csv_path,
        pages: page_count,
        values: values.len(),
        pairs,
        elapsed,
    })
}

/// [`process_document`] with every error contained in the outcome.
pub async fn run_document(
    path: &Path,
    rasterizer: &Arc<dyn PageRasterizer>,
    recognizer: &Arc<dyn TextRecognizer>,
    config: &ExtractionConfig,
) -> DocumentOutcome {
    match process_document(path, rasterizer, recognizer, config).await {
        Ok(report) => DocumentOutcome {
            path: path.to_path_buf(),
            status: FileStatus::Completed,
            processing_time: report.elapsed.as_secs_f64(),
            report: Some(report),
            error: None,
        },
        Err(e) => {
            enter(path, DocumentStage::Failed);
            error!("Error processing {}: {}", path.display(), e);
            DocumentOutcome {
                path: path.to_path_buf(),
                status: FileStatus::Failed,
                processing_time: 0.0,
                report: None,
                error: Some(e),
            }
        }
    }
}

/// The configured rasterizer, or pdfium at `config.pdfium_lib_path`.
pub fn resolve_rasterizer(config: &ExtractionConfig) -> Arc<dyn PageRasterizer> {
    match config.rasterizer {
        Some(ref r) => Arc::clone(r),
        None => Arc::new(PdfiumRasterizer::from_config(config)),
    }
}

/// The configured recognizer, or a tesseract engine built from `config.ocr`.
///
/// Building the engine probes an external binary, so it runs on the
/// blocking pool.
pub async fn resolve_recognizer(
    config: &ExtractionConfig,
) -> Result<Arc<dyn TextRecognizer>, Plan2CsvError> {
    if let Some(ref r) = config.recognizer {
        return Ok(Arc::clone(r));
    }

    let options = config.ocr.clone();
    let engine = tokio::task::spawn_blocking(move || TesseractRecognizer::new(options))
        .await
        .map_err(|e| Plan2CsvError::Internal(format!("OCR probe task panicked: {}", e)))??;
    Ok(Arc::new(engine))
}

/// Extract coordinates from a single PDF and write its table beside it.
///
/// Unlike a job, a failure here is returned to the caller.
pub async fn extract_file(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<DocumentReport, Plan2CsvError> {
    let path = path.as_ref();
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|source| Plan2CsvError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    if meta.is_dir() {
        return Err(Plan2CsvError::InvalidConfig(format!(
            "'{}' is a directory; submit it as a job instead",
            path.display()
        )));
    }

    let rasterizer = resolve_rasterizer(config);
    let recognizer = resolve_recognizer(config).await?;
    Ok(process_document(path, &rasterizer, &recognizer, config).await?)
}
