//! Folder-level job runner.
//!
//! Discovery, then each document in turn through
//! [`crate::document::run_document`]. Page-level parallelism happens inside a
//! document; documents themselves are processed sequentially. The runner is
//! the only writer of its job's records in the [`JobStore`].

use crate::config::ExtractionConfig;
use crate::document::{resolve_rasterizer, resolve_recognizer, run_document};
use crate::error::Plan2CsvError;
use crate::model::{FileStatus, JobId};
use crate::pipeline::discover::discover_documents;
use crate::store::JobStore;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, warn};

/// Totals for a finished job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    pub job_id: JobId,
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Wall-clock seconds.
    pub total_processing_time: f64,
}

/// Run job `job_id` to a terminal status.
///
/// Returns `Err` only on a job-wide abort (the job is then `failed`);
/// per-document failures are recorded and counted in the summary.
pub async fn run_job(
    job_id: JobId,
    store: &JobStore,
    config: &ExtractionConfig,
) -> Result<JobSummary, Plan2CsvError> {
    let start = Instant::now();
    let root = store.job(job_id)?.folder_path;
    let callback = config.progress_callback.as_deref();
    info!("Job {}: scanning {}", job_id, root.display());

    // ── Discovery ────────────────────────────────────────────────────────
    let documents = {
        let root = root.clone();
        let target = config.target_file_name.clone();
        tokio::task::spawn_blocking(move || -> Vec<PathBuf> {
            discover_documents(&root, &target).collect()
        })
        .await
        .map_err(|e| Plan2CsvError::Internal(format!("Discovery task panicked: {}", e)))
    };
    let documents = match documents {
        Ok(d) => d,
        Err(e) => return Err(abort(job_id, store, config, e)),
    };

    if documents.is_empty() {
        store.mark_no_files(job_id)?;
        warn!(
            "Job {}: no {} found under {}",
            job_id,
            config.target_file_name,
            root.display()
        );
        if let Some(cb) = callback {
            cb.on_no_files(&root);
        }
        return Ok(JobSummary {
            job_id,
            total_files: 0,
            succeeded: 0,
            failed: 0,
            total_processing_time: start.elapsed().as_secs_f64(),
        });
    }

    let total = documents.len();
    store.begin(job_id, total)?;
    info!("Job {}: {} documents to process", job_id, total);
    if let Some(cb) = callback {
        cb.on_job_start(total);
    }

    // ── Job-lifetime engines ─────────────────────────────────────────────
    let recognizer = match resolve_recognizer(config).await {
        Ok(r) => r,
        Err(e) => return Err(abort(job_id, store, config, e)),
    };
    let rasterizer = resolve_rasterizer(config);

    // ── Documents ────────────────────────────────────────────────────────
    let mut succeeded = 0;
    for (i, path) in documents.into_iter().enumerate() {
        let index = i + 1;
        if let Some(cb) = callback {
            cb.on_document_start(index, total, &path);
        }

        let outcome = run_document(&path, &rasterizer, &recognizer, config).await;

        if let Err(e) = store.record_file(job_id, path.clone(), outcome.processing_time, outcome.status)
        {
            return Err(abort(job_id, store, config, e));
        }

        match outcome.status {
            FileStatus::Completed => {
                succeeded += 1;
                if let Some(cb) = callback {
                    let pairs = outcome.report.as_ref().map_or(0, |r| r.pairs.len());
                    cb.on_document_complete(index, total, &path, pairs);
                }
            }
            FileStatus::Failed => {
                if let Some(cb) = callback {
                    let msg = outcome
                        .error
                        .as_ref()
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "unknown error".to_string());
                    cb.on_document_error(index, total, &path, &msg);
                }
            }
        }
    }

    let elapsed = start.elapsed().as_secs_f64();
    store.complete(job_id, elapsed)?;
    info!(
        "Job {} complete: {}/{} documents in {:.2}s",
        job_id, succeeded, total, elapsed
    );
    if let Some(cb) = callback {
        cb.on_job_complete(total, succeeded);
    }

    Ok(JobSummary {
        job_id,
        total_files: total,
        succeeded,
        failed: total - succeeded,
        total_processing_time: elapsed,
    })
}

/// Mark the job failed and hand the error back for propagation.
fn abort(
    job_id: JobId,
    store: &JobStore,
    config: &ExtractionConfig,
    e: Plan2CsvError,
) -> Plan2CsvError {
    error!("Job {} aborted: {}", job_id, e);
    if let Err(store_err) = store.fail(job_id) {
        warn!("Job {}: could not record failure: {}", job_id, store_err);
    }
    if let Some(cb) = config.progress_callback.as_deref() {
        cb.on_job_failed(&e.to_string());
    }
    e
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DocumentError, PageError};
    use crate::model::JobStatus;
    use crate::pipeline::recognize::{OcrDevice, RecognizerOptions, TextRecognizer};
    use crate::pipeline::render::{PageRasterizer, RasterPage};
    use crate::progress::JobProgressCallback;
    use image::{DynamicImage, RgbaImage};
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    struct OnePage;

    impl PageRasterizer for OnePage {
        fn rasterize(&self, path: &Path) -> Result<Vec<RasterPage>, DocumentError> {
            if !matches!(std::fs::read(path), Ok(b) if b.starts_with(b"%PDF")) {
                return Err(DocumentError::CorruptPdf {
                    path: path.to_path_buf(),
                    detail: "missing header".into(),
                });
            }
            Ok(vec![RasterPage {
                page_num: 1,
                source: path.to_path_buf(),
                image: DynamicImage::ImageRgba8(RgbaImage::new(1, 1)),
            }])
        }
    }

    struct Fixed;

    impl TextRecognizer for Fixed {
        fn recognize(&self, _page: &RasterPage) -> Result<Vec<String>, PageError> {
            Ok(vec!["123456".into(), "654321".into()])
        }
    }

    #[derive(Default)]
    struct Events(Mutex<Vec<String>>);

    impl JobProgressCallback for Events {
        fn on_job_start(&self, total_files: usize) {
            self.0.lock().unwrap().push(format!("start {total_files}"));
        }
        fn on_no_files(&self, _root: &Path) {
            self.0.lock().unwrap().push("none".into());
        }
        fn on_document_complete(&self, index: usize, _total: usize, _path: &Path, pairs: usize) {
            self.0.lock().unwrap().push(format!("ok {index} {pairs}"));
        }
        fn on_document_error(&self, index: usize, _total: usize, _path: &Path, _error: &str) {
            self.0.lock().unwrap().push(format!("err {index}"));
        }
        fn on_job_complete(&self, total_files: usize, succeeded: usize) {
            self.0.lock().unwrap().push(format!("done {succeeded}/{total_files}"));
        }
        fn on_job_failed(&self, _error: &str) {
            self.0.lock().unwrap().push("failed".into());
        }
    }

    fn config(events: Arc<Events>) -> ExtractionConfig {
        ExtractionConfig::builder()
            .rasterizer(Arc::new(OnePage))
            .recognizer(Arc::new(Fixed))
            .progress_callback(events)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn empty_folder_ends_in_no_files() {
        let dir = TempDir::new().unwrap();
        let store = JobStore::new();
        let events = Arc::new(Events::default());
        let job = store.create_job(dir.path().to_path_buf());

        let summary = run_job(job.id, &store, &config(events.clone())).await.unwrap();

        assert_eq!(summary.total_files, 0);
        assert_eq!(store.job(job.id).unwrap().status, JobStatus::NoFiles);
        assert!(store.files_for(job.id).is_empty());
        assert_eq!(*events.0.lock().unwrap(), vec!["none"]);
    }

    #[tokio::test]
    async fn bad_document_does_not_abort_job() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("a")).unwrap();
        std::fs::create_dir_all(dir.path().join("b")).unwrap();
        std::fs::write(dir.path().join("a/plan.pdf"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("b/plan.pdf"), b"garbage").unwrap();

        let store = JobStore::new();
        let events = Arc::new(Events::default());
        let job = store.create_job(dir.path().to_path_buf());
        let summary = run_job(job.id, &store, &config(events.clone())).await.unwrap();

        assert_eq!((summary.succeeded, summary.failed), (1, 1));
        let snap = store.job(job.id).unwrap();
        assert_eq!(snap.status, JobStatus::Completed);
        assert_eq!(snap.processed_count, snap.total_files);
        assert!(snap.total_processing_time.is_some());

        let files = store.files_for(job.id);
        assert_eq!(files.len(), 2);
        let failed = files.iter().find(|f| f.status == FileStatus::Failed).unwrap();
        assert!(failed.file_path.ends_with("b/plan.pdf"));
        assert_eq!(failed.processing_time, 0.0);

        let log = events.0.lock().unwrap();
        assert_eq!(log.first().map(String::as_str), Some("start 2"));
        assert_eq!(log.last().map(String::as_str), Some("done 1/2"));
    }

    #[tokio::test]
    async fn unavailable_recognizer_fails_the_job() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("plan.pdf"), b"%PDF-1.4").unwrap();

        let store = JobStore::new();
        let events = Arc::new(Events::default());
        let config = ExtractionConfig::builder()
            .rasterizer(Arc::new(OnePage))
            .ocr(RecognizerOptions {
                device: OcrDevice::Gpu,
                ..RecognizerOptions::default()
            })
            .progress_callback(events.clone())
            .build()
            .unwrap();
        let job = store.create_job(dir.path().to_path_buf());

        let err = run_job(job.id, &store, &config).await.unwrap_err();

        assert!(matches!(err, Plan2CsvError::RecognizerUnavailable { .. }));
        let snap = store.job(job.id).unwrap();
        assert_eq!(snap.status, JobStatus::Failed);
        assert_eq!(snap.processed_count, 0);
        assert!(store.files_for(job.id).is_empty());
        assert_eq!(events.0.lock().unwrap().last().map(String::as_str), Some("failed"));
    }

    #[tokio::test]
    async fn unknown_job_is_an_error() {
        let store = JobStore::new();
        let err = run_job(42, &store, &ExtractionConfig::default()).await.unwrap_err();
        assert!(matches!(err, Plan2CsvError::JobNotFound { id: 42 }));
    }
}
