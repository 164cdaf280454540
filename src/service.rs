//! Submission, status and download operations over a shared [`JobStore`].
//!
//! [`JobService::submit`] validates a folder synchronously and starts the
//! job on a detached Tokio task; everything after that is observed by
//! polling [`JobService::job_status`].

use crate::config::ExtractionConfig;
use crate::error::Plan2CsvError;
use crate::job::run_job;
use crate::model::{FileId, FileStatus, Job, JobId, JobStatus};
use crate::pipeline::output::output_path_for;
use crate::store::JobStore;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Returned by a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSubmission {
    pub job_id: JobId,
    pub folder_path: PathBuf,
}

/// One file line of a [`JobStatusReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub id: FileId,
    pub path: PathBuf,
    pub csv_path: PathBuf,
    pub processing_time: f64,
    pub status: FileStatus,
}

/// Snapshot of a job and its files.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatusReport {
    pub status: JobStatus,
    pub total_files: usize,
    pub processed_files: usize,
    pub total_processing_time: Option<f64>,
    pub files: Vec<FileReport>,
}

/// An output table ready to be served as an attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvDownload {
    pub filename: String,
    pub content: Vec<u8>,
}

/// Front door for hosts (HTTP server, CLI) driving folder jobs.
#[derive(Debug, Clone)]
pub struct JobService {
    store: Arc<JobStore>,
    config: ExtractionConfig,
}

impl JobService {
    pub fn new(config: ExtractionConfig) -> Self {
        Self::with_store(Arc::new(JobStore::new()), config)
    }

    pub fn with_store(store: Arc<JobStore>, config: ExtractionConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Validate `folder`, create a job and start it in the background.
    ///
    /// Returns as soon as the job exists. Must be called from within a Tokio
    /// runtime.
    pub fn submit(&self, folder: &str) -> Result<JobSubmission, Plan2CsvError> {
        let folder_path = validate_folder(folder)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Plan2CsvError::Internal(format!("No async runtime: {}", e)))?;

        let job = self.store.create_job(folder_path.clone());
        let job_id = job.id;
        info!("Job {} submitted for {}", job_id, folder_path.display());

        let store = Arc::clone(&self.store);
        let config = self.config.clone();
        let worker = runtime.spawn({
            let store = Arc::clone(&store);
            async move { run_job(job_id, &store, &config).await }
        });

        // Supervisor: a panicking run must still leave the job terminal.
        runtime.spawn(async move {
            match worker.await {
                Ok(Ok(summary)) => info!(
                    "Job {} finished: {} ok, {} failed",
                    job_id, summary.succeeded, summary.failed
                ),
                Ok(Err(e)) => error!("Job {} failed: {}", job_id, e),
                Err(e) => {
                    error!("Job {} task crashed: {}", job_id, e);
                    if let Err(e) = store.fail(job_id) {
                        warn!("Could not mark crashed job {} as failed: {}", job_id, e);
                    }
                }
            }
        });

        Ok(JobSubmission {
            job_id,
            folder_path,
        })
    }

    pub fn job_status(&self, id: JobId) -> Result<JobStatusReport, Plan2CsvError> {
        let job = self.store.job(id)?;
        let files = self
            .store
            .files_for(id)
            .into_iter()
            .map(|f| FileReport {
                id: f.id,
                csv_path: output_path_for(&f.file_path),
                path: f.file_path,
                processing_time: f.processing_time,
                status: f.status,
            })
            .collect();

        Ok(JobStatusReport {
            status: job.status,
            total_files: job.total_files,
            processed_files: job.processed_count,
            total_processing_time: job.total_processing_time,
            files,
        })
    }

    /// Read the output table of processed file `file_id`.
    pub async fn download(&self, file_id: FileId) -> Result<CsvDownload, Plan2CsvError> {
        let record = self.store.file(file_id)?;
        let csv_path = output_path_for(&record.file_path);

        let content = tokio::fs::read(&csv_path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => Plan2CsvError::OutputMissing {
                path: csv_path.clone(),
            },
            _ => Plan2CsvError::Io {
                path: csv_path.clone(),
                source: e,
            },
        })?;

        let filename = csv_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "plan.csv".to_string());

        Ok(CsvDownload { filename, content })
    }

    /// Poll job `id` every `poll` until it reaches a terminal status.
    pub async fn wait_for(&self, id: JobId, poll: Duration) -> Result<Job, Plan2CsvError> {
        loop {
            let job = self.store.job(id)?;
            if job.status.is_terminal() {
                return Ok(job);
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// All jobs, newest first.
    pub fn list_jobs(&self) -> Vec<Job> {
        self.store.list_jobs()
    }
}

/// Trim, normalise and check a submitted folder path.
pub fn validate_folder(folder: &str) -> Result<PathBuf, Plan2CsvError> {
    let folder = folder.trim();
    if folder.is_empty() {
        return Err(Plan2CsvError::MissingInput);
    }

    let path = normalize_path(Path::new(folder));
    match std::fs::metadata(&path) {
        Ok(meta) if meta.is_dir() => Ok(path),
        Ok(_) => Err(Plan2CsvError::NotADirectory { path }),
        Err(_) => Err(Plan2CsvError::FolderNotFound { path }),
    }
}

/// Resolve `.` and `..` lexically, without touching the filesystem.
///
/// Relative paths are anchored at the current directory. `..` never climbs
/// above the root.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                ) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn normalize_resolves_dots() {
        assert_eq!(
            normalize_path(Path::new("/data/./plans/../sites/a")),
            PathBuf::from("/data/sites/a")
        );
        assert_eq!(normalize_path(Path::new("/../x")), PathBuf::from("/x"));
        assert!(normalize_path(Path::new("rel")).is_absolute());
    }

    #[test]
    fn blank_input_is_missing() {
        assert!(matches!(validate_folder("   "), Err(Plan2CsvError::MissingInput)));
    }

    #[test]
    fn file_is_not_a_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plan.pdf");
        std::fs::write(&file, b"x").unwrap();
        let err = validate_folder(file.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, Plan2CsvError::NotADirectory { .. }));
    }

    #[test]
    fn nonexistent_folder_is_rejected() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("nope");
        let err = validate_folder(gone.to_str().unwrap()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn validate_trims_and_normalises() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let raw = format!("  {}/sub/../sub/.  ", dir.path().display());
        assert_eq!(validate_folder(&raw).unwrap(), normalize_path(&dir.path().join("sub")));
    }

    #[tokio::test]
    async fn submission_error_creates_no_job() {
        let service = JobService::new(ExtractionConfig::default());
        assert!(service.submit("").is_err());
        assert!(service.list_jobs().is_empty());
    }

    #[tokio::test]
    async fn empty_folder_job_reports_no_files() {
        let dir = TempDir::new().unwrap();
        let service = JobService::new(ExtractionConfig::default());
        let sub = service.submit(dir.path().to_str().unwrap()).unwrap();

        let job = service
            .wait_for(sub.job_id, Duration::from_millis(5))
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::NoFiles);

        let report = service.job_status(sub.job_id).unwrap();
        assert_eq!(report.total_files, 0);
        assert!(report.files.is_empty());
    }

    #[tokio::test]
    async fn crashed_job_task_is_marked_failed() {
        struct Explodes;
        impl crate::progress::JobProgressCallback for Explodes {
            fn on_job_start(&self, _total_files: usize) {
                panic!("callback exploded");
            }
        }

        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("plan.pdf"), b"%PDF").unwrap();
        let config = ExtractionConfig::builder()
            .progress_callback(Arc::new(Explodes))
            .build()
            .unwrap();
        let service = JobService::new(config);
        let sub = service.submit(dir.path().to_str().unwrap()).unwrap();

        let job = service
            .wait_for(sub.job_id, Duration::from_millis(5))
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.total_files, 1);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let service = JobService::new(ExtractionConfig::default());
        assert!(service.job_status(3).unwrap_err().is_not_found());
        assert!(service.download(3).await.unwrap_err().is_not_found());
    }
}
