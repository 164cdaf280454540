//! In-memory job store: single writer per job, many concurrent readers.
//!
//! Only a job's background task mutates that job and appends its file
//! records. Readers (status polling, downloads) take the read lock and get
//! cloned snapshots, so they never hold the lock across an `.await`.
//! Between two writes a reader may see e.g. `processed_count` advanced
//! before `status` changes; each individual write is atomic.

use crate::error::Plan2CsvError;
use crate::model::{FileId, FileStatus, Job, JobId, JobStatus, ProcessedFile};
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Debug, Default)]
struct Inner {
    last_job_id: JobId,
    last_file_id: FileId,
    jobs: BTreeMap<JobId, Job>,
    files: Vec<ProcessedFile>,
}

/// Thread-safe registry of jobs and their processed files.
#[derive(Debug, Default)]
pub struct JobStore {
    inner: RwLock<Inner>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new `pending` job for `folder_path`.
    pub fn create_job(&self, folder_path: PathBuf) -> Job {
        let mut inner = self.write();
        inner.last_job_id += 1;
        let job = Job {
            id: inner.last_job_id,
            folder_path,
            uploaded_at: Utc::now(),
            total_files: 0,
            processed_count: 0,
            total_processing_time: None,
            status: JobStatus::Pending,
        };
        inner.jobs.insert(job.id, job.clone());
        debug!("Created job {} for {}", job.id, job.folder_path.display());
        job
    }

    fn update<T>(
        &self,
        id: JobId,
        f: impl FnOnce(&mut Job) -> T,
    ) -> Result<T, Plan2CsvError> {
        let mut inner = self.write();
        let job = inner
            .jobs
            .get_mut(&id)
            .ok_or(Plan2CsvError::JobNotFound { id })?;
        Ok(f(job))
    }

    /// Discovery found `total_files` documents; processing starts.
    pub fn begin(&self, id: JobId, total_files: usize) -> Result<(), Plan2CsvError> {
        self.update(id, |job| {
            job.total_files = total_files;
            job.processed_count = 0;
            job.status = JobStatus::Processing;
        })
    }

    /// Discovery found nothing; terminal.
    pub fn mark_no_files(&self, id: JobId) -> Result<(), Plan2CsvError> {
        self.update(id, |job| {
            job.total_files = 0;
            job.status = JobStatus::NoFiles;
        })
    }

    /// Append the record of one document attempt and advance the counter,
    /// under a single write lock.
    pub fn record_file(
        &self,
        job_id: JobId,
        file_path: PathBuf,
        processing_time: f64,
        status: FileStatus,
    ) -> Result<ProcessedFile, Plan2CsvError> {
        let mut inner = self.write();
        let job = inner
            .jobs
            .get_mut(&job_id)
            .ok_or(Plan2CsvError::JobNotFound { id: job_id })?;
        job.processed_count = (job.processed_count + 1).min(job.total_files);

        inner.last_file_id += 1;
        let record = ProcessedFile {
            id: inner.last_file_id,
            job_id,
            file_path,
            processing_time,
            status,
            processed_at: Utc::now(),
        };
        inner.files.push(record.clone());
        Ok(record)
    }

    /// Every document was attempted; terminal.
    pub fn complete(&self, id: JobId, total_processing_time: f64) -> Result<(), Plan2CsvError> {
        self.update(id, |job| {
            job.total_processing_time = Some(total_processing_time);
            job.status = JobStatus::Completed;
        })
    }

    /// Abort a job that has not reached a terminal status.
    ///
    /// Returns `false` when the job had already finished.
    pub fn fail(&self, id: JobId) -> Result<bool, Plan2CsvError> {
        self.update(id, |job| {
            if job.status.is_terminal() {
                false
            } else {
                job.status = JobStatus::Failed;
                true
            }
        })
    }

    pub fn job(&self, id: JobId) -> Result<Job, Plan2CsvError> {
        self.read()
            .jobs
            .get(&id)
            .cloned()
            .ok_or(Plan2CsvError::JobNotFound { id })
    }

    /// File records of a job, in creation order.
    pub fn files_for(&self, job_id: JobId) -> Vec<ProcessedFile> {
        self.read()
            .files
            .iter()
            .filter(|f| f.job_id == job_id)
            .cloned()
            .collect()
    }

    pub fn file(&self, id: FileId) -> Result<ProcessedFile, Plan2CsvError> {
        // Ids are dense and start at 1.
        let inner = self.read();
        id.checked_sub(1)
            .and_then(|i| inner.files.get(i as usize))
            .filter(|f| f.id == id)
            .cloned()
            .ok_or(Plan2CsvError::FileNotFound { id })
    }

    /// All jobs, newest first.
    pub fn list_jobs(&self) -> Vec<Job> {
        self.read().jobs.values().rev().cloned().collect()
    }
}
