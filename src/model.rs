//! Job and processed-file records.
//!
//! A [`Job`] is one folder-level batch request; it owns zero or more
//! [`ProcessedFile`] records, one per document attempt. Both are plain data:
//! the [`crate::store::JobStore`] hands out cloned snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub type JobId = u64;
pub type FileId = u64;

/// Lifecycle of a folder job.
///
/// `pending → processing → completed | failed`, or `pending → no_files`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    NoFiles,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::NoFiles | JobStatus::Completed | JobStatus::Failed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::NoFiles => "no_files",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one document attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Completed,
    Failed,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileStatus::Completed => "completed",
            FileStatus::Failed => "failed",
        })
    }
}

/// One folder-level batch request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Normalised root folder.
    pub folder_path: PathBuf,
    pub uploaded_at: DateTime<Utc>,
    /// Documents found at discovery time.
    pub total_files: usize,
    /// Documents attempted so far (successful or not). Never exceeds `total_files`.
    pub processed_count: usize,
    /// Wall-clock seconds for the whole job, set on completion.
    pub total_processing_time: Option<f64>,
    pub status: JobStatus,
}

/// Immutable record of one document attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedFile {
    pub id: FileId,
    pub job_id: JobId,
    /// Source document.
    pub file_path: PathBuf,
    /// Seconds spent on the document; 0 when it failed.
    pub processing_time: f64,
    pub status: FileStatus,
    pub processed_at: DateTime<Utc>,
}
