use serde::Serialize;
use std::fmt;

/// Status token reported by the summarization service for a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Extracting,
    Processing,
    Summarizing,
    Finalizing,
    Completed,
    Error,
    /// Any token outside the known vocabulary, kept verbatim
    Other(String),
}

impl JobStatus {
    pub fn from_token(token: &str) -> Self {
        match token {
            "queued" => JobStatus::Queued,
            "extracting" => JobStatus::Extracting,
            "processing" => JobStatus::Processing,
            "summarizing" => JobStatus::Summarizing,
            "finalizing" => JobStatus::Finalizing,
            "completed" => JobStatus::Completed,
            "error" => JobStatus::Error,
            other => JobStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Extracting => "extracting",
            JobStatus::Processing => "processing",
            JobStatus::Summarizing => "summarizing",
            JobStatus::Finalizing => "finalizing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
            JobStatus::Other(token) => token,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (percentage, label) pair as shown to the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub percentage: u8,
    pub label: String,
}

impl ProgressSnapshot {
    pub fn new(percentage: u8, label: impl Into<String>) -> Self {
        Self {
            percentage,
            label: label.into(),
        }
    }

    /// The idle baseline: nothing running, nothing to show.
    pub fn idle() -> Self {
        Self::default()
    }
}

/// Payload delivered when a job completes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobResult {
    pub job_id: String,
    pub summary: Option<String>,
    pub filename: Option<String>,
    pub text_length: Option<u64>,
}

/// Client-side view of a job that is being tracked
///
/// Only the poller mutates it. Progress never moves backwards while the job
/// is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub progress: ProgressSnapshot,
    pub terminal: bool,
}

impl Job {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Queued,
            progress: ProgressSnapshot::idle(),
            terminal: false,
        }
    }

    /// Record a new status and its mapped milestone.
    ///
    /// A milestone lower than the current percentage keeps the current
    /// snapshot. Returns whether the visible progress changed.
    pub fn advance(&mut self, status: JobStatus, milestone: ProgressSnapshot) -> bool {
        self.status = status;
        if milestone.percentage < self.progress.percentage || milestone == self.progress {
            return false;
        }
        self.progress = milestone;
        true
    }

    pub fn finish(&mut self, status: JobStatus, progress: ProgressSnapshot) {
        self.status = status;
        self.progress = progress;
        self.terminal = true;
    }
}
