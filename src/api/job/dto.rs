use serde::Deserialize;

use super::models::{JobResult, JobStatus};

/// Body of a successful `POST /api/summarize`
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    pub job_id: String,
}

/// Body of `GET /api/summarize/{job_id}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusResponse {
    /// Absent or `null` while the service has not assigned a stage yet.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub text_length: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StatusResponse {
    pub fn job_status(&self) -> JobStatus {
        self.status
            .as_deref()
            .map_or(JobStatus::Queued, JobStatus::from_token)
    }

    pub fn into_result(self, job_id: &str) -> JobResult {
        JobResult {
            job_id: job_id.to_string(),
            summary: self.summary,
            filename: self.filename,
            text_length: self.text_length,
        }
    }
}

/// Optional error body sent along with a non-2xx status
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
}
