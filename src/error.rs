use thiserror::Error;

pub const MISSING_FILE_MESSAGE: &str = "Please select a PDF file";
pub const INVALID_TYPE_MESSAGE: &str = "Please select a valid PDF file";
pub const OVERSIZED_FILE_MESSAGE: &str = "PDF exceeds the 10 MB limit";

pub const SUBMIT_NON_JSON_MESSAGE: &str =
    "Server error: The server returned an error page. Please try again.";
pub const POLL_NON_JSON_MESSAGE: &str = "Server error: received non-JSON response";
pub const MALFORMED_RESPONSE_MESSAGE: &str = "Server error: received an unexpected response";

pub const SUBMIT_FALLBACK_MESSAGE: &str = "Failed to upload PDF";
pub const STATUS_FALLBACK_MESSAGE: &str = "Failed to get status";
pub const PROCESSING_FALLBACK_MESSAGE: &str = "An error occurred during processing";

pub const TIMEOUT_MESSAGE: &str =
    "Processing took too long. Please try again with a smaller file.";

/// Why a job ended without a result.
///
/// Every variant is terminal for the job it belongs to; nothing here is
/// retried. The `Display` text is what the user gets to see.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobFault {
    /// Missing file, wrong media type or unusable payload. Never reaches the network.
    #[error("{0}")]
    Validation(String),

    /// The service answered with something other than JSON.
    #[error("{0}")]
    Transport(String),

    /// The submission request was rejected.
    #[error("{0}")]
    Submission(String),

    /// A status request was rejected, or the service reported the job as failed.
    #[error("{0}")]
    Poll(String),

    /// The poll budget ran out before the job reached a terminal status.
    #[error("{}", TIMEOUT_MESSAGE)]
    Timeout,

    /// The HTTP exchange could not be completed at all.
    #[error("{0}")]
    Network(String),
}

impl JobFault {
    /// Short tag used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            JobFault::Validation(_) => "validation",
            JobFault::Transport(_) => "transport",
            JobFault::Submission(_) => "submission",
            JobFault::Poll(_) => "poll",
            JobFault::Timeout => "timeout",
            JobFault::Network(_) => "network",
        }
    }
}

/// Failures of the local usage counter storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("usage file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("usage file is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}
