pub mod dto;
pub mod models;
pub mod service;
pub mod status;

// Re-export commonly used types
pub use models::{Job, JobResult, JobStatus, ProgressSnapshot};
pub use service::{ClientState, JobOutcome, JobService, JobSettings};
pub use status::map_status;
