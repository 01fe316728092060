pub mod poller;
pub mod upload_progress;

pub use poller::{JobPoller, PollOutcome, PollState};
pub use upload_progress::{UploadProgress, UploadSnapshot};
