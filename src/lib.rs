//! Client for an asynchronous PDF summarization service.
//!
//! Submits a document, estimates upload progress while the request is in
//! flight, polls the job's status on a fixed interval and reports one
//! terminal outcome. A small persisted usage counter limits how many jobs a
//! client may submit.
//!
//! ```no_run
//! use summarize_client::{
//!     FileUsageStore, HttpSummarizeApi, JobOutcome, JobService, JobSettings, PdfUpload,
//!     QuotaGuard,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let api = HttpSummarizeApi::new("https://summaries.example.com");
//! let quota = QuotaGuard::new(FileUsageStore::new("data/usage.json"), 3);
//! let service = JobService::new(api, quota, JobSettings::default());
//!
//! let upload = PdfUpload::from_path("paper.pdf".as_ref()).await?;
//! match service.submit(Some(upload)).await {
//!     JobOutcome::Completed(result) => println!("{}", result.summary.unwrap_or_default()),
//!     other => eprintln!("{other:?}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod display;
pub mod error;
pub mod quota;
pub mod shutdown;
pub mod storage;
pub mod worker;

pub use api::client::{ApiError, HttpSummarizeApi, SummarizeApi};
pub use api::job::{ClientState, JobOutcome, JobResult, JobService, JobSettings, ProgressSnapshot};
pub use api::validation::PdfUpload;
pub use config::Config;
pub use error::{JobFault, StorageError};
pub use quota::QuotaGuard;
pub use storage::{FileUsageStore, MemoryUsageStore, UsageStore};
