use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::models::{JobResult, ProgressSnapshot};
use super::status::COMPLETE;
use crate::api::client::{ApiError, SummarizeApi};
use crate::api::validation::{PdfUpload, DEFAULT_MAX_UPLOAD_SIZE};
use crate::error::{
    JobFault, MALFORMED_RESPONSE_MESSAGE, MISSING_FILE_MESSAGE, SUBMIT_FALLBACK_MESSAGE,
    SUBMIT_NON_JSON_MESSAGE,
};
use crate::quota::QuotaGuard;
use crate::storage::UsageStore;
use crate::worker::poller::{JobPoller, PollOutcome, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL};
use crate::worker::upload_progress::{UploadProgress, UploadSnapshot, DEFAULT_UPLOAD_TICK};

pub const UPLOADING_LABEL: &str = "Uploading file...";

/// Timing and size knobs for the job lifecycle
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    pub upload_tick: Duration,
    pub max_upload_size: usize,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            upload_tick: DEFAULT_UPLOAD_TICK,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        }
    }
}

/// What the client currently shows
///
/// The default value is the idle baseline every fault returns to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientState {
    pub loading: bool,
    pub job_id: Option<String>,
    pub progress: ProgressSnapshot,
    pub upload: UploadSnapshot,
    pub error: Option<String>,
}

/// Single terminal result of a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed(JobResult),
    /// Nothing was sent; the user has to upgrade first.
    QuotaExceeded { used: u64, limit: u64 },
    Failed(JobFault),
    /// Abandoned for a newer submission or because the client is shutting down.
    Cancelled,
}

/// Job submission orchestrator
///
/// # Business Logic
/// - Gates on the usage quota, then validates the upload
/// - Uploads while the cosmetic upload estimate ticks
/// - Counts the submission and polls the job to a terminal state
///
/// At most one job is tracked at a time: starting a new one cancels the
/// previous job's token, which stops its upload timer and poll loop. State
/// updates from a job that is no longer current are dropped.
pub struct JobService<A, S> {
    api: A,
    quota: QuotaGuard<S>,
    settings: JobSettings,
    shutdown: CancellationToken,
    active: Mutex<Option<CancellationToken>>,
    generation: AtomicU64,
    state: watch::Sender<ClientState>,
}

impl<A: SummarizeApi, S: UsageStore> JobService<A, S> {
    /// Create a new JobService instance
    pub fn new(api: A, quota: QuotaGuard<S>, settings: JobSettings) -> Self {
        Self::with_shutdown(api, quota, settings, CancellationToken::new())
    }

    /// Like [`JobService::new`], with every job token derived from `shutdown`.
    pub fn with_shutdown(
        api: A,
        quota: QuotaGuard<S>,
        settings: JobSettings,
        shutdown: CancellationToken,
    ) -> Self {
        let (state, _) = watch::channel(ClientState::default());
        Self {
            api,
            quota,
            settings,
            shutdown,
            active: Mutex::new(None),
            generation: AtomicU64::new(0),
            state,
        }
    }

    pub fn state(&self) -> ClientState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ClientState> {
        self.state.subscribe()
    }

    pub fn quota(&self) -> &QuotaGuard<S> {
        &self.quota
    }

    /// Submit a document and follow the job to its end.
    pub async fn submit(&self, upload: Option<PdfUpload>) -> JobOutcome {
        if !self.quota.check_and_maybe_block() {
            let used = self.quota.usage();
            let limit = self.quota.limit();
            warn!("Submission blocked: {}/{} submissions used", used, limit);
            return JobOutcome::QuotaExceeded { used, limit };
        }

        let Some(upload) = upload else {
            return Self::reject(JobFault::Validation(MISSING_FILE_MESSAGE.to_string()));
        };
        if let Err(fault) = upload.check(self.settings.max_upload_size) {
            return Self::reject(fault);
        }

        let (generation, cancel) = self
            .begin_job(ClientState {
                loading: true,
                progress: ProgressSnapshot::new(0, UPLOADING_LABEL),
                ..ClientState::default()
            })
            .await;
        info!("Submitting {} ({} bytes)", upload.file_name, upload.size());

        let mut upload_progress = UploadProgress::new();
        let submitted = tokio::select! {
            biased;
            _ = cancel.cancelled() => return self.finish(generation, JobOutcome::Cancelled).await,
            reply = upload_progress.track(
                self.api.submit(&upload),
                self.settings.upload_tick,
                |snapshot| self.update(generation, |state| state.upload = snapshot),
            ) => reply,
        };

        let job_id = match submitted {
            Ok(response) if !response.job_id.is_empty() => response.job_id,
            Ok(_) => {
                let fault = JobFault::Submission(SUBMIT_FALLBACK_MESSAGE.to_string());
                return self.finish(generation, JobOutcome::Failed(fault)).await;
            }
            Err(err) => {
                let fault = submission_fault(err);
                return self.finish(generation, JobOutcome::Failed(fault)).await;
            }
        };

        let used = self.quota.record_usage();
        info!(
            "Job {} accepted for {} ({}/{} submissions used)",
            job_id,
            upload.file_name,
            used,
            self.quota.limit()
        );

        self.poll(generation, &cancel, &job_id).await
    }

    /// Follow a job that was submitted earlier. Does not touch the quota.
    pub async fn track(&self, job_id: &str) -> JobOutcome {
        let (generation, cancel) = self
            .begin_job(ClientState {
                loading: true,
                ..ClientState::default()
            })
            .await;
        self.poll(generation, &cancel, job_id).await
    }

    /// Abandon whatever job is currently running.
    pub async fn cancel_active(&self) {
        if let Some(token) = self.active.lock().await.take() {
            token.cancel();
        }
    }

    // ---- private helpers ----

    async fn poll(&self, generation: u64, cancel: &CancellationToken, job_id: &str) -> JobOutcome {
        self.update(generation, |state| state.job_id = Some(job_id.to_string()));

        let mut poller = JobPoller::new(self.settings.poll_interval, self.settings.max_poll_attempts);
        let outcome = poller
            .run(&self.api, job_id, cancel, |progress| {
                self.update(generation, |state| state.progress = progress.clone())
            })
            .await;

        let outcome = match outcome {
            PollOutcome::Completed(result) => JobOutcome::Completed(result),
            PollOutcome::Errored(fault) => JobOutcome::Failed(fault),
            PollOutcome::TimedOut => JobOutcome::Failed(JobFault::Timeout),
            PollOutcome::Cancelled => JobOutcome::Cancelled,
        };
        self.finish(generation, outcome).await
    }

    /// Make a fresh job current, cancelling the one it replaces.
    ///
    /// The generation bump and the switch to `initial` happen in one write
    /// to the state channel, so no update from the old job can land after it.
    async fn begin_job(&self, initial: ClientState) -> (u64, CancellationToken) {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            info!("Abandoning the previous job for a new one");
            previous.cancel();
        }

        let token = self.shutdown.child_token();
        let mut generation = 0;
        self.state.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = initial;
        });
        *active = Some(token.clone());
        (generation, token)
    }

    async fn finish(&self, generation: u64, outcome: JobOutcome) -> JobOutcome {
        match &outcome {
            JobOutcome::Completed(result) => {
                info!("Job {} finished", result.job_id);
                let (percentage, label) = COMPLETE;
                self.update(generation, |state| {
                    state.loading = false;
                    state.job_id = None;
                    state.progress = ProgressSnapshot::new(percentage, label);
                    state.error = None;
                });
            }
            JobOutcome::Failed(fault) => {
                error!("Job failed ({}): {}", fault.kind(), fault);
                self.update(generation, |state| {
                    *state = ClientState {
                        error: Some(fault.to_string()),
                        ..ClientState::default()
                    };
                });
            }
            JobOutcome::Cancelled => {
                self.update(generation, |state| *state = ClientState::default());
            }
            JobOutcome::QuotaExceeded { .. } => {}
        }

        let mut active = self.active.lock().await;
        if self.generation.load(Ordering::SeqCst) == generation {
            active.take();
        }
        drop(active);
        outcome
    }

    /// Apply `change` only while `generation` is still the current job.
    fn update(&self, generation: u64, change: impl FnOnce(&mut ClientState)) {
        self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            change(state);
            true
        });
    }

    fn reject(fault: JobFault) -> JobOutcome {
        warn!("Submission rejected locally: {}", fault);
        JobOutcome::Failed(fault)
    }
}

fn submission_fault(err: ApiError) -> JobFault {
    match err {
        ApiError::NonJson { .. } => JobFault::Transport(SUBMIT_NON_JSON_MESSAGE.to_string()),
        err @ ApiError::Rejected { .. } => JobFault::Submission(err.detail_or(SUBMIT_FALLBACK_MESSAGE)),
        ApiError::Network(message) => JobFault::Network(message),
        ApiError::Decode(detail) => {
            error!("Submission response could not be decoded: {}", detail);
            JobFault::Transport(MALFORMED_RESPONSE_MESSAGE.to_string())
        }
    }
}
