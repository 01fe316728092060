use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::client::{ApiError, SummarizeApi};
use crate::api::job::dto::StatusResponse;
use crate::api::job::models::{Job, JobResult, JobStatus, ProgressSnapshot};
use crate::api::job::status::{map_status, COMPLETE};
use crate::error::{
    JobFault, MALFORMED_RESPONSE_MESSAGE, POLL_NON_JSON_MESSAGE, PROCESSING_FALLBACK_MESSAGE,
    STATUS_FALLBACK_MESSAGE,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// 600 polls at one per second is roughly ten minutes.
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling { attempts: u32 },
    Completed,
    Errored,
    TimedOut,
}

/// How a poll loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed(JobResult),
    Errored(JobFault),
    TimedOut,
    /// Abandoned before reaching a terminal status.
    Cancelled,
}

/// Result of feeding one status reply into the poller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep {
    /// Still running; this is the progress to publish.
    Continue(ProgressSnapshot),
    Finished(PollOutcome),
}

/// Tracks one job from its identifier to a terminal state
///
/// `start` and `handle` hold the transition logic and do no I/O; `run`
/// drives them with the API and the tokio timer. The cancellation token is
/// checked at every suspension point.
pub struct JobPoller {
    interval: Duration,
    max_attempts: u32,
    state: PollState,
    job: Option<Job>,
    polls: u32,
}

impl JobPoller {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            state: PollState::Idle,
            job: None,
            polls: 0,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    /// Status replies handled for the current job, terminal one included.
    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub fn attempts(&self) -> u32 {
        match self.state {
            PollState::Polling { attempts } => attempts,
            _ => 0,
        }
    }

    /// Idle -> Polling. The returned milestone is the "Job Created" signal.
    pub fn start(&mut self, job_id: &str) -> ProgressSnapshot {
        let mut job = Job::new(job_id);
        let created = map_status(&JobStatus::Queued, true);
        job.advance(JobStatus::Queued, created.clone());

        self.job = Some(job);
        self.state = PollState::Polling { attempts: 0 };
        self.polls = 0;
        created
    }

    pub fn budget_exhausted(&self) -> bool {
        self.attempts() >= self.max_attempts
    }

    /// Apply one status reply.
    pub fn handle(&mut self, reply: Result<StatusResponse, ApiError>) -> PollStep {
        let PollState::Polling { attempts } = self.state else {
            return PollStep::Finished(self.fail(JobFault::Poll("no job is being polled".into())));
        };
        self.polls += 1;

        let body = match reply {
            Ok(body) => body,
            Err(ApiError::NonJson { .. }) => {
                return PollStep::Finished(self.fail(JobFault::Transport(
                    POLL_NON_JSON_MESSAGE.to_string(),
                )));
            }
            Err(err @ ApiError::Rejected { .. }) => {
                return PollStep::Finished(
                    self.fail(JobFault::Poll(err.detail_or(STATUS_FALLBACK_MESSAGE))),
                );
            }
            Err(ApiError::Network(message)) => {
                return PollStep::Finished(self.fail(JobFault::Network(message)));
            }
            Err(ApiError::Decode(detail)) => {
                error!("Status body for job {} could not be decoded: {}", self.job_id(), detail);
                return PollStep::Finished(self.fail(JobFault::Transport(
                    MALFORMED_RESPONSE_MESSAGE.to_string(),
                )));
            }
        };

        let status = body.job_status();
        if !status.is_terminal() {
            let milestone = map_status(&status, false);
            let job = self.job.get_or_insert_with(|| Job::new(""));
            if !job.advance(status, milestone) {
                debug!(
                    "Job {} reported {}, keeping {}%",
                    job.id, job.status, job.progress.percentage
                );
            }
            self.state = PollState::Polling {
                attempts: attempts + 1,
            };
            return PollStep::Continue(job.progress.clone());
        }

        if status == JobStatus::Completed {
            let (percentage, label) = COMPLETE;
            let job_id = self.job_id().to_string();
            if let Some(job) = self.job.as_mut() {
                job.finish(status, ProgressSnapshot::new(percentage, label));
            }
            self.state = PollState::Completed;
            return PollStep::Finished(PollOutcome::Completed(body.into_result(&job_id)));
        }

        let message = body
            .error
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| PROCESSING_FALLBACK_MESSAGE.to_string());
        PollStep::Finished(self.fail(JobFault::Poll(message)))
    }

    /// Poll `job_id` until it reaches a terminal status, the budget runs out,
    /// or `cancel` fires. Every published snapshot goes through `on_progress`,
    /// including the final 100 on completion.
    pub async fn run<A: SummarizeApi + ?Sized>(
        &mut self,
        api: &A,
        job_id: &str,
        cancel: &CancellationToken,
        mut on_progress: impl FnMut(&ProgressSnapshot),
    ) -> PollOutcome {
        info!(
            "Polling job {} every {:?} (max {} attempts)",
            job_id, self.interval, self.max_attempts
        );
        on_progress(&self.start(job_id));

        loop {
            if self.budget_exhausted() {
                warn!("Job {} still running after {} polls, giving up", job_id, self.max_attempts);
                self.state = PollState::TimedOut;
                if let Some(job) = self.job.as_mut() {
                    job.terminal = true;
                }
                return PollOutcome::TimedOut;
            }

            let reply = tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.abandon(),
                reply = api.job_status(job_id) => reply,
            };

            match self.handle(reply) {
                PollStep::Finished(outcome) => {
                    match &outcome {
                        PollOutcome::Completed(_) => {
                            info!("Job {} completed after {} polls", job_id, self.polls);
                            if let Some(job) = &self.job {
                                on_progress(&job.progress);
                            }
                        }
                        PollOutcome::Errored(fault) => {
                            error!("Job {} failed ({}): {}", job_id, fault.kind(), fault);
                        }
                        PollOutcome::TimedOut | PollOutcome::Cancelled => {}
                    }
                    return outcome;
                }
                PollStep::Continue(progress) => {
                    debug!(
                        "Job {} poll {}: {}% {}",
                        job_id,
                        self.attempts(),
                        progress.percentage,
                        progress.label
                    );
                    on_progress(&progress);
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.abandon(),
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    // ---- private helpers ----

    fn job_id(&self) -> &str {
        self.job.as_ref().map(|job| job.id.as_str()).unwrap_or_default()
    }

    fn fail(&mut self, fault: JobFault) -> PollOutcome {
        if let Some(job) = self.job.as_mut() {
            job.finish(JobStatus::Error, ProgressSnapshot::idle());
        }
        self.state = PollState::Errored;
        PollOutcome::Errored(fault)
    }

    fn abandon(&mut self) -> PollOutcome {
        info!("Stopped polling job {}", self.job_id());
        self.state = PollState::Idle;
        self.job = None;
        PollOutcome::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::ApiFuture;
    use crate::api::job::dto::SubmitResponse;
    use crate::api::validation::PdfUpload;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn status(token: &str) -> Result<StatusResponse, ApiError> {
        Ok(StatusResponse {
            status: Some(token.to_string()),
            ..Default::default()
        })
    }

    /// Replays scripted replies; once the script is empty it keeps answering `processing`.
    struct ScriptedApi {
        replies: Mutex<VecDeque<Result<StatusResponse, ApiError>>>,
        calls: AtomicU32,
    }

    impl ScriptedApi {
        fn new(replies: Vec<Result<StatusResponse, ApiError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SummarizeApi for ScriptedApi {
        fn submit<'a>(&'a self, _upload: &'a PdfUpload) -> ApiFuture<'a, SubmitResponse> {
            Box::pin(async { Err(ApiError::Network("not scripted".into())) })
        }

        fn job_status<'a>(&'a self, _job_id: &'a str) -> ApiFuture<'a, StatusResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| status("processing"));
            Box::pin(async move { reply })
        }
    }

    fn poller() -> JobPoller {
        JobPoller::new(DEFAULT_POLL_INTERVAL, DEFAULT_MAX_POLL_ATTEMPTS)
    }

    #[test]
    fn start_moves_to_polling_with_job_created() {
        let mut poller = poller();
        assert_eq!(poller.state(), PollState::Idle);

        let created = poller.start("job-1");

        assert_eq!(created, ProgressSnapshot::new(17, "Job Created"));
        assert_eq!(poller.state(), PollState::Polling { attempts: 0 });
        assert_eq!(poller.job().unwrap().id, "job-1");
    }

    #[test]
    fn in_progress_reply_counts_an_attempt() {
        let mut poller = poller();
        poller.start("job-1");

        let step = poller.handle(status("finalizing"));

        assert_eq!(step, PollStep::Continue(ProgressSnapshot::new(83, "Almost Done")));
        assert_eq!(poller.attempts(), 1);
    }

    #[test]
    fn server_error_status_uses_message_or_fallback() {
        let mut poller = poller();
        poller.start("job-1");
        let step = poller.handle(Ok(StatusResponse {
            status: Some("error".into()),
            error: Some("PDF is encrypted".into()),
            ..Default::default()
        }));
        assert_eq!(
            step,
            PollStep::Finished(PollOutcome::Errored(JobFault::Poll("PDF is encrypted".into())))
        );
        assert_eq!(poller.state(), PollState::Errored);

        let mut poller = self::poller();
        poller.start("job-2");
        let step = poller.handle(status("error"));
        assert_eq!(
            step,
            PollStep::Finished(PollOutcome::Errored(JobFault::Poll(
                PROCESSING_FALLBACK_MESSAGE.into()
            )))
        );
    }

    #[test]
    fn rejected_reply_surfaces_detail() {
        let mut poller = poller();
        poller.start("job-1");
        let step = poller.handle(Err(ApiError::Rejected {
            status: 404,
            detail: Some("Job not found".into()),
        }));
        assert_eq!(
            step,
            PollStep::Finished(PollOutcome::Errored(JobFault::Poll("Job not found".into())))
        );
    }

    #[test]
    fn rejected_reply_without_detail_uses_fallback() {
        for detail in [None, Some(String::new())] {
            let mut poller = poller();
            poller.start("job-1");
            let step = poller.handle(Err(ApiError::Rejected {
                status: 500,
                detail,
            }));
            assert_eq!(
                step,
                PollStep::Finished(PollOutcome::Errored(JobFault::Poll(
                    STATUS_FALLBACK_MESSAGE.into()
                )))
            );
            assert_eq!(poller.state(), PollState::Errored);
        }
    }

    #[test]
    fn reply_without_status_keeps_polling() {
        let mut poller = poller();
        poller.start("job-1");

        let step = poller.handle(Ok(StatusResponse::default()));

        assert_eq!(step, PollStep::Continue(ProgressSnapshot::new(50, "Processing...")));
        assert_eq!(poller.state(), PollState::Polling { attempts: 1 });
    }

    #[test]
    fn undecodable_reply_hides_parser_detail() {
        let mut poller = poller();
        poller.start("job-1");

        let step = poller.handle(Err(ApiError::Decode(
            "invalid type: integer `3`, expected a string at line 1 column 12".into(),
        )));

        assert_eq!(
            step,
            PollStep::Finished(PollOutcome::Errored(JobFault::Transport(
                MALFORMED_RESPONSE_MESSAGE.into()
            )))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_milestones_in_order_until_completion() {
        let api = ScriptedApi::new(vec![
            status("extracting"),
            status("summarizing"),
            Ok(StatusResponse {
                status: Some("completed".into()),
                summary: Some("A short summary.".into()),
                filename: Some("paper.pdf".into()),
                text_length: Some(4096),
                error: None,
            }),
        ]);
        let mut poller = poller();
        let mut published = Vec::new();

        let outcome = poller
            .run(&api, "job-7", &CancellationToken::new(), |p| {
                published.push(p.percentage)
            })
            .await;

        assert_eq!(published, vec![17, 33, 67, 100]);
        match outcome {
            PollOutcome::Completed(result) => {
                assert_eq!(result.job_id, "job-7");
                assert_eq!(result.summary.as_deref(), Some("A short summary."));
                assert_eq!(result.text_length, Some(4096));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(poller.state(), PollState::Completed);
        assert_eq!(api.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn html_reply_stops_polling_immediately() {
        let api = ScriptedApi::new(vec![
            status("extracting"),
            Err(ApiError::NonJson {
                status: 502,
                content_type: Some("text/html".into()),
            }),
            status("completed"),
        ]);
        let mut poller = poller();

        let outcome = poller
            .run(&api, "job-1", &CancellationToken::new(), |_| {})
            .await;

        assert_eq!(
            outcome,
            PollOutcome::Errored(JobFault::Transport(POLL_NON_JSON_MESSAGE.into()))
        );
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn network_failure_is_fatal_without_retry() {
        let api = ScriptedApi::new(vec![Err(ApiError::Network("connection reset".into()))]);
        let mut poller = poller();

        let outcome = poller
            .run(&api, "job-1", &CancellationToken::new(), |_| {})
            .await;

        assert_eq!(outcome, PollOutcome::Errored(JobFault::Network("connection reset".into())));
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_after_attempt_budget() {
        let api = ScriptedApi::new(Vec::new());
        let mut poller = poller();

        let outcome = poller
            .run(&api, "job-slow", &CancellationToken::new(), |_| {})
            .await;

        assert_eq!(outcome, PollOutcome::TimedOut);
        assert_eq!(poller.state(), PollState::TimedOut);
        assert_eq!(api.calls(), DEFAULT_MAX_POLL_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_between_polls() {
        let api = ScriptedApi::new(Vec::new());
        let cancel = CancellationToken::new();
        let mut poller = poller();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            trigger.cancel();
        });

        let outcome = poller.run(&api, "job-1", &cancel, |_| {}).await;

        assert_eq!(outcome, PollOutcome::Cancelled);
        assert_eq!(poller.state(), PollState::Idle);
        assert!(poller.job().is_none());
        assert_eq!(api.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_never_moves_backwards() {
        let api = ScriptedApi::new(vec![
            status("summarizing"),
            status("processing"),
            status("finalizing"),
            status("completed"),
        ]);
        let mut poller = poller();
        let mut published = Vec::new();

        poller
            .run(&api, "job-1", &CancellationToken::new(), |p| {
                published.push(p.percentage)
            })
            .await;

        assert_eq!(published, vec![17, 67, 67, 83, 100]);
    }
}
