use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fluxfolio_polling::{poll_until, PollConfig, PollError, PollOutcome};
use fluxfolio_types::JobStep;
use futures::future::BoxFuture;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::JobError;
use crate::source::JobSource;

pub const DEFAULT_JOB_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Consecutive transient fetch failures tolerated before giving up
pub const DEFAULT_MAX_FETCH_ERRORS: u32 = 30;

/// Action run once after a job finishes without a failed step
pub type FollowUp = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Final result of a polled job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed {
        step: String,
        message: Option<String>,
    },
    /// The job could not be read: it does not exist or fetches kept failing
    Unavailable { reason: String },
}

struct Running {
    job_id: String,
    handle: JoinHandle<()>,
}

/// Follows one job at a time until it reaches a terminal state.
///
/// Fetched steps are published on a `watch` channel. The outcome is published
/// once when the job becomes terminal, after which no further fetches happen.
pub struct JobPoller {
    source: Arc<dyn JobSource>,
    interval: Duration,
    max_fetch_errors: u32,
    steps: watch::Sender<Vec<JobStep>>,
    outcome: watch::Sender<Option<JobOutcome>>,
    running: Mutex<Option<Running>>,
}

impl JobPoller {
    pub fn new(source: Arc<dyn JobSource>) -> Self {
        Self {
            source,
            interval: DEFAULT_JOB_POLL_INTERVAL,
            max_fetch_errors: DEFAULT_MAX_FETCH_ERRORS,
            steps: watch::channel(Vec::new()).0,
            outcome: watch::channel(None).0,
            running: Mutex::new(None),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_fetch_errors(mut self, max_fetch_errors: u32) -> Self {
        self.max_fetch_errors = max_fetch_errors.max(1);
        self
    }

    /// Latest fetched steps of the current job
    pub fn steps(&self) -> watch::Receiver<Vec<JobStep>> {
        self.steps.subscribe()
    }

    /// Outcome of the current job, `None` until it is terminal
    pub fn outcome(&self) -> watch::Receiver<Option<JobOutcome>> {
        self.outcome.subscribe()
    }

    /// Job currently being followed
    pub fn current_job(&self) -> Option<String> {
        self.running
            .lock()
            .ok()
            .and_then(|running| running.as_ref().map(|r| r.job_id.clone()))
    }

    /// Start following `job_id`. Returns `false` when that job is already
    /// being followed. A poller for a different job is stopped first.
    pub fn start(&self, job_id: &str, follow_up: Option<FollowUp>) -> bool {
        let Ok(mut running) = self.running.lock() else {
            warn!(job_id, "job poller state poisoned");
            return false;
        };

        if let Some(current) = running.as_ref() {
            if current.job_id == job_id && !current.handle.is_finished() {
                debug!(job_id, "job poller already running");
                return false;
            }
        }
        if let Some(previous) = running.take() {
            previous.handle.abort();
            debug!(job_id = %previous.job_id, "replaced job poller");
        }

        self.steps.send_replace(Vec::new());
        self.outcome.send_replace(None);

        let handle = tokio::spawn(follow_job(
            self.source.clone(),
            job_id.to_string(),
            self.interval,
            self.max_fetch_errors,
            self.steps.clone(),
            self.outcome.clone(),
            follow_up,
        ));
        *running = Some(Running {
            job_id: job_id.to_string(),
            handle,
        });
        true
    }

    /// Stop following the current job
    pub fn stop(&self) {
        if let Ok(mut running) = self.running.lock() {
            if let Some(current) = running.take() {
                current.handle.abort();
                debug!(job_id = %current.job_id, "job poller stopped");
            }
        }
    }
}

impl Drop for JobPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn follow_job(
    source: Arc<dyn JobSource>,
    job_id: String,
    interval: Duration,
    max_fetch_errors: u32,
    steps: watch::Sender<Vec<JobStep>>,
    outcome: watch::Sender<Option<JobOutcome>>,
    follow_up: Option<FollowUp>,
) {
    let config = PollConfig::unbounded(interval);
    let source = source.as_ref();
    let id = job_id.as_str();
    let steps_tx = &steps;
    let failures = AtomicU32::new(0);
    let failures = &failures;

    let result = poll_until(&config, move |attempt| async move {
        match source.fetch_job(id).await {
            Ok(job) => {
                failures.store(0, Ordering::Relaxed);
                steps_tx.send_replace(job.steps.clone());
                if job.is_terminal() {
                    Ok(PollOutcome::Ready(job))
                } else {
                    Ok(PollOutcome::Pending)
                }
            }
            Err(err @ JobError::NotFound(_)) => Err(err),
            Err(err) => {
                let failed = failures.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(job_id = %id, attempt, failed, error = %err, "job fetch failed");
                if failed >= max_fetch_errors {
                    Err(err)
                } else {
                    Ok(PollOutcome::Pending)
                }
            }
        }
    })
    .await;

    let job = match result {
        Ok(job) => job,
        Err(err) => {
            let reason = match err {
                PollError::Aborted(err) => err.to_string(),
                other => other.to_string(),
            };
            warn!(job_id = %job_id, reason = %reason, "job poller gave up");
            outcome.send_replace(Some(JobOutcome::Unavailable { reason }));
            return;
        }
    };

    match job.failed_step() {
        Some(step) => {
            info!(job_id = %job_id, step = %step.name, "job failed");
            outcome.send_replace(Some(JobOutcome::Failed {
                step: step.name.clone(),
                message: step.message.clone(),
            }));
        }
        None => {
            info!(job_id = %job_id, "job succeeded");
            outcome.send_replace(Some(JobOutcome::Succeeded));
            if let Some(follow_up) = follow_up {
                follow_up().await;
            }
        }
    }
}
