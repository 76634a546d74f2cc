use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use fluxfolio_jobs::JobTracker;
use fluxfolio_types::StepStatus;
use futures::FutureExt;
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

use crate::stage::Stage;
use crate::users::check_prerequisites;
use crate::workflow::{Orchestrator, Workflow};
use crate::OrchestratorError;

struct Task {
    generation: u64,
    handle: AbortHandle,
}

#[derive(Default)]
struct Tasks {
    next_generation: u64,
    running: HashMap<String, Task>,
}

/// Background workflow tasks keyed by job id.
///
/// Submitting creates the job and returns its id once the task is spawned.
/// Progress is observed through the job tracker, not through the task.
#[derive(Clone)]
pub struct JobRunner {
    orchestrator: Arc<Orchestrator>,
    tasks: Arc<Mutex<Tasks>>,
}

impl JobRunner {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            tasks: Arc::new(Mutex::new(Tasks::default())),
        }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Validate the user, create the job and start the workflow
    pub async fn submit(
        &self,
        user_id: &str,
        workflow: Workflow,
    ) -> Result<String, OrchestratorError> {
        let job_type = workflow.job_type();
        let user = self
            .orchestrator
            .users()
            .get_user(user_id)
            .await?
            .ok_or_else(|| OrchestratorError::UserNotFound(user_id.to_string()))?;
        check_prerequisites(job_type, &user)?;

        let job_id = self
            .orchestrator
            .tracker()
            .create_job(
                job_type,
                Stage::names(workflow.stages()),
                Some(user_id.to_string()),
            )
            .await?;

        let orchestrator = self.orchestrator.clone();
        let task_job_id = job_id.clone();
        let user_id = user_id.to_string();
        self.spawn(&job_id, async move {
            let run = AssertUnwindSafe(orchestrator.run(&task_job_id, &user_id, &workflow));
            match run.catch_unwind().await {
                Ok(Ok(())) => {
                    info!(job_id = %task_job_id, job_type = %job_type, "Workflow finished")
                }
                Ok(Err(err)) => warn!(
                    job_id = %task_job_id,
                    job_type = %job_type,
                    error = %err,
                    "Workflow halted"
                ),
                Err(_) => {
                    error!(
                        job_id = %task_job_id,
                        job_type = %job_type,
                        error_type = "workflow_panic",
                        "Workflow panicked"
                    );
                    fail_open_step(orchestrator.tracker(), &task_job_id).await;
                }
            }
        });

        Ok(job_id)
    }

    /// Spawn `work` under `job_id`. Returns false, without spawning, when a
    /// task for the job is still running.
    pub fn spawn<F>(&self, job_id: &str, work: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(mut tasks) = self.tasks.lock() else {
            warn!(job_id, "Job runner lock poisoned");
            return false;
        };
        if tasks.running.contains_key(job_id) {
            return false;
        }

        tasks.next_generation += 1;
        let generation = tasks.next_generation;
        let registry = self.tasks.clone();
        let key = job_id.to_string();

        // the task cannot deregister before it is registered: it needs the
        // lock held here
        let handle = tokio::spawn(async move {
            work.await;
            if let Ok(mut tasks) = registry.lock() {
                if tasks
                    .running
                    .get(&key)
                    .is_some_and(|task| task.generation == generation)
                {
                    tasks.running.remove(&key);
                }
            }
        });

        tasks.running.insert(
            job_id.to_string(),
            Task {
                generation,
                handle: handle.abort_handle(),
            },
        );
        debug!(job_id, "Workflow task spawned");
        true
    }

    /// Abort the job's task. Steps already recorded stay as they are.
    pub fn cancel(&self, job_id: &str) -> bool {
        let task = match self.tasks.lock() {
            Ok(mut tasks) => tasks.running.remove(job_id),
            Err(_) => None,
        };

        match task {
            Some(task) => {
                task.handle.abort();
                info!(job_id, "Workflow cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, job_id: &str) -> bool {
        self.tasks
            .lock()
            .map(|tasks| tasks.running.contains_key(job_id))
            .unwrap_or(false)
    }

    pub fn running(&self) -> usize {
        self.tasks
            .lock()
            .map(|tasks| tasks.running.len())
            .unwrap_or(0)
    }

    /// Abort every running task
    pub fn shutdown(&self) {
        let drained: Vec<Task> = match self.tasks.lock() {
            Ok(mut tasks) => tasks.running.drain().map(|(_, task)| task).collect(),
            Err(_) => Vec::new(),
        };
        for task in drained {
            task.handle.abort();
        }
    }
}

/// Mark the step that was running (or the next pending one) failed so the
/// job still reaches a terminal state
async fn fail_open_step(tracker: &JobTracker, job_id: &str) {
    let job = match tracker.get_job(job_id).await {
        Ok(Some(job)) => job,
        Ok(None) => return,
        Err(err) => {
            warn!(job_id, error = %err, "Could not load job after panic");
            return;
        }
    };

    let open = job
        .steps
        .iter()
        .find(|step| step.status == StepStatus::InProgress)
        .or_else(|| job.steps.iter().find(|step| step.status == StepStatus::Pending));
    if let Some(step) = open {
        tracker
            .update_step(
                job_id,
                &step.name,
                StepStatus::Failed,
                Some("workflow aborted unexpectedly".to_string()),
            )
            .await;
    }
}
