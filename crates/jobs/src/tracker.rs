use std::sync::Arc;

use fluxfolio_metrics::{MetricsCollector, StageOutcome};
use fluxfolio_types::{Job, JobType, StepStatus};
use tracing::{debug, info, warn};

use crate::store::JobStore;
use crate::StoreError;

/// Records progress of background workflows.
///
/// Step updates are best effort: a workflow keeps running when its progress
/// cannot be written, so failures are logged and dropped here.
#[derive(Clone)]
pub struct JobTracker {
    store: Arc<dyn JobStore>,
    metrics: Arc<MetricsCollector>,
}

impl JobTracker {
    pub fn new(store: Arc<dyn JobStore>, metrics: Arc<MetricsCollector>) -> Self {
        Self { store, metrics }
    }

    /// Persist a new job with every step pending and return its id
    pub async fn create_job<I, S>(
        &self,
        job_type: JobType,
        step_names: I,
        user_id: Option<String>,
    ) -> Result<String, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let job = Job::new(job_type, step_names, user_id);
        self.store.create(&job).await?;
        self.metrics.record_job_created(job_type);

        info!(job_id = %job.id, job_type = %job_type, steps = job.steps.len(), "job created");
        Ok(job.id)
    }

    /// Set one step's status. `None` keeps the step's previous message.
    pub async fn update_step(
        &self,
        job_id: &str,
        step: &str,
        status: StepStatus,
        message: Option<String>,
    ) {
        match self.store.update_step(job_id, step, status, message).await {
            Ok(job) => {
                debug!(job_id, step, status = %status, "job step updated");
                if status.is_terminal() && job.is_terminal() {
                    let outcome = if job.failed_step().is_some() {
                        StageOutcome::Failed
                    } else {
                        StageOutcome::Completed
                    };
                    self.metrics.record_job_finished(job.job_type, outcome);
                }
            }
            Err(err) => {
                self.metrics.record_job_update_failure();
                warn!(job_id, step, status = %status, error = %err, "job step update dropped");
            }
        }
    }

    pub async fn get_job(&self, job_id: &str) -> Result<Option<Job>, StoreError> {
        self.store.get(job_id).await
    }

    /// A user's jobs, newest first
    pub async fn list_jobs(&self, user_id: &str, limit: usize) -> Result<Vec<Job>, StoreError> {
        self.store.list_by_user(user_id, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryJobStore;

    fn tracker() -> JobTracker {
        JobTracker::new(
            Arc::new(InMemoryJobStore::new()),
            Arc::new(MetricsCollector::new()),
        )
    }

    #[tokio::test]
    async fn test_create_job_persists_pending_steps() {
        let tracker = tracker();
        let id = tracker
            .create_job(JobType::CreateAccount, ["Creating Account", "Configuring deposit address"], None)
            .await
            .unwrap();

        let job = tracker.get_job(&id).await.unwrap().unwrap();
        assert_eq!(job.job_type, JobType::CreateAccount);
        assert!(job.steps.iter().all(|s| s.status == StepStatus::Pending));
    }

    #[tokio::test]
    async fn test_update_step_keeps_siblings_and_message() {
        let tracker = tracker();
        let id = tracker
            .create_job(JobType::BuyBundle, ["A", "B", "C"], Some("u".to_string()))
            .await
            .unwrap();

        tracker
            .update_step(&id, "B", StepStatus::InProgress, Some("signing".to_string()))
            .await;
        tracker.update_step(&id, "B", StepStatus::Completed, None).await;

        let job = tracker.get_job(&id).await.unwrap().unwrap();
        assert_eq!(job.steps[0].status, StepStatus::Pending);
        assert_eq!(job.steps[1].status, StepStatus::Completed);
        assert_eq!(job.steps[1].message.as_deref(), Some("signing"));
        assert_eq!(job.steps[2].status, StepStatus::Pending);
    }

    #[tokio::test]
    async fn test_update_unknown_job_is_swallowed() {
        let tracker = tracker();
        tracker
            .update_step("does-not-exist", "A", StepStatus::Completed, None)
            .await;
        assert!(tracker.get_job("does-not-exist").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_regression_is_ignored() {
        let tracker = tracker();
        let id = tracker
            .create_job(JobType::Withdraw, ["A"], None)
            .await
            .unwrap();

        tracker.update_step(&id, "A", StepStatus::Failed, Some("boom".to_string())).await;
        tracker.update_step(&id, "A", StepStatus::InProgress, None).await;

        let job = tracker.get_job(&id).await.unwrap().unwrap();
        assert_eq!(job.steps[0].status, StepStatus::Failed);
        assert_eq!(job.steps[0].message.as_deref(), Some("boom"));
    }
}
