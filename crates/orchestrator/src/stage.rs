use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use fluxfolio_jobs::JobTracker;
use fluxfolio_metrics::{MetricsCollector, StageOutcome};
use fluxfolio_types::StepStatus;
use tracing::{error, info};

use crate::OrchestratorError;

/// A named step of a workflow. The name is the job step it reports to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    BuildIntent,
    FetchSignature,
    SendTransaction,
    WaitForSettlement,
    CreateAccount,
    ConfigureDeposit,
}

/// Steps of the buy-bundle, rebalance and withdraw workflows, in order
pub const SWAP_STAGES: [Stage; 4] = [
    Stage::BuildIntent,
    Stage::FetchSignature,
    Stage::SendTransaction,
    Stage::WaitForSettlement,
];

pub const ACCOUNT_STAGES: [Stage; 2] = [Stage::CreateAccount, Stage::ConfigureDeposit];

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::BuildIntent => "Build Intent",
            Stage::FetchSignature => "Fetch MPC Signature",
            Stage::SendTransaction => "Send Transaction",
            Stage::WaitForSettlement => "Wait for Settlement",
            Stage::CreateAccount => "Creating Account",
            Stage::ConfigureDeposit => "Configuring deposit address",
        }
    }

    pub fn names(stages: &[Stage]) -> Vec<&'static str> {
        stages.iter().map(Stage::name).collect()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Drives the steps of one job: each stage is marked in progress, run, and
/// marked completed or failed with the error message.
#[derive(Clone)]
pub struct StageRunner {
    job_id: String,
    tracker: JobTracker,
    metrics: Arc<MetricsCollector>,
}

impl StageRunner {
    pub fn new(job_id: impl Into<String>, tracker: JobTracker, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            job_id: job_id.into(),
            tracker,
            metrics,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub async fn run<T, Fut>(&self, stage: Stage, work: Fut) -> Result<T, OrchestratorError>
    where
        Fut: Future<Output = Result<T, OrchestratorError>>,
    {
        self.tracker
            .update_step(&self.job_id, stage.name(), StepStatus::InProgress, None)
            .await;
        info!(job_id = %self.job_id, stage = %stage, "Stage started");

        let started = Instant::now();
        let result = work.await;
        let elapsed = started.elapsed();

        match &result {
            Ok(_) => {
                self.metrics
                    .record_stage(stage.name(), StageOutcome::Completed, elapsed);
                self.tracker
                    .update_step(&self.job_id, stage.name(), StepStatus::Completed, None)
                    .await;
                info!(
                    job_id = %self.job_id,
                    stage = %stage,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Stage completed"
                );
            }
            Err(err) => {
                self.metrics
                    .record_stage(stage.name(), StageOutcome::Failed, elapsed);
                self.tracker
                    .update_step(
                        &self.job_id,
                        stage.name(),
                        StepStatus::Failed,
                        Some(err.to_string()),
                    )
                    .await;
                error!(
                    job_id = %self.job_id,
                    stage = %stage,
                    error_type = err.error_type(),
                    error = %err,
                    "Stage failed"
                );
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxfolio_jobs::InMemoryJobStore;
    use fluxfolio_types::JobType;

    fn tracker() -> JobTracker {
        JobTracker::new(
            Arc::new(InMemoryJobStore::new()),
            Arc::new(MetricsCollector::new()),
        )
    }

    #[test]
    fn test_swap_stage_names() {
        assert_eq!(
            Stage::names(&SWAP_STAGES),
            vec![
                "Build Intent",
                "Fetch MPC Signature",
                "Send Transaction",
                "Wait for Settlement"
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_stage_records_message() {
        let tracker = tracker();
        let job_id = tracker
            .create_job(JobType::Withdraw, Stage::names(&SWAP_STAGES), None)
            .await
            .unwrap();
        let runner = StageRunner::new(&job_id, tracker.clone(), Arc::new(MetricsCollector::new()));

        let built: Result<u8, _> = runner.run(Stage::BuildIntent, async { Ok(1) }).await;
        assert_eq!(built, Ok(1));

        let failed: Result<(), _> = runner
            .run(Stage::FetchSignature, async {
                Err(OrchestratorError::InvalidAccount("bad key".to_string()))
            })
            .await;
        assert!(failed.is_err());

        let job = tracker.get_job(&job_id).await.unwrap().unwrap();
        let statuses: Vec<_> = job.steps.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![
                StepStatus::Completed,
                StepStatus::Failed,
                StepStatus::Pending,
                StepStatus::Pending
            ]
        );
        assert_eq!(
            job.steps[1].message.as_deref(),
            Some("invalid account: bad key")
        );
    }
}
