use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Kind of background workflow a job tracks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    BuyBundle,
    Rebalance,
    Withdraw,
    CreateAccount,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::BuyBundle => "buy-bundle",
            JobType::Rebalance => "rebalance",
            JobType::Withdraw => "withdraw",
            JobType::CreateAccount => "create-account",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy-bundle" => Ok(JobType::BuyBundle),
            "rebalance" => Ok(JobType::Rebalance),
            "withdraw" => Ok(JobType::Withdraw),
            "create-account" => Ok(JobType::CreateAccount),
            other => Err(format!("unknown job type: {other}")),
        }
    }
}

/// Progress of a single job step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in-progress",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed)
    }

    /// Statuses only move forward. Rewriting the current status is allowed
    /// so a message can be attached.
    pub fn can_transition_to(&self, next: StepStatus) -> bool {
        match (self, next) {
            (current, next) if *current == next => true,
            (StepStatus::Pending, _) => true,
            (StepStatus::InProgress, StepStatus::Completed | StepStatus::Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStep {
    pub name: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JobStep {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Pending,
            message: None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StepUpdateError {
    #[error("step not found: {0}")]
    StepNotFound(String),

    #[error("step {step} cannot move from {from} to {to}")]
    InvalidTransition {
        step: String,
        from: StepStatus,
        to: StepStatus,
    },
}

/// A tracked multi-step background workflow
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,

    #[serde(rename = "type")]
    pub job_type: JobType,

    /// Ordered as created; consumers rely on position for display
    #[serde(deserialize_with = "steps_from_list_or_string")]
    pub steps: Vec<JobStep>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// New job with a fresh id and every step pending.
    /// Duplicate step names are collapsed to their first occurrence.
    pub fn new<I, S>(job_type: JobType, step_names: I, user_id: Option<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut steps: Vec<JobStep> = Vec::new();
        for name in step_names {
            let name = name.into();
            if !steps.iter().any(|s| s.name == name) {
                steps.push(JobStep::pending(name));
            }
        }

        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            job_type,
            steps,
            user_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn step(&self, name: &str) -> Option<&JobStep> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Every step is completed or failed
    pub fn is_done(&self) -> bool {
        self.steps.iter().all(|s| s.status.is_terminal())
    }

    /// No further updates are expected: either every step is terminal or a
    /// step failed and the workflow halted before its later steps ran
    pub fn is_terminal(&self) -> bool {
        self.is_done() || self.failed_step().is_some()
    }

    pub fn failed_step(&self) -> Option<&JobStep> {
        self.steps.iter().find(|s| s.status == StepStatus::Failed)
    }

    /// Set one step's status in place. `None` keeps the previous message.
    pub fn update_step(
        &mut self,
        name: &str,
        status: StepStatus,
        message: Option<String>,
    ) -> Result<(), StepUpdateError> {
        let step = self
            .steps
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| StepUpdateError::StepNotFound(name.to_string()))?;

        if !step.status.can_transition_to(status) {
            return Err(StepUpdateError::InvalidTransition {
                step: name.to_string(),
                from: step.status,
                to: status,
            });
        }

        step.status = status;
        if message.is_some() {
            step.message = message;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// The job endpoint may deliver `steps` as a JSON-encoded string
fn steps_from_list_or_string<'de, D>(deserializer: D) -> Result<Vec<JobStep>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Steps {
        List(Vec<JobStep>),
        Encoded(String),
    }

    match Steps::deserialize(deserializer)? {
        Steps::List(steps) => Ok(steps),
        Steps::Encoded(raw) => serde_json::from_str(&raw).map_err(serde::de::Error::custom),
    }
}
