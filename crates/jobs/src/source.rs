use std::time::Duration;

use async_trait::async_trait;
use fluxfolio_types::Job;

use crate::tracker::JobTracker;
use crate::JobError;

/// Where a poller reads job state from
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn fetch_job(&self, job_id: &str) -> Result<Job, JobError>;
}

#[async_trait]
impl JobSource for JobTracker {
    async fn fetch_job(&self, job_id: &str) -> Result<Job, JobError> {
        self.get_job(job_id)
            .await?
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }
}

/// Reads jobs from the HTTP status endpoint `GET {base_url}/api/jobs/{id}`
#[derive(Clone)]
pub struct HttpJobSource {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpJobSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl JobSource for HttpJobSource {
    async fn fetch_job(&self, job_id: &str) -> Result<Job, JobError> {
        let url = format!("{}/api/jobs/{}", self.base_url, job_id);
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| JobError::Fetch(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(JobError::NotFound(job_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(JobError::Fetch(format!("HTTP {}", response.status())));
        }

        response
            .json::<Job>()
            .await
            .map_err(|e| JobError::Fetch(format!("decode job: {e}")))
    }
}
