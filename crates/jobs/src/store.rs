use async_trait::async_trait;
use fluxfolio_types::{Job, StepStatus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::StoreError;

// ═══════════════════════════════════════════════════════════════════════════
// STORE TRAIT
// ═══════════════════════════════════════════════════════════════════════════

/// Job storage trait - can be implemented for different backends
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Store a new job
    async fn create(&self, job: &Job) -> Result<(), StoreError>;

    /// Get job by ID
    async fn get(&self, id: &str) -> Result<Option<Job>, StoreError>;

    /// Atomically update one step, leaving its siblings untouched.
    /// Returns the job as stored after the update.
    async fn update_step(
        &self,
        id: &str,
        step: &str,
        status: StepStatus,
        message: Option<String>,
    ) -> Result<Job, StoreError>;

    /// Jobs of one user, newest first
    async fn list_by_user(&self, user_id: &str, limit: usize) -> Result<Vec<Job>, StoreError>;
}

// ═══════════════════════════════════════════════════════════════════════════
// IN-MEMORY STORE
// ═══════════════════════════════════════════════════════════════════════════

/// Each job sits behind its own lock so step updates on different jobs do not
/// contend, while updates on one job are serialized.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<String, Arc<Mutex<Job>>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get number of jobs (for testing)
    pub fn len(&self) -> usize {
        self.jobs.read().map(|jobs| jobs.len()).unwrap_or_default()
    }

    /// Check if store is empty (for testing)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, id: &str) -> Result<Option<Arc<Mutex<Job>>>, StoreError> {
        let jobs = self.jobs.read().map_err(poisoned)?;
        Ok(jobs.get(id).cloned())
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::DatabaseError("job store lock poisoned".to_string())
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, job: &Job) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().map_err(poisoned)?;
        if jobs.contains_key(&job.id) {
            return Err(StoreError::DuplicateId(job.id.clone()));
        }
        jobs.insert(job.id.clone(), Arc::new(Mutex::new(job.clone())));
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Job>, StoreError> {
        match self.entry(id)? {
            Some(entry) => Ok(Some(entry.lock().map_err(poisoned)?.clone())),
            None => Ok(None),
        }
    }

    async fn update_step(
        &self,
        id: &str,
        step: &str,
        status: StepStatus,
        message: Option<String>,
    ) -> Result<Job, StoreError> {
        let entry = self
            .entry(id)?
            .ok_or_else(|| StoreError::JobNotFound(id.to_string()))?;
        let mut job = entry.lock().map_err(poisoned)?;
        job.update_step(step, status, message)?;
        Ok(job.clone())
    }

    async fn list_by_user(&self, user_id: &str, limit: usize) -> Result<Vec<Job>, StoreError> {
        let entries: Vec<_> = self.jobs.read().map_err(poisoned)?.values().cloned().collect();

        let mut results = Vec::new();
        for entry in entries {
            let job = entry.lock().map_err(poisoned)?;
            if job.user_id.as_deref() == Some(user_id) {
                results.push(job.clone());
            }
        }

        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        results.truncate(limit);
        Ok(results)
    }
}
