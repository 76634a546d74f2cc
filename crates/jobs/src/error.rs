use fluxfolio_types::StepUpdateError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("duplicate job ID: {0}")]
    DuplicateId(String),

    #[error(transparent)]
    Step(#[from] StepUpdateError),

    #[error("job {id} changed concurrently {attempts} times")]
    Conflict { id: String, attempts: u32 },

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("connection error: {0}")]
    ConnectionError(String),
}

/// Failure to read a job for polling
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("job not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("job fetch failed: {0}")]
    Fetch(String),
}
