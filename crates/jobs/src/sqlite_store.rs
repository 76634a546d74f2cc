use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use fluxfolio_types::{Job, JobStep, StepStatus};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use crate::store::JobStore;
use crate::StoreError;

/// Compare-and-swap attempts before a step update gives up
pub const DEFAULT_MAX_UPDATE_RETRIES: u32 = 16;

// ═══════════════════════════════════════════════════════════════════════════
// SQLITE STORE IMPLEMENTATION
// ═══════════════════════════════════════════════════════════════════════════

/// Jobs persisted in SQLite. Steps are stored as a JSON text column and every
/// write bumps a `version` column, so concurrent step updates retry instead of
/// overwriting each other.
pub struct SqliteJobStore {
    pool: SqlitePool,
    max_retries: u32,
}

impl SqliteJobStore {
    /// Open (or create) the database file at `db_path`
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        Self::connect(&format!("sqlite:{}", db_path.as_ref().display())).await
    }

    /// Connect with a `sqlite:` URL, creating the file if missing
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        if url.contains(":memory:") {
            return Self::in_memory().await;
        }

        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;

        let store = Self::with_pool(pool);
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create an in-memory SQLite database (for testing)
    pub async fn in_memory() -> Result<Self, StoreError> {
        // every connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;

        let store = Self::with_pool(pool);
        store.run_migrations().await?;
        Ok(store)
    }

    fn with_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            max_retries: DEFAULT_MAX_UPDATE_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(include_str!("../migrations/001_create_jobs.sql"))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        sqlx::query(include_str!("../migrations/002_create_jobs_user_index.sql"))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn fetch_versioned(&self, id: &str) -> Result<Option<(Job, i64)>, StoreError> {
        let row = sqlx::query(
            "SELECT id, job_type, steps, user_id, created_at, updated_at, version FROM jobs WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        match row {
            Some(row) => {
                let version: i64 = row.get("version");
                Ok(Some((row_to_job(&row)?, version)))
            }
            None => Ok(None),
        }
    }
}

/// Convert database row to Job
fn row_to_job(row: &SqliteRow) -> Result<Job, StoreError> {
    let job_type: String = row.get("job_type");
    let steps: String = row.get("steps");
    let steps: Vec<JobStep> =
        serde_json::from_str(&steps).map_err(|e| StoreError::SerializationError(e.to_string()))?;

    Ok(Job {
        id: row.get("id"),
        job_type: job_type
            .parse()
            .map_err(StoreError::SerializationError)?,
        steps,
        user_id: row.get("user_id"),
        created_at: parse_timestamp(row.get("created_at"))?,
        updated_at: parse_timestamp(row.get("updated_at"))?,
    })
}

/// Fixed-width RFC 3339 so text ordering matches time ordering
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(raw: String) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::SerializationError(format!("timestamp {raw}: {e}")))
}

fn encode_steps(steps: &[JobStep]) -> Result<String, StoreError> {
    serde_json::to_string(steps).map_err(|e| StoreError::SerializationError(e.to_string()))
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn create(&self, job: &Job) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO jobs (id, job_type, steps, user_id, created_at, updated_at, version)
            VALUES (?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(&job.id)
        .bind(job.job_type.as_str())
        .bind(encode_steps(&job.steps)?)
        .bind(&job.user_id)
        .bind(format_timestamp(&job.created_at))
        .bind(format_timestamp(&job.updated_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::DuplicateId(job.id.clone()))
            }
            Err(e) => Err(StoreError::DatabaseError(e.to_string())),
        }
    }

    async fn get(&self, id: &str) -> Result<Option<Job>, StoreError> {
        Ok(self.fetch_versioned(id).await?.map(|(job, _)| job))
    }

    async fn update_step(
        &self,
        id: &str,
        step: &str,
        status: StepStatus,
        message: Option<String>,
    ) -> Result<Job, StoreError> {
        for attempt in 1..=self.max_retries {
            let (mut job, version) = self
                .fetch_versioned(id)
                .await?
                .ok_or_else(|| StoreError::JobNotFound(id.to_string()))?;

            job.update_step(step, status, message.clone())?;

            let result = sqlx::query(
                "UPDATE jobs SET steps = ?, updated_at = ?, version = version + 1 WHERE id = ? AND version = ?",
            )
            .bind(encode_steps(&job.steps)?)
            .bind(format_timestamp(&job.updated_at))
            .bind(id)
            .bind(version)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

            if result.rows_affected() == 1 {
                return Ok(job);
            }
            debug!(job_id = %id, step, attempt, "job changed concurrently, retrying step update");
        }

        Err(StoreError::Conflict {
            id: id.to_string(),
            attempts: self.max_retries,
        })
    }

    async fn list_by_user(&self, user_id: &str, limit: usize) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, job_type, steps, user_id, created_at, updated_at
            FROM jobs
            WHERE user_id = ?
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        rows.iter().map(row_to_job).collect()
    }
}
