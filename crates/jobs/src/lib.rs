//! Job tracking for Fluxfolio background workflows.
//!
//! A job is an ordered list of named steps. Workflows advance steps through
//! [`JobTracker`], which persists them in a [`JobStore`]. Consumers follow a
//! job with [`JobPoller`] until it is terminal.

pub mod error;
pub mod poller;
pub mod source;
pub mod sqlite_store;
pub mod store;
pub mod tracker;

pub use error::{JobError, StoreError};
pub use poller::{FollowUp, JobOutcome, JobPoller, DEFAULT_JOB_POLL_INTERVAL};
pub use source::{HttpJobSource, JobSource};
pub use sqlite_store::{SqliteJobStore, DEFAULT_MAX_UPDATE_RETRIES};
pub use store::{InMemoryJobStore, JobStore};
pub use tracker::JobTracker;
