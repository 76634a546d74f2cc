//! Shared handler state

use std::sync::Arc;
use std::time::Instant;

use fluxfolio_jobs::JobTracker;
use fluxfolio_orchestrator::JobRunner;
use fluxfolio_relay::SolverRelay;

use crate::session::SessionStore;

/// Everything the handlers reach; cloned per request
#[derive(Clone)]
pub struct AppState {
    pub runner: JobRunner,
    pub sessions: Arc<dyn SessionStore>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(runner: JobRunner, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            runner,
            sessions,
            started_at: Instant::now(),
        }
    }

    pub fn tracker(&self) -> &JobTracker {
        self.runner.orchestrator().tracker()
    }

    pub fn relay(&self) -> &Arc<dyn SolverRelay> {
        self.runner.orchestrator().relay()
    }
}
