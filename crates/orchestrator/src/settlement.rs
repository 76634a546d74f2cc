use std::time::Duration;

use fluxfolio_metrics::MetricsCollector;
use fluxfolio_polling::{poll_until, PollConfig, PollError, PollOutcome};
use fluxfolio_relay::SolverRelay;
use fluxfolio_types::IntentStatus;
use tracing::{debug, info, warn};

use crate::OrchestratorError;

pub const DEFAULT_SETTLEMENT_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_SETTLEMENT_ATTEMPTS: u32 = 30;

/// Status checks during which `NOT_FOUND_OR_NOT_VALID` is read as "not
/// indexed yet"
pub const DEFAULT_NOT_FOUND_GRACE: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementConfig {
    pub interval: Duration,
    pub max_attempts: u32,
    pub not_found_grace: u32,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SETTLEMENT_INTERVAL,
            max_attempts: DEFAULT_SETTLEMENT_ATTEMPTS,
            not_found_grace: DEFAULT_NOT_FOUND_GRACE,
        }
    }
}

impl SettlementConfig {
    fn poll_config(&self) -> PollConfig {
        PollConfig::new(self.interval, self.max_attempts)
    }
}

/// Poll the relay until `intent_hash` settles and return the settlement
/// transaction hash
pub async fn wait_for_settlement(
    relay: &dyn SolverRelay,
    intent_hash: &str,
    config: &SettlementConfig,
    metrics: &MetricsCollector,
) -> Result<String, OrchestratorError> {
    let grace = config.not_found_grace;

    let result = poll_until(&config.poll_config(), move |attempt| async move {
        let status = match relay.get_status(intent_hash).await {
            Ok(status) => status,
            Err(err) => {
                metrics.record_settlement_poll("error");
                warn!(intent_hash, attempt, error = %err, "Settlement status lookup failed");
                return Ok(PollOutcome::Pending);
            }
        };
        metrics.record_settlement_poll(status.as_str());
        debug!(intent_hash, attempt, status = %status, "Settlement status");

        match status {
            IntentStatus::Settled { hash } => Ok(PollOutcome::Ready(hash)),
            IntentStatus::NotFoundOrNotValid if attempt > grace => {
                Err(OrchestratorError::IntentRejected {
                    intent_hash: intent_hash.to_string(),
                    reason: IntentStatus::NotFoundOrNotValid.as_str().to_string(),
                })
            }
            _ => Ok(PollOutcome::Pending),
        }
    })
    .await;

    match result {
        Ok(hash) => {
            info!(intent_hash, settlement_hash = %hash, "Intent settled");
            Ok(hash)
        }
        Err(PollError::Aborted(err)) => Err(err),
        Err(PollError::Exhausted { attempts }) => Err(OrchestratorError::SettlementTimeout {
            intent_hash: intent_hash.to_string(),
            attempts,
        }),
    }
}
