use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use fluxfolio_rpc::ContractViewer;
use serde_json::json;
use tracing::{debug, warn};

use crate::IntentError;

/// Upper bound on nonce collisions tolerated before giving up
pub const DEFAULT_MAX_NONCE_ATTEMPTS: u32 = 1000;

/// Source of truth for consumed nonces
#[async_trait]
pub trait NonceRegistry: Send + Sync {
    async fn is_nonce_used(&self, nonce: &str, signer_id: &str) -> Result<bool, IntentError>;
}

/// Nonce registry backed by the verifying contract's `is_nonce_used` view
pub struct IntentsContract {
    viewer: Arc<dyn ContractViewer>,
    contract_id: String,
}

impl IntentsContract {
    pub fn new(viewer: Arc<dyn ContractViewer>, contract_id: impl Into<String>) -> Self {
        Self {
            viewer,
            contract_id: contract_id.into(),
        }
    }
}

#[async_trait]
impl NonceRegistry for IntentsContract {
    async fn is_nonce_used(&self, nonce: &str, signer_id: &str) -> Result<bool, IntentError> {
        let value = self
            .viewer
            .view(
                &self.contract_id,
                "is_nonce_used",
                json!({"nonce": nonce, "account_id": signer_id.to_lowercase()}),
            )
            .await?;

        value.as_bool().ok_or_else(|| {
            IntentError::Serialization(format!("is_nonce_used returned {value}"))
        })
    }
}

/// Produces single-use nonces for intent signers
#[derive(Clone)]
pub struct NonceService {
    registry: Arc<dyn NonceRegistry>,
    max_attempts: u32,
}

impl NonceService {
    pub fn new(registry: Arc<dyn NonceRegistry>) -> Self {
        Self {
            registry,
            max_attempts: DEFAULT_MAX_NONCE_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Random base64 nonce that the registry reports unused for `signer_id`.
    /// Callers racing for the same signer must still rely on the contract to
    /// reject a reused nonce at execution.
    pub async fn generate_nonce(&self, signer_id: &str) -> Result<String, IntentError> {
        for attempt in 1..=self.max_attempts {
            let nonce = random_nonce();
            if !self.registry.is_nonce_used(&nonce, signer_id).await? {
                debug!(signer_id, attempt, "Generated unused nonce");
                return Ok(nonce);
            }
            debug!(signer_id, attempt, "Nonce collision, retrying");
        }

        warn!(signer_id, attempts = self.max_attempts, "Nonce generation exhausted");
        Err(IntentError::NonceExhausted {
            attempts: self.max_attempts,
        })
    }
}

fn random_nonce() -> String {
    let bytes: [u8; 32] = rand::random();
    STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxfolio_rpc::RpcError;
    use serde_json::Value;
    use std::sync::Mutex;

    /// Reports the first `collisions` nonces as used and records every check
    struct ScriptedRegistry {
        collisions: usize,
        checked: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedRegistry {
        fn new(collisions: usize) -> Self {
            Self {
                collisions,
                checked: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl NonceRegistry for ScriptedRegistry {
        async fn is_nonce_used(&self, nonce: &str, signer_id: &str) -> Result<bool, IntentError> {
            let mut checked = self.checked.lock().unwrap();
            checked.push((nonce.to_string(), signer_id.to_string()));
            Ok(checked.len() <= self.collisions)
        }
    }

    #[tokio::test]
    async fn test_nonce_is_32_random_bytes() {
        let service = NonceService::new(Arc::new(ScriptedRegistry::new(0)));
        let nonce = service.generate_nonce("0xabc").await.unwrap();
        assert_eq!(STANDARD.decode(&nonce).unwrap().len(), 32);
    }

    #[tokio::test]
    async fn test_never_returns_used_nonce() {
        let registry = Arc::new(ScriptedRegistry::new(5));
        let service = NonceService::new(registry.clone());

        let nonce = service.generate_nonce("0xabc").await.unwrap();

        let checked = registry.checked.lock().unwrap();
        assert_eq!(checked.len(), 6);
        assert_eq!(checked[5].0, nonce);
        assert!(checked[..5].iter().all(|(used, _)| used != &nonce));
    }

    #[tokio::test]
    async fn test_exhaustion_after_exact_bound() {
        let registry = Arc::new(ScriptedRegistry::new(usize::MAX));
        let service = NonceService::new(registry.clone()).with_max_attempts(25);

        let err = service.generate_nonce("0xabc").await.unwrap_err();
        assert_eq!(err, IntentError::NonceExhausted { attempts: 25 });
        assert_eq!(registry.checked.lock().unwrap().len(), 25);
    }

    #[tokio::test]
    async fn test_default_bound() {
        let registry = Arc::new(ScriptedRegistry::new(usize::MAX));
        let service = NonceService::new(registry.clone());

        let err = service.generate_nonce("0xabc").await.unwrap_err();
        assert_eq!(
            err,
            IntentError::NonceExhausted {
                attempts: DEFAULT_MAX_NONCE_ATTEMPTS
            }
        );
        assert_eq!(registry.checked.lock().unwrap().len(), 1000);
    }

    struct RecordingViewer {
        calls: Mutex<Vec<(String, String, Value)>>,
        answer: Value,
    }

    #[async_trait]
    impl ContractViewer for RecordingViewer {
        async fn view(&self, contract_id: &str, method: &str, args: Value) -> Result<Value, RpcError> {
            self.calls
                .lock()
                .unwrap()
                .push((contract_id.to_string(), method.to_string(), args));
            Ok(self.answer.clone())
        }
    }

    #[tokio::test]
    async fn test_contract_registry_lowercases_signer() {
        let viewer = Arc::new(RecordingViewer {
            calls: Mutex::new(Vec::new()),
            answer: Value::Bool(false),
        });
        let registry = IntentsContract::new(viewer.clone(), "intents.near");

        let used = registry.is_nonce_used("n1", "0xABCdef").await.unwrap();
        assert!(!used);

        let calls = viewer.calls.lock().unwrap();
        assert_eq!(calls[0].0, "intents.near");
        assert_eq!(calls[0].1, "is_nonce_used");
        assert_eq!(calls[0].2, json!({"nonce": "n1", "account_id": "0xabcdef"}));
    }

    #[tokio::test]
    async fn test_contract_registry_rejects_non_bool() {
        let viewer = Arc::new(RecordingViewer {
            calls: Mutex::new(Vec::new()),
            answer: json!("yes"),
        });
        let registry = IntentsContract::new(viewer, "intents.near");
        assert!(matches!(
            registry.is_nonce_used("n1", "a").await,
            Err(IntentError::Serialization(_))
        ));
    }
}
