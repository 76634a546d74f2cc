use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use fluxfolio_jobs::StoreError;
use fluxfolio_rpc::{FunctionCaller, InMemorySigner, NearAccount, NearRpcClient};
use fluxfolio_types::{JobType, UserAccount};

use crate::OrchestratorError;

/// User records the workflows read and update
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserAccount>, StoreError>;

    /// Insert or replace the record with `user.id`
    async fn save_user(&self, user: &UserAccount) -> Result<(), StoreError>;
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, UserAccount>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user: UserAccount) -> Self {
        if let Ok(mut users) = self.users.write() {
            users.insert(user.id.clone(), user);
        }
        self
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserAccount>, StoreError> {
        let users = self
            .users
            .read()
            .map_err(|_| StoreError::DatabaseError("user store lock poisoned".to_string()))?;
        Ok(users.get(user_id).cloned())
    }

    async fn save_user(&self, user: &UserAccount) -> Result<(), StoreError> {
        let mut users = self
            .users
            .write()
            .map_err(|_| StoreError::DatabaseError("user store lock poisoned".to_string()))?;
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }
}

/// Builds a signing account for a user's own NEAR account
pub trait AccountProvider: Send + Sync {
    fn user_account(
        &self,
        account_id: &str,
        secret_key: &str,
    ) -> Result<Arc<dyn FunctionCaller>, OrchestratorError>;
}

pub struct NearAccountProvider {
    rpc: Arc<NearRpcClient>,
    commit_timeout: Duration,
}

impl NearAccountProvider {
    pub fn new(rpc: Arc<NearRpcClient>, commit_timeout: Duration) -> Self {
        Self {
            rpc,
            commit_timeout,
        }
    }
}

impl AccountProvider for NearAccountProvider {
    fn user_account(
        &self,
        account_id: &str,
        secret_key: &str,
    ) -> Result<Arc<dyn FunctionCaller>, OrchestratorError> {
        let signer = InMemorySigner::from_secret_key(account_id, secret_key)
            .map_err(|e| OrchestratorError::InvalidAccount(format!("{account_id}: {e}")))?;
        Ok(Arc::new(
            NearAccount::new(self.rpc.clone(), signer).with_commit_timeout(self.commit_timeout),
        ))
    }
}

/// Check that `user` has what a workflow of `job_type` needs before it is
/// enqueued
pub fn check_prerequisites(job_type: JobType, user: &UserAccount) -> Result<(), OrchestratorError> {
    let missing = |what: &'static str| OrchestratorError::MissingPrerequisite {
        user_id: user.id.clone(),
        what,
    };

    match job_type {
        JobType::CreateAccount => {
            if user.near_account_id.is_some() {
                return Err(OrchestratorError::AccountExists(user.id.clone()));
            }
        }
        JobType::BuyBundle => {
            user.near_account_id.as_ref().ok_or_else(|| missing("near account"))?;
            user.sudo_key.as_ref().ok_or_else(|| missing("sudo key"))?;
            user.near_intents_address
                .as_ref()
                .ok_or_else(|| missing("intents address"))?;
            user.evm_deposit_address
                .as_ref()
                .ok_or_else(|| missing("deposit address"))?;
        }
        JobType::Rebalance => {
            user.near_account_id.as_ref().ok_or_else(|| missing("near account"))?;
            user.near_intents_address
                .as_ref()
                .ok_or_else(|| missing("intents address"))?;
        }
        JobType::Withdraw => {
            user.near_account_id.as_ref().ok_or_else(|| missing("near account"))?;
            user.sudo_key.as_ref().ok_or_else(|| missing("sudo key"))?;
            user.near_intents_address
                .as_ref()
                .ok_or_else(|| missing("intents address"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded_user() -> UserAccount {
        UserAccount {
            id: "u1".to_string(),
            near_account_id: Some("1700000000000-alice.near".to_string()),
            near_intents_address: Some("0xabc".to_string()),
            evm_deposit_address: Some("0xdef".to_string()),
            sudo_key: Some("ed25519:key".to_string()),
        }
    }

    #[test]
    fn test_buy_bundle_needs_every_field() {
        assert!(check_prerequisites(JobType::BuyBundle, &funded_user()).is_ok());

        let mut user = funded_user();
        user.evm_deposit_address = None;
        assert_eq!(
            check_prerequisites(JobType::BuyBundle, &user),
            Err(OrchestratorError::MissingPrerequisite {
                user_id: "u1".to_string(),
                what: "deposit address"
            })
        );
    }

    #[test]
    fn test_withdraw_needs_owner_key() {
        assert!(check_prerequisites(JobType::Withdraw, &funded_user()).is_ok());

        let mut user = funded_user();
        user.sudo_key = None;
        assert_eq!(
            check_prerequisites(JobType::Withdraw, &user),
            Err(OrchestratorError::MissingPrerequisite {
                user_id: "u1".to_string(),
                what: "sudo key"
            })
        );
        assert!(check_prerequisites(JobType::Rebalance, &user).is_ok());
    }

    #[test]
    fn test_create_account_rejects_existing_account() {
        assert_eq!(
            check_prerequisites(JobType::CreateAccount, &funded_user()),
            Err(OrchestratorError::AccountExists("u1".to_string()))
        );
        assert!(check_prerequisites(JobType::CreateAccount, &UserAccount::new("u2")).is_ok());
    }

    #[tokio::test]
    async fn test_in_memory_store_round_trip() {
        let store = InMemoryUserStore::new().with_user(UserAccount::new("u1"));
        assert!(store.get_user("missing").await.unwrap().is_none());

        let mut user = store.get_user("u1").await.unwrap().unwrap();
        user.near_account_id = Some("alice.near".to_string());
        store.save_user(&user).await.unwrap();

        let reloaded = store.get_user("u1").await.unwrap().unwrap();
        assert_eq!(reloaded.near_account_id.as_deref(), Some("alice.near"));
    }

    #[test]
    fn test_provider_rejects_bad_key() {
        let provider = NearAccountProvider::new(
            Arc::new(NearRpcClient::mainnet()),
            Duration::from_secs(1),
        );
        let err = provider
            .user_account("alice.near", "not-a-key")
            .err()
            .unwrap();
        assert!(matches!(err, OrchestratorError::InvalidAccount(_)));
    }
}
