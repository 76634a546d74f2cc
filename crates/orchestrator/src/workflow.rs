use std::sync::Arc;

use chrono::Utc;
use fluxfolio_intents::{AssetResolver, IntentBuilder, WithdrawRequest};
use fluxfolio_jobs::JobTracker;
use fluxfolio_metrics::{JobSpan, MetricsCollector};
use fluxfolio_mpc::{derive_evm_address, parse_public_key, SigningMethod, ThresholdSigner};
use fluxfolio_relay::{DepositBridge, SolverRelay};
use fluxfolio_rpc::{ContractViewer, FunctionCall, FunctionCaller, InMemorySigner};
use fluxfolio_types::{
    BundleAllocation, DefuseIntents, DepositChain, JobType, Quote, SignedData, UserAccount,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, Instrument};

use crate::portfolio::{portfolio_spread, PortfolioRegistry};
use crate::settlement::wait_for_settlement;
use crate::stage::{Stage, StageRunner, ACCOUNT_STAGES, SWAP_STAGES};
use crate::users::{check_prerequisites, AccountProvider, UserStore};
use crate::{OrchestratorConfig, OrchestratorError};

/// Quotes to execute for a bundle purchase and the spread to register
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyBundleRequest {
    pub quotes: Vec<Quote>,
    pub allocations: Vec<BundleAllocation>,
}

/// A user workflow and its input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Workflow {
    BuyBundle(BuyBundleRequest),
    Rebalance { quotes: Vec<Quote> },
    Withdraw(WithdrawRequest),
    CreateAccount { username: String },
}

impl Workflow {
    pub fn job_type(&self) -> JobType {
        match self {
            Workflow::BuyBundle(_) => JobType::BuyBundle,
            Workflow::Rebalance { .. } => JobType::Rebalance,
            Workflow::Withdraw(_) => JobType::Withdraw,
            Workflow::CreateAccount { .. } => JobType::CreateAccount,
        }
    }

    pub fn stages(&self) -> &'static [Stage] {
        match self {
            Workflow::CreateAccount { .. } => &ACCOUNT_STAGES,
            _ => &SWAP_STAGES,
        }
    }
}

/// Clients the workflows run against, built once at startup
#[derive(Clone)]
pub struct Services {
    pub intents: IntentBuilder,
    pub assets: Arc<dyn AssetResolver>,
    pub signer: Arc<ThresholdSigner>,
    /// Platform account that requests portfolio signatures and creates accounts
    pub agent: Arc<dyn FunctionCaller>,
    pub viewer: Arc<dyn ContractViewer>,
    pub relay: Arc<dyn SolverRelay>,
    pub bridge: Arc<dyn DepositBridge>,
    pub users: Arc<dyn UserStore>,
    pub accounts: Arc<dyn AccountProvider>,
    pub tracker: JobTracker,
    pub metrics: Arc<MetricsCollector>,
}

/// Runs the multi-step user workflows, reporting every stage to the job
/// tracker. Stages run strictly in order; the first failure halts the
/// workflow and leaves later steps pending.
#[derive(Clone)]
pub struct Orchestrator {
    config: OrchestratorConfig,
    services: Services,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig, services: Services) -> Self {
        Self { config, services }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.services.tracker
    }

    pub fn relay(&self) -> &Arc<dyn SolverRelay> {
        &self.services.relay
    }

    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.services.users
    }

    /// Run `workflow` for `user_id`, reporting to the existing job `job_id`
    pub async fn run(
        &self,
        job_id: &str,
        user_id: &str,
        workflow: &Workflow,
    ) -> Result<(), OrchestratorError> {
        match workflow {
            Workflow::BuyBundle(request) => self.buy_bundle(job_id, user_id, request).await.map(drop),
            Workflow::Rebalance { quotes } => self.rebalance(job_id, user_id, quotes).await.map(drop),
            Workflow::Withdraw(request) => self.withdraw(job_id, user_id, request).await.map(drop),
            Workflow::CreateAccount { username } => {
                self.create_account(job_id, user_id, username).await.map(drop)
            }
        }
    }

    /// Swap the user's stablecoins into a bundle, registering the portfolio
    /// on first purchase. Returns the settlement transaction hash.
    pub async fn buy_bundle(
        &self,
        job_id: &str,
        user_id: &str,
        request: &BuyBundleRequest,
    ) -> Result<String, OrchestratorError> {
        let span = JobSpan::new(job_id, JobType::BuyBundle).span();
        async {
            let stages = self.stages(job_id);

            let (user, swap) = stages
                .run(Stage::BuildIntent, async {
                    let user = self.load_user(user_id, JobType::BuyBundle).await?;
                    let signer_id = required(&user, &user.near_intents_address, "intents address")?;
                    let swap = self
                        .services
                        .intents
                        .build_swap_intent(&request.quotes, signer_id)
                        .await?;
                    Ok::<_, OrchestratorError>((user, swap))
                })
                .await?;

            let signed = stages
                .run(Stage::FetchSignature, async {
                    let account_id = required(&user, &user.near_account_id, "near account")?;
                    let sudo_key = required(&user, &user.sudo_key, "sudo key")?;
                    let intents_address =
                        required(&user, &user.near_intents_address, "intents address")?;

                    let spread =
                        portfolio_spread(&request.allocations, self.services.assets.as_ref())?;
                    let owner = self.services.accounts.user_account(account_id, sudo_key)?;
                    self.portfolios()
                        .ensure_portfolio(
                            owner.as_ref(),
                            self.services.agent.account_id(),
                            intents_address,
                            &spread,
                        )
                        .await?;

                    self.sign(
                        self.services.agent.as_ref(),
                        SigningMethod::BalancePortfolio {
                            user_portfolio: account_id.to_string(),
                        },
                        &swap.intents,
                    )
                    .await
                })
                .await?;

            self.publish_and_settle(&stages, &signed, &swap.quote_hashes)
                .await
        }
        .instrument(span)
        .await
    }

    /// Move an existing portfolio toward its targets using agent-supplied quotes
    pub async fn rebalance(
        &self,
        job_id: &str,
        user_id: &str,
        quotes: &[Quote],
    ) -> Result<String, OrchestratorError> {
        let span = JobSpan::new(job_id, JobType::Rebalance).span();
        async {
            let stages = self.stages(job_id);

            let (user, swap) = stages
                .run(Stage::BuildIntent, async {
                    let user = self.load_user(user_id, JobType::Rebalance).await?;
                    let signer_id = required(&user, &user.near_intents_address, "intents address")?;
                    let swap = self
                        .services
                        .intents
                        .build_swap_intent(quotes, signer_id)
                        .await?;
                    Ok::<_, OrchestratorError>((user, swap))
                })
                .await?;

            let signed = stages
                .run(Stage::FetchSignature, async {
                    let account_id = required(&user, &user.near_account_id, "near account")?;
                    self.sign(
                        self.services.agent.as_ref(),
                        SigningMethod::BalancePortfolio {
                            user_portfolio: account_id.to_string(),
                        },
                        &swap.intents,
                    )
                    .await
                })
                .await?;

            self.publish_and_settle(&stages, &signed, &swap.quote_hashes)
                .await
        }
        .instrument(span)
        .await
    }

    /// Withdraw one asset from the user's intents balance to an external
    /// address
    pub async fn withdraw(
        &self,
        job_id: &str,
        user_id: &str,
        request: &WithdrawRequest,
    ) -> Result<String, OrchestratorError> {
        let span = JobSpan::new(job_id, JobType::Withdraw).span();
        async {
            let stages = self.stages(job_id);

            let (user, intents) = stages
                .run(Stage::BuildIntent, async {
                    let user = self.load_user(user_id, JobType::Withdraw).await?;
                    let signer_id = required(&user, &user.near_intents_address, "intents address")?;
                    let intents = self
                        .services
                        .intents
                        .build_withdraw_intent(signer_id, request)
                        .await?;
                    Ok::<_, OrchestratorError>((user, intents))
                })
                .await?;

            // the proxy derives the MPC key from the caller, so the owner signs
            let signed = stages
                .run(Stage::FetchSignature, async {
                    let account_id = required(&user, &user.near_account_id, "near account")?;
                    let sudo_key = required(&user, &user.sudo_key, "sudo key")?;
                    let owner = self.services.accounts.user_account(account_id, sudo_key)?;
                    self.sign(owner.as_ref(), SigningMethod::WithdrawFunds, &intents)
                        .await
                })
                .await?;

            self.publish_and_settle(&stages, &signed, &[]).await
        }
        .instrument(span)
        .await
    }

    /// Create the user's NEAR account, derive its MPC-controlled intents
    /// address and request a Base deposit address for it
    pub async fn create_account(
        &self,
        job_id: &str,
        user_id: &str,
        username: &str,
    ) -> Result<UserAccount, OrchestratorError> {
        let span = JobSpan::new(job_id, JobType::CreateAccount).span();
        async {
            let stages = self.stages(job_id);

            let user = stages
                .run(Stage::CreateAccount, async {
                    let mut user = self.load_user(user_id, JobType::CreateAccount).await?;
                    let account_id = new_account_id(
                        username,
                        &self.config.registrar,
                        Utc::now().timestamp_millis(),
                    )?;
                    let key = InMemorySigner::generate(account_id.clone());

                    let call = FunctionCall::new(
                        &self.config.registrar,
                        "create_account",
                        json!({
                            "new_account_id": account_id,
                            "new_public_key": key.public_key_string(),
                        }),
                    )
                    .with_deposit(self.config.initial_balance);
                    let outcome = self.services.agent.function_call(call).await?;
                    if let Some(failure) = outcome.failure() {
                        return Err(OrchestratorError::UnexpectedResponse(format!(
                            "create_account failed: {failure}"
                        )));
                    }

                    let intents_address = self.derived_address(&account_id).await?;
                    info!(
                        user_id,
                        account_id = %account_id,
                        intents_address = %intents_address,
                        "Account created"
                    );

                    user.near_account_id = Some(account_id);
                    user.sudo_key = Some(key.secret_key_string());
                    user.near_intents_address = Some(intents_address);
                    self.services.users.save_user(&user).await?;
                    Ok::<_, OrchestratorError>(user)
                })
                .await?;

            stages
                .run(Stage::ConfigureDeposit, async {
                    let mut user = user;
                    let intents_address =
                        required(&user, &user.near_intents_address, "intents address")?;
                    let address = self
                        .services
                        .bridge
                        .deposit_address(intents_address, DepositChain::Base)
                        .await?;

                    user.evm_deposit_address = Some(address);
                    self.services.users.save_user(&user).await?;
                    Ok::<_, OrchestratorError>(user)
                })
                .await
        }
        .instrument(span)
        .await
    }

    /// EVM address of the MPC key derived for `account_id` under the proxy
    pub async fn derived_address(&self, account_id: &str) -> Result<String, OrchestratorError> {
        let value = self
            .services
            .viewer
            .view(
                &self.config.mpc_signer_contract,
                "derived_public_key",
                json!({
                    "path": account_id,
                    "predecessor": self.config.proxy_contract,
                }),
            )
            .await?;
        let encoded = value.as_str().ok_or_else(|| {
            OrchestratorError::UnexpectedResponse(format!("derived_public_key returned {value}"))
        })?;

        Ok(derive_evm_address(&parse_public_key(encoded)?))
    }

    fn stages(&self, job_id: &str) -> StageRunner {
        StageRunner::new(
            job_id,
            self.services.tracker.clone(),
            self.services.metrics.clone(),
        )
    }

    fn portfolios(&self) -> PortfolioRegistry<'_> {
        PortfolioRegistry {
            viewer: self.services.viewer.as_ref(),
            contract_id: &self.config.proxy_contract,
            deposit: self.config.portfolio_deposit,
        }
    }

    async fn load_user(
        &self,
        user_id: &str,
        job_type: JobType,
    ) -> Result<UserAccount, OrchestratorError> {
        let user = self
            .services
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| OrchestratorError::UserNotFound(user_id.to_string()))?;
        check_prerequisites(job_type, &user)?;
        Ok(user)
    }

    async fn sign(
        &self,
        caller: &dyn FunctionCaller,
        method: SigningMethod,
        intents: &DefuseIntents,
    ) -> Result<SignedData, OrchestratorError> {
        Ok(self
            .services
            .signer
            .sign_intent(
                caller,
                &self.config.proxy_contract,
                &method,
                intents,
            )
            .await?)
    }

    async fn publish_and_settle(
        &self,
        stages: &StageRunner,
        signed: &SignedData,
        quote_hashes: &[String],
    ) -> Result<String, OrchestratorError> {
        let intent_hash = stages
            .run(Stage::SendTransaction, async {
                let intent_hash = self
                    .services
                    .relay
                    .publish_intent(signed, quote_hashes)
                    .await?;
                Ok::<_, OrchestratorError>(intent_hash)
            })
            .await?;
        info!(job_id = %stages.job_id(), intent_hash = %intent_hash, "Intent published");

        stages
            .run(
                Stage::WaitForSettlement,
                wait_for_settlement(
                    self.services.relay.as_ref(),
                    &intent_hash,
                    &self.config.settlement,
                    &self.services.metrics,
                ),
            )
            .await
    }
}

fn required<'a>(
    user: &UserAccount,
    value: &'a Option<String>,
    what: &'static str,
) -> Result<&'a str, OrchestratorError> {
    value
        .as_deref()
        .ok_or_else(|| OrchestratorError::MissingPrerequisite {
            user_id: user.id.clone(),
            what,
        })
}

/// `<millis>-<username>.<registrar>`, unique per creation attempt
pub fn new_account_id(
    username: &str,
    registrar: &str,
    timestamp_millis: i64,
) -> Result<String, OrchestratorError> {
    let username = username.trim().to_lowercase();
    let valid = !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if !valid {
        return Err(OrchestratorError::InvalidAccount(format!(
            "username {username:?} is not a valid account name"
        )));
    }

    Ok(format!("{timestamp_millis}-{username}.{registrar}"))
}
