//! Fluxfolio workflows.
//!
//! Each workflow is a fixed sequence of [`Stage`]s reported to the job
//! tracker:
//!
//! 1. **Build Intent** - nonce and token diff (or withdrawal) for the user's
//!    intents address
//! 2. **Fetch MPC Signature** - the proxy contract asks the threshold signer
//!    to co-sign the ERC-191 hash of the payload
//! 3. **Send Transaction** - publish the signed intent to the solver relay
//! 4. **Wait for Settlement** - poll the relay until the intent settles
//!
//! Account creation has its own two steps. [`JobRunner`] starts workflows in
//! the background and hands back the job id.

pub mod config;
pub mod error;
pub mod portfolio;
pub mod runner;
pub mod settlement;
pub mod stage;
pub mod users;
pub mod workflow;

pub use config::{OrchestratorConfig, ONE_NEAR};
pub use error::OrchestratorError;
pub use portfolio::{portfolio_spread, PortfolioRegistry, FULL_PORTFOLIO_BPS};
pub use runner::JobRunner;
pub use settlement::{
    wait_for_settlement, SettlementConfig, DEFAULT_NOT_FOUND_GRACE, DEFAULT_SETTLEMENT_ATTEMPTS,
    DEFAULT_SETTLEMENT_INTERVAL,
};
pub use stage::{Stage, StageRunner, ACCOUNT_STAGES, SWAP_STAGES};
pub use users::{
    check_prerequisites, AccountProvider, InMemoryUserStore, NearAccountProvider, UserStore,
};
pub use workflow::{new_account_id, BuyBundleRequest, Orchestrator, Services, Workflow};
