use crate::settlement::SettlementConfig;

/// One NEAR in yoctoNEAR
pub const ONE_NEAR: u128 = 1_000_000_000_000_000_000_000_000;

/// Contract ids and amounts the workflows need
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Portfolio proxy that registers portfolios and forwards signature requests
    pub proxy_contract: String,

    /// MPC signer that derives per-account keys
    pub mpc_signer_contract: String,

    /// Top-level account that creates named sub-accounts
    pub registrar: String,

    /// Attached to `create_account`, in yoctoNEAR
    pub initial_balance: u128,

    /// Attached to `create_portfolio`, in yoctoNEAR
    pub portfolio_deposit: u128,

    pub settlement: SettlementConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            proxy_contract: "portfolio.fluxfolio.near".to_string(),
            mpc_signer_contract: "v1.signer".to_string(),
            registrar: "near".to_string(),
            initial_balance: ONE_NEAR / 2,
            portfolio_deposit: 1,
            settlement: SettlementConfig::default(),
        }
    }
}
