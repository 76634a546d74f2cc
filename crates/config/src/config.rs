//! Configuration sections for Fluxfolio services

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// yoctoNEAR per NEAR
const YOCTO_PER_NEAR: i128 = 1_000_000_000_000_000_000_000_000;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub near: NearConfig,

    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub signature: SignatureConfig,

    #[serde(default)]
    pub settlement: SettlementConfig,

    #[serde(default)]
    pub nonce: NonceConfig,

    #[serde(default)]
    pub intents: IntentsConfig,

    #[serde(default)]
    pub jobs: JobsConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub account: AccountConfig,

    /// Token symbol to defuse asset id
    #[serde(default = "default_tokens")]
    pub tokens: BTreeMap<String, String>,
}

impl AppConfig {
    /// Defaults adjusted for `environment`
    pub fn for_environment(environment: Environment) -> Self {
        let mut config = Self::default();
        config.network.environment = environment;

        match environment {
            Environment::Mainnet => {}
            Environment::Testnet => {
                config.network.log_level = "debug".to_string();
                config.near.rpc_url = "https://rpc.testnet.near.org".to_string();
                config.near.registrar = "testnet".to_string();
            }
            Environment::Local => {
                config.network.log_level = "trace".to_string();
                config.near.rpc_url = "http://127.0.0.1:3030".to_string();
                config.near.registrar = "test.near".to_string();
                config.jobs.database_url = "sqlite::memory:".to_string();
            }
        }
        config
    }
}

/// Process-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub environment: Environment,

    /// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides it
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub json_logs: bool,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Mainnet,
    Testnet,
    Local,
}

/// NEAR node, contracts and the platform agent account
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Verifying contract of intents; also answers `is_nonce_used`
    #[serde(default = "default_intents_contract")]
    pub intents_contract: String,

    /// Portfolio proxy holding `create_portfolio` and `balance_portfolio`
    #[serde(default = "default_proxy_contract")]
    pub proxy_contract: String,

    #[serde(default = "default_mpc_signer_contract")]
    pub mpc_signer_contract: String,

    /// Parent account of newly created user accounts
    #[serde(default = "default_registrar")]
    pub registrar: String,

    #[serde(default)]
    pub agent_account_id: String,

    /// `ed25519:` secret key of the agent account, normally from the environment
    #[serde(default)]
    pub agent_secret_key: Option<String>,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Bound on waiting for a broadcast transaction to commit
    #[serde(default = "default_commit_timeout_ms")]
    pub commit_timeout_ms: u64,
}

impl NearConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn commit_timeout(&self) -> Duration {
        Duration::from_millis(self.commit_timeout_ms)
    }
}

impl std::fmt::Debug for NearConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NearConfig")
            .field("rpc_url", &self.rpc_url)
            .field("intents_contract", &self.intents_contract)
            .field("proxy_contract", &self.proxy_contract)
            .field("mpc_signer_contract", &self.mpc_signer_contract)
            .field("registrar", &self.registrar)
            .field("agent_account_id", &self.agent_account_id)
            .field(
                "agent_secret_key",
                &self.agent_secret_key.as_ref().map(|_| "<redacted>"),
            )
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("commit_timeout_ms", &self.commit_timeout_ms)
            .finish()
    }
}

/// Solver relay and deposit bridge endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_solver_relay_url")]
    pub solver_relay_url: String,

    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,

    #[serde(default = "default_relay_timeout_ms")]
    pub timeout_ms: u64,
}

impl RelayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Threshold signature requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureConfig {
    /// Interval between transaction status checks after an unconfirmed request
    #[serde(default = "default_signature_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Total time to wait for a signature after an unconfirmed request
    #[serde(default = "default_signature_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_gas")]
    pub gas: u64,

    /// yoctoNEAR attached to the request
    #[serde(default)]
    pub deposit: u64,
}

impl SignatureConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Waiting for a published intent to settle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementConfig {
    #[serde(default = "default_settlement_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_settlement_attempts")]
    pub max_attempts: u32,

    /// Status checks during which an unknown intent is not treated as rejected
    #[serde(default = "default_not_found_grace")]
    pub not_found_grace: u32,
}

impl SettlementConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceConfig {
    #[serde(default = "default_nonce_attempts")]
    pub max_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentsConfig {
    /// Lifetime of withdrawal intents without an explicit deadline
    #[serde(default = "default_intent_ttl_secs")]
    pub ttl_secs: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobsConfig {
    /// sqlx sqlite url, e.g. `sqlite://fluxfolio.db` or `sqlite::memory:`
    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_job_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl JobsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: i64,
}

/// New user accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// NEAR funded into each new account, as a decimal amount
    #[serde(default = "default_initial_balance")]
    pub initial_balance: String,

    /// yoctoNEAR attached to `create_portfolio`
    #[serde(default = "default_portfolio_deposit")]
    pub portfolio_deposit: u64,
}

impl AccountConfig {
    /// `initial_balance` in yoctoNEAR
    pub fn initial_balance_yocto(&self) -> Result<u128> {
        near_to_yocto(&self.initial_balance)
    }
}

/// Convert a decimal NEAR amount such as `0.5` to yoctoNEAR
pub fn near_to_yocto(amount: &str) -> Result<u128> {
    let invalid = || ConfigError::ParseError(format!("invalid NEAR amount: {amount}"));

    let near = Decimal::from_str(amount.trim()).map_err(|_| invalid())?;
    if near.is_sign_negative() {
        return Err(invalid());
    }
    near.checked_mul(Decimal::from_i128_with_scale(YOCTO_PER_NEAR, 0))
        .and_then(|yocto| yocto.trunc().to_u128())
        .ok_or_else(invalid)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_rpc_url() -> String {
    "https://rpc.mainnet.near.org".to_string()
}

fn default_intents_contract() -> String {
    "intents.near".to_string()
}

fn default_proxy_contract() -> String {
    "portfolio.fluxfolio.near".to_string()
}

fn default_mpc_signer_contract() -> String {
    "v1.signer".to_string()
}

fn default_registrar() -> String {
    "near".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_commit_timeout_ms() -> u64 {
    60_000
}

fn default_solver_relay_url() -> String {
    "https://solver-relay-v2.chaindefuser.com/rpc".to_string()
}

fn default_bridge_url() -> String {
    "https://bridge.chaindefuser.com/rpc".to_string()
}

fn default_relay_timeout_ms() -> u64 {
    5_000
}

fn default_signature_poll_interval_ms() -> u64 {
    3_000
}

fn default_signature_timeout_ms() -> u64 {
    400_000
}

fn default_gas() -> u64 {
    300_000_000_000_000
}

fn default_settlement_interval_ms() -> u64 {
    2_000
}

fn default_settlement_attempts() -> u32 {
    30
}

fn default_not_found_grace() -> u32 {
    3
}

fn default_nonce_attempts() -> u32 {
    1_000
}

fn default_intent_ttl_secs() -> i64 {
    300
}

fn default_database_url() -> String {
    "sqlite://fluxfolio.db".to_string()
}

fn default_job_poll_interval_ms() -> u64 {
    1_000
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_session_ttl_secs() -> i64 {
    86_400
}

fn default_initial_balance() -> String {
    "0.5".to_string()
}

fn default_portfolio_deposit() -> u64 {
    1
}

fn default_tokens() -> BTreeMap<String, String> {
    [
        (
            "USDC",
            "nep141:17208628f84f5d6ad33f0da3bbbeb27ffcb398eac501a31bd6ad2011e36133a1",
        ),
        ("WNEAR", "nep141:wrap.near"),
        ("ETH", "nep141:eth.omft.near"),
        ("BTC", "nep141:btc.omft.near"),
        ("SOL", "nep141:sol.omft.near"),
    ]
    .into_iter()
    .map(|(symbol, id)| (symbol.to_string(), id.to_string()))
    .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            near: NearConfig::default(),
            relay: RelayConfig::default(),
            signature: SignatureConfig::default(),
            settlement: SettlementConfig::default(),
            nonce: NonceConfig::default(),
            intents: IntentsConfig::default(),
            jobs: JobsConfig::default(),
            api: ApiConfig::default(),
            account: AccountConfig::default(),
            tokens: default_tokens(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            log_level: default_log_level(),
            json_logs: false,
            metrics_enabled: default_true(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for NearConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            intents_contract: default_intents_contract(),
            proxy_contract: default_proxy_contract(),
            mpc_signer_contract: default_mpc_signer_contract(),
            registrar: default_registrar(),
            agent_account_id: String::new(),
            agent_secret_key: None,
            request_timeout_ms: default_request_timeout_ms(),
            commit_timeout_ms: default_commit_timeout_ms(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            solver_relay_url: default_solver_relay_url(),
            bridge_url: default_bridge_url(),
            timeout_ms: default_relay_timeout_ms(),
        }
    }
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_signature_poll_interval_ms(),
            timeout_ms: default_signature_timeout_ms(),
            gas: default_gas(),
            deposit: 0,
        }
    }
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_settlement_interval_ms(),
            max_attempts: default_settlement_attempts(),
            not_found_grace: default_not_found_grace(),
        }
    }
}

impl Default for NonceConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_nonce_attempts(),
        }
    }
}

impl Default for IntentsConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_intent_ttl_secs(),
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            poll_interval_ms: default_job_poll_interval_ms(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            session_ttl_secs: default_session_ttl_secs(),
        }
    }
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            initial_balance: default_initial_balance(),
            portfolio_deposit: default_portfolio_deposit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_near_to_yocto() {
        assert_eq!(near_to_yocto("0.5").unwrap(), 500_000_000_000_000_000_000_000);
        assert_eq!(near_to_yocto("2").unwrap(), 2_000_000_000_000_000_000_000_000);
        assert!(near_to_yocto("-1").is_err());
        assert!(near_to_yocto("half").is_err());
    }

    #[test]
    fn test_environment_defaults() {
        let testnet = AppConfig::for_environment(Environment::Testnet);
        assert_eq!(testnet.near.registrar, "testnet");
        assert_eq!(testnet.network.log_level, "debug");

        let mainnet = AppConfig::default();
        assert_eq!(mainnet.near.registrar, "near");
        assert_eq!(mainnet.settlement.max_attempts, 30);
        assert_eq!(mainnet.tokens.get("WNEAR").map(String::as_str), Some("nep141:wrap.near"));
    }

    #[test]
    fn test_debug_redacts_agent_key() {
        let near = NearConfig {
            agent_secret_key: Some("ed25519:secret".to_string()),
            ..NearConfig::default()
        };
        let rendered = format!("{near:?}");
        assert!(!rendered.contains("ed25519:secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
