use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An authenticated session resolved from a bearer token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// The subset of a user record the core needs
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: String,

    /// NEAR account holding the user's portfolio
    pub near_account_id: Option<String>,

    /// EVM-style address derived from the MPC key, used as intent signer
    pub near_intents_address: Option<String>,

    /// Base deposit address issued by the bridge
    pub evm_deposit_address: Option<String>,

    /// `ed25519:` secret key controlling `near_account_id`
    pub sudo_key: Option<String>,
}

impl UserAccount {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn has_account(&self) -> bool {
        self.near_account_id.is_some() && self.sudo_key.is_some()
    }
}

impl fmt::Debug for UserAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserAccount")
            .field("id", &self.id)
            .field("near_account_id", &self.near_account_id)
            .field("near_intents_address", &self.near_intents_address)
            .field("evm_deposit_address", &self.evm_deposit_address)
            .field("sudo_key", &self.sudo_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Chains the deposit bridge can issue addresses for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepositChain {
    #[serde(rename = "sol:mainnet")]
    Solana,
    #[serde(rename = "eth:8453")]
    Base,
    #[serde(rename = "btc:mainnet")]
    Bitcoin,
}

impl DepositChain {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepositChain::Solana => "sol:mainnet",
            DepositChain::Base => "eth:8453",
            DepositChain::Bitcoin => "btc:mainnet",
        }
    }
}

impl fmt::Display for DepositChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DepositChain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sol:mainnet" => Ok(DepositChain::Solana),
            "eth:8453" => Ok(DepositChain::Base),
            "btc:mainnet" => Ok(DepositChain::Bitcoin),
            other => Err(format!("unsupported deposit chain: {other}")),
        }
    }
}

/// One leg of a bundle: an asset and its share of the portfolio in percent
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleAllocation {
    pub asset: String,
    pub percentage: Decimal,
}

impl BundleAllocation {
    /// Share in basis points (10% becomes 1000)
    pub fn basis_points(&self) -> Option<u16> {
        (self.percentage * Decimal::ONE_HUNDRED).round().to_u16()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_basis_points() {
        let alloc = BundleAllocation {
            asset: "nep141:wrap.near".to_string(),
            percentage: Decimal::new(125, 1),
        };
        assert_eq!(alloc.basis_points(), Some(1250));

        let negative = BundleAllocation {
            asset: "x".to_string(),
            percentage: Decimal::from(-1),
        };
        assert_eq!(negative.basis_points(), None);
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let session = Session {
            token: "t".to_string(),
            user_id: "u".to_string(),
            expires_at: now + Duration::minutes(5),
        };
        assert!(!session.is_expired(now));
        assert!(session.is_expired(now + Duration::minutes(5)));
    }

    #[test]
    fn test_deposit_chain_round_trip() {
        for chain in [DepositChain::Solana, DepositChain::Base, DepositChain::Bitcoin] {
            assert_eq!(chain.as_str().parse::<DepositChain>().unwrap(), chain);
            assert_eq!(
                serde_json::to_value(chain).unwrap(),
                serde_json::Value::String(chain.to_string())
            );
        }
        assert!("eth:1".parse::<DepositChain>().is_err());
    }

    #[test]
    fn test_user_debug_redacts_key() {
        let mut user = UserAccount::new("u1");
        user.sudo_key = Some("ed25519:secret".to_string());
        let rendered = format!("{user:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
