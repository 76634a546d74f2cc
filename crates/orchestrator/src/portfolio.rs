use std::collections::BTreeMap;

use fluxfolio_intents::AssetResolver;
use fluxfolio_rpc::{ContractViewer, FunctionCall, FunctionCaller};
use fluxfolio_types::BundleAllocation;
use serde_json::json;
use tracing::info;

use crate::OrchestratorError;

/// Basis points in a whole portfolio
pub const FULL_PORTFOLIO_BPS: u32 = 10_000;

/// Per-asset target share in basis points, keyed by defuse asset id
pub fn portfolio_spread(
    allocations: &[BundleAllocation],
    assets: &dyn AssetResolver,
) -> Result<BTreeMap<String, u16>, OrchestratorError> {
    let mut spread = BTreeMap::new();
    let mut total: u32 = 0;

    for allocation in allocations {
        let bps = allocation.basis_points().ok_or_else(|| {
            OrchestratorError::InvalidAllocation(format!(
                "{}: {}%",
                allocation.asset, allocation.percentage
            ))
        })?;
        let asset = assets.resolve(&allocation.asset)?;
        let entry = spread.entry(asset).or_insert(0u16);
        *entry = entry.saturating_add(bps);
        total += u32::from(bps);
    }

    if total > FULL_PORTFOLIO_BPS {
        return Err(OrchestratorError::InvalidAllocation(format!(
            "allocations add up to {total} bps"
        )));
    }
    Ok(spread)
}

/// The proxy contract's portfolio registry
pub struct PortfolioRegistry<'a> {
    pub viewer: &'a dyn ContractViewer,
    pub contract_id: &'a str,
    pub deposit: u128,
}

impl PortfolioRegistry<'_> {
    pub async fn is_registered(&self, user_id: &str) -> Result<bool, OrchestratorError> {
        let info = self
            .viewer
            .view(self.contract_id, "get_user_info", json!({ "user_id": user_id }))
            .await?;
        Ok(!info.is_null())
    }

    /// Register `owner`'s portfolio unless the contract already knows it.
    /// Returns whether a portfolio was created.
    pub async fn ensure_portfolio(
        &self,
        owner: &dyn FunctionCaller,
        agent_id: &str,
        intents_address: &str,
        spread: &BTreeMap<String, u16>,
    ) -> Result<bool, OrchestratorError> {
        if self.is_registered(owner.account_id()).await? {
            return Ok(false);
        }

        let call = FunctionCall::new(
            self.contract_id,
            "create_portfolio",
            json!({
                "agent_id": agent_id,
                "near_intents_address": intents_address,
                "portfolio_data": spread,
            }),
        )
        .with_deposit(self.deposit);

        let outcome = owner.function_call(call).await?;
        if let Some(failure) = outcome.failure() {
            return Err(OrchestratorError::UnexpectedResponse(format!(
                "create_portfolio failed: {failure}"
            )));
        }

        info!(
            owner = %owner.account_id(),
            agent = %agent_id,
            assets = spread.len(),
            "Portfolio registered"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxfolio_intents::TokenRegistry;
    use rust_decimal::Decimal;

    fn alloc(asset: &str, percentage: Decimal) -> BundleAllocation {
        BundleAllocation {
            asset: asset.to_string(),
            percentage,
        }
    }

    #[test]
    fn test_spread_in_basis_points() {
        let tokens = TokenRegistry::new()
            .with_token("WNEAR", "nep141:wrap.near")
            .with_token("ETH", "nep141:eth.omft.near");

        let spread = portfolio_spread(
            &[
                alloc("wnear", Decimal::new(605, 1)),
                alloc("ETH", Decimal::new(395, 1)),
            ],
            &tokens,
        )
        .unwrap();

        assert_eq!(spread.get("nep141:wrap.near"), Some(&6050));
        assert_eq!(spread.get("nep141:eth.omft.near"), Some(&3950));
    }

    #[test]
    fn test_spread_rejects_overallocation() {
        let tokens = TokenRegistry::new();
        let err = portfolio_spread(
            &[
                alloc("nep141:a.near", Decimal::from(70)),
                alloc("nep141:b.near", Decimal::from(40)),
            ],
            &tokens,
        )
        .unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidAllocation(_)));
    }

    #[test]
    fn test_spread_rejects_negative_share() {
        let tokens = TokenRegistry::new();
        let err = portfolio_spread(&[alloc("nep141:a.near", Decimal::from(-5))], &tokens)
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidAllocation(_)));
    }
}
