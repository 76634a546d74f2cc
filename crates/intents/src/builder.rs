use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, SecondsFormat, Utc};
use fluxfolio_types::{
    withdraw_memo, DefuseIntents, IntentOperation, Quote, DEFAULT_VERIFYING_CONTRACT,
};
use num_bigint::{BigInt, BigUint};
use tracing::{debug, info};

use crate::assets::{token_contract, AssetResolver};
use crate::{IntentError, NonceService};

/// Default lifetime of a withdrawal intent
pub const DEFAULT_INTENT_TTL_SECS: i64 = 300;

/// A swap intent ready to be signed, with the quotes it settles against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapIntent {
    pub intents: DefuseIntents,
    pub quote_hashes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawRequest {
    pub asset: String,
    /// Base units, decimal integer string
    pub amount: String,
    pub destination: String,
    /// RFC 3339; defaults to now plus the builder's ttl
    pub deadline: Option<String>,
}

/// Builds unsigned intents from quotes or withdraw requests
#[derive(Clone)]
pub struct IntentBuilder {
    nonces: NonceService,
    assets: Arc<dyn AssetResolver>,
    verifying_contract: String,
    ttl: Duration,
}

impl IntentBuilder {
    pub fn new(nonces: NonceService, assets: Arc<dyn AssetResolver>) -> Self {
        Self {
            nonces,
            assets,
            verifying_contract: DEFAULT_VERIFYING_CONTRACT.to_string(),
            ttl: Duration::seconds(DEFAULT_INTENT_TTL_SECS),
        }
    }

    pub fn with_verifying_contract(mut self, contract_id: impl Into<String>) -> Self {
        self.verifying_contract = contract_id.into();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Aggregate `quotes` into a single `token_diff` intent whose deadline is
    /// the earliest quote expiration.
    pub async fn build_swap_intent(
        &self,
        quotes: &[Quote],
        signer_id: &str,
    ) -> Result<SwapIntent, IntentError> {
        if quotes.is_empty() {
            return Err(IntentError::EmptyQuoteSet);
        }

        let resolved = quotes
            .iter()
            .map(|q| {
                Ok(Quote {
                    asset_in: self.assets.resolve(&q.asset_in)?,
                    asset_out: self.assets.resolve(&q.asset_out)?,
                    ..q.clone()
                })
            })
            .collect::<Result<Vec<_>, IntentError>>()?;

        let diff = aggregate_diff(&resolved)?
            .into_iter()
            .map(|(asset, amount)| (asset, amount.to_string()))
            .collect::<BTreeMap<_, _>>();
        let deadline = earliest_deadline(&resolved)?;

        let signer_id = signer_id.to_lowercase();
        let nonce = self.nonces.generate_nonce(&signer_id).await?;

        debug!(signer_id = %signer_id, quotes = quotes.len(), ?diff, "Aggregated token diff");
        info!(
            signer_id = %signer_id,
            deadline = %deadline,
            assets = diff.len(),
            "Built swap intent"
        );

        Ok(SwapIntent {
            intents: DefuseIntents {
                signer_id,
                deadline,
                nonce,
                verifying_contract: self.verifying_contract.clone(),
                intents: vec![IntentOperation::TokenDiff { diff }],
            },
            quote_hashes: quotes.iter().map(|q| q.quote_hash.clone()).collect(),
        })
    }

    /// Single `ft_withdraw` intent sending `amount` of `asset` to `destination`
    pub async fn build_withdraw_intent(
        &self,
        signer_id: &str,
        request: &WithdrawRequest,
    ) -> Result<DefuseIntents, IntentError> {
        request
            .amount
            .parse::<BigUint>()
            .map_err(|_| IntentError::InvalidAmount(request.amount.clone()))?;

        let defuse_id = self.assets.resolve(&request.asset)?;
        let token = token_contract(&defuse_id).to_string();
        let deadline = match &request.deadline {
            Some(deadline) => deadline.clone(),
            None => (Utc::now() + self.ttl).to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        let signer_id = signer_id.to_lowercase();
        let nonce = self.nonces.generate_nonce(&signer_id).await?;

        info!(
            signer_id = %signer_id,
            token = %token,
            amount = %request.amount,
            "Built withdraw intent"
        );

        Ok(DefuseIntents {
            signer_id,
            deadline,
            nonce,
            verifying_contract: self.verifying_contract.clone(),
            intents: vec![IntentOperation::FtWithdraw {
                receiver_id: token.clone(),
                token,
                amount: request.amount.clone(),
                memo: Some(withdraw_memo(&request.destination)),
            }],
        })
    }
}

/// Net per-asset balance change across `quotes`: `amount_in` is debited
/// from the input asset and `amount_out` credited to the output asset.
pub fn aggregate_diff(quotes: &[Quote]) -> Result<BTreeMap<String, BigInt>, IntentError> {
    let mut diff: BTreeMap<String, BigInt> = BTreeMap::new();

    for quote in quotes {
        let amount_in = parse_amount(quote, &quote.amount_in)?;
        let amount_out = parse_amount(quote, &quote.amount_out)?;

        *diff.entry(quote.asset_in.clone()).or_default() -= amount_in;
        *diff.entry(quote.asset_out.clone()).or_default() += amount_out;
    }

    Ok(diff)
}

/// Expiration string of the soonest-expiring quote, verbatim
pub fn earliest_deadline(quotes: &[Quote]) -> Result<String, IntentError> {
    let mut earliest = None;
    for quote in quotes {
        let expires_at = quote.expires_at().map_err(|e| IntentError::InvalidQuote {
            quote_hash: quote.quote_hash.clone(),
            reason: e.to_string(),
        })?;

        match earliest {
            Some((current, _)) if current <= expires_at => {}
            _ => earliest = Some((expires_at, &quote.expiration_time)),
        }
    }

    earliest
        .map(|(_, raw)| raw.clone())
        .ok_or(IntentError::EmptyQuoteSet)
}

fn parse_amount(quote: &Quote, raw: &str) -> Result<BigInt, IntentError> {
    raw.parse::<BigUint>()
        .map(BigInt::from)
        .map_err(|_| IntentError::InvalidQuote {
            quote_hash: quote.quote_hash.clone(),
            reason: format!("amount is not a non-negative integer: {raw}"),
        })
}
