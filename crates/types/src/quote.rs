use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A solver relay quote for swapping one defuse asset into another
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub quote_hash: String,

    #[serde(rename = "defuse_asset_identifier_in")]
    pub asset_in: String,

    #[serde(rename = "defuse_asset_identifier_out")]
    pub asset_out: String,

    /// Base units, decimal integer string
    pub amount_in: String,

    /// Base units, decimal integer string
    pub amount_out: String,

    /// RFC 3339 timestamp as returned by the relay
    pub expiration_time: String,
}

impl Quote {
    pub fn new(
        quote_hash: impl Into<String>,
        asset_in: impl Into<String>,
        asset_out: impl Into<String>,
        amount_in: impl Into<String>,
        amount_out: impl Into<String>,
        expiration_time: impl Into<String>,
    ) -> Self {
        Self {
            quote_hash: quote_hash.into(),
            asset_in: asset_in.into(),
            asset_out: asset_out.into(),
            amount_in: amount_in.into(),
            amount_out: amount_out.into(),
            expiration_time: expiration_time.into(),
        }
    }

    /// Parsed expiration of this quote
    pub fn expires_at(&self) -> Result<DateTime<Utc>, QuoteError> {
        parse_expiration(&self.expiration_time)
    }
}

/// Parameters of a `quote` relay request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub defuse_asset_identifier_in: String,
    pub defuse_asset_identifier_out: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact_amount_in: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact_amount_out: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_deadline_ms: Option<u64>,
}

impl QuoteRequest {
    pub fn exact_in(
        asset_in: impl Into<String>,
        asset_out: impl Into<String>,
        amount_in: impl Into<String>,
    ) -> Self {
        Self {
            defuse_asset_identifier_in: asset_in.into(),
            defuse_asset_identifier_out: asset_out.into(),
            exact_amount_in: Some(amount_in.into()),
            exact_amount_out: None,
            min_deadline_ms: None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuoteError {
    #[error("invalid expiration time: {0}")]
    InvalidExpiration(String),
}

/// Parse an expiration given either as RFC 3339 or as integer unix seconds
pub fn parse_expiration(raw: &str) -> Result<DateTime<Utc>, QuoteError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .ok_or_else(|| QuoteError::InvalidExpiration(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_uses_relay_field_names() {
        let json = r#"{
            "quote_hash": "h1",
            "defuse_asset_identifier_in": "nep141:usdc.near",
            "defuse_asset_identifier_out": "nep141:wrap.near",
            "amount_in": "1000000",
            "amount_out": "250000000000000000000000",
            "expiration_time": "2025-03-01T12:00:00.000Z"
        }"#;

        let quote: Quote = serde_json::from_str(json).unwrap();
        assert_eq!(quote.asset_in, "nep141:usdc.near");
        assert_eq!(quote.asset_out, "nep141:wrap.near");

        let back = serde_json::to_value(&quote).unwrap();
        assert_eq!(back["defuse_asset_identifier_out"], "nep141:wrap.near");
    }

    #[test]
    fn test_parse_expiration_formats() {
        let rfc = parse_expiration("2025-03-01T12:00:00.000Z").unwrap();
        assert_eq!(rfc.timestamp(), 1_740_830_400);

        let secs = parse_expiration("80").unwrap();
        assert_eq!(secs.timestamp(), 80);

        assert!(matches!(
            parse_expiration("tomorrow"),
            Err(QuoteError::InvalidExpiration(_))
        ));
    }

    #[test]
    fn test_quote_request_skips_unset_fields() {
        let req = QuoteRequest::exact_in("nep141:a", "nep141:b", "10");
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["exact_amount_in"], "10");
        assert!(value.get("exact_amount_out").is_none());
        assert!(value.get("min_deadline_ms").is_none());
    }
}
