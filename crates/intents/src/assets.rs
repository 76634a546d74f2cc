use std::collections::HashMap;

use crate::IntentError;

const DEFUSE_PREFIXES: [&str; 2] = ["nep141:", "nep245:"];

/// Maps user-facing asset names to defuse asset identifiers
pub trait AssetResolver: Send + Sync {
    fn resolve(&self, asset: &str) -> Result<String, IntentError>;
}

/// Static symbol table, e.g. `USDC` to `nep141:17208628f84f5d6ad33f0da3bbbeb27ffcb398eac501a31bd6ad2011e36133a1`
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    by_symbol: HashMap<String, String>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, symbol: &str, defuse_id: impl Into<String>) -> Self {
        self.insert(symbol, defuse_id);
        self
    }

    pub fn insert(&mut self, symbol: &str, defuse_id: impl Into<String>) {
        self.by_symbol.insert(symbol.to_uppercase(), defuse_id.into());
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

impl<S: AsRef<str>, T: Into<String>> FromIterator<(S, T)> for TokenRegistry {
    fn from_iter<I: IntoIterator<Item = (S, T)>>(iter: I) -> Self {
        let mut registry = TokenRegistry::new();
        for (symbol, id) in iter {
            registry.insert(symbol.as_ref(), id);
        }
        registry
    }
}

impl AssetResolver for TokenRegistry {
    fn resolve(&self, asset: &str) -> Result<String, IntentError> {
        if is_defuse_id(asset) {
            return Ok(asset.to_string());
        }

        self.by_symbol
            .get(&asset.to_uppercase())
            .cloned()
            .ok_or_else(|| IntentError::AssetResolution(asset.to_string()))
    }
}

pub fn is_defuse_id(asset: &str) -> bool {
    DEFUSE_PREFIXES.iter().any(|p| asset.starts_with(p))
}

/// Token contract behind a `nep141:` identifier
pub fn token_contract(defuse_id: &str) -> &str {
    defuse_id.strip_prefix("nep141:").unwrap_or(defuse_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_symbol_case_insensitive() {
        let registry = TokenRegistry::new().with_token("usdc", "nep141:usdc.near");
        assert_eq!(registry.resolve("USDC").unwrap(), "nep141:usdc.near");
        assert_eq!(registry.resolve("Usdc").unwrap(), "nep141:usdc.near");
    }

    #[test]
    fn test_defuse_ids_pass_through() {
        let registry = TokenRegistry::new();
        assert_eq!(
            registry.resolve("nep141:wrap.near").unwrap(),
            "nep141:wrap.near"
        );
        assert_eq!(
            registry.resolve("nep245:v2_1.omni.hot.tg:56_11111").unwrap(),
            "nep245:v2_1.omni.hot.tg:56_11111"
        );
    }

    #[test]
    fn test_unknown_symbol() {
        let registry: TokenRegistry = [("ETH", "nep141:eth.omft.near")].into_iter().collect();
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.resolve("DOGE"),
            Err(IntentError::AssetResolution("DOGE".to_string()))
        );
    }

    #[test]
    fn test_token_contract() {
        assert_eq!(token_contract("nep141:usdc.near"), "usdc.near");
        assert_eq!(token_contract("usdc.near"), "usdc.near");
    }
}
