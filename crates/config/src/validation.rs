//! Configuration validation

use std::net::SocketAddr;

use crate::{AppConfig, ConfigError, Result};

/// Validation error details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the entire application configuration
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let errors = collect_validation_errors(config);
    if errors.is_empty() {
        return Ok(());
    }

    let message = errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    Err(ConfigError::ValidationError(message))
}

/// Every problem found in `config`
pub fn collect_validation_errors(config: &AppConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    // network
    if let Err(e) = validate_log_level(&config.network.log_level) {
        errors.push(e);
    }
    if config.network.metrics_enabled && config.network.metrics_port == 0 {
        errors.push(ValidationError::new(
            "network.metrics_port",
            "metrics port must be greater than 0",
        ));
    }

    // near
    let near = &config.near;
    if let Err(e) = validate_url(&near.rpc_url) {
        errors.push(ValidationError::new("near.rpc_url", e));
    }
    for (field, account) in [
        ("near.intents_contract", &near.intents_contract),
        ("near.proxy_contract", &near.proxy_contract),
        ("near.mpc_signer_contract", &near.mpc_signer_contract),
        ("near.registrar", &near.registrar),
        ("near.agent_account_id", &near.agent_account_id),
    ] {
        if let Err(e) = validate_account_id(account) {
            errors.push(ValidationError::new(field, e));
        }
    }
    if let Some(key) = &near.agent_secret_key {
        if !key.starts_with("ed25519:") {
            errors.push(ValidationError::new(
                "near.agent_secret_key",
                "must be an ed25519: key",
            ));
        }
    }
    if near.request_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "near.request_timeout_ms",
            "must be greater than 0",
        ));
    }
    if near.commit_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "near.commit_timeout_ms",
            "must be greater than 0",
        ));
    }

    // relay
    if let Err(e) = validate_url(&config.relay.solver_relay_url) {
        errors.push(ValidationError::new("relay.solver_relay_url", e));
    }
    if let Err(e) = validate_url(&config.relay.bridge_url) {
        errors.push(ValidationError::new("relay.bridge_url", e));
    }
    if config.relay.timeout_ms == 0 {
        errors.push(ValidationError::new(
            "relay.timeout_ms",
            "must be greater than 0",
        ));
    }

    // signature
    if config.signature.poll_interval_ms == 0 {
        errors.push(ValidationError::new(
            "signature.poll_interval_ms",
            "must be greater than 0",
        ));
    }
    if config.signature.timeout_ms < config.signature.poll_interval_ms {
        errors.push(ValidationError::new(
            "signature.timeout_ms",
            "must be at least one poll interval",
        ));
    }
    if config.signature.gas == 0 {
        errors.push(ValidationError::new("signature.gas", "must be greater than 0"));
    }

    // settlement
    if config.settlement.interval_ms == 0 {
        errors.push(ValidationError::new(
            "settlement.interval_ms",
            "must be greater than 0",
        ));
    }
    if config.settlement.max_attempts == 0 {
        errors.push(ValidationError::new(
            "settlement.max_attempts",
            "must be greater than 0",
        ));
    }
    if config.settlement.not_found_grace >= config.settlement.max_attempts {
        errors.push(ValidationError::new(
            "settlement.not_found_grace",
            "must be smaller than settlement.max_attempts",
        ));
    }

    if config.nonce.max_attempts == 0 {
        errors.push(ValidationError::new(
            "nonce.max_attempts",
            "must be greater than 0",
        ));
    }

    if config.intents.ttl_secs <= 0 {
        errors.push(ValidationError::new(
            "intents.ttl_secs",
            "must be greater than 0",
        ));
    }

    // jobs
    if !config.jobs.database_url.starts_with("sqlite:") {
        errors.push(ValidationError::new(
            "jobs.database_url",
            "must be a sqlite: url",
        ));
    }
    if config.jobs.poll_interval_ms == 0 {
        errors.push(ValidationError::new(
            "jobs.poll_interval_ms",
            "must be greater than 0",
        ));
    }

    // api
    if config.api.listen_addr.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "api.listen_addr",
            format!("invalid socket address '{}'", config.api.listen_addr),
        ));
    }
    if config.api.session_ttl_secs <= 0 {
        errors.push(ValidationError::new(
            "api.session_ttl_secs",
            "must be greater than 0",
        ));
    }

    // account
    match config.account.initial_balance_yocto() {
        Ok(0) => errors.push(ValidationError::new(
            "account.initial_balance",
            "must be greater than 0",
        )),
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::new(
            "account.initial_balance",
            e.to_string(),
        )),
    }

    // tokens
    if config.tokens.is_empty() {
        errors.push(ValidationError::new(
            "tokens",
            "at least one token must be configured",
        ));
    }
    for (symbol, id) in &config.tokens {
        if !(id.starts_with("nep141:") || id.starts_with("nep245:")) {
            errors.push(ValidationError::new(
                format!("tokens.{symbol}"),
                format!("'{id}' is not a defuse asset id"),
            ));
        }
    }

    errors
}

/// Validate a URL
pub fn validate_url(url: &str) -> std::result::Result<(), String> {
    if url.is_empty() {
        return Err("URL cannot be empty".to_string());
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err("URL must start with http:// or https://".to_string());
    }

    Ok(())
}

/// NEAR account ids: 2-64 chars of lowercase alphanumerics and `-_.`
pub fn validate_account_id(account_id: &str) -> std::result::Result<(), String> {
    if account_id.is_empty() {
        return Err("account id is required".to_string());
    }
    if account_id.len() < 2 || account_id.len() > 64 {
        return Err(format!("'{account_id}' must be 2 to 64 characters"));
    }
    let valid = account_id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'));
    if !valid {
        return Err(format!("'{account_id}' contains invalid characters"));
    }
    Ok(())
}

fn validate_log_level(level: &str) -> std::result::Result<(), ValidationError> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new(
            "network.log_level",
            format!(
                "invalid log level '{level}', must be one of: trace, debug, info, warn, error"
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.near.agent_account_id = "agent.fluxfolio.near".to_string();
        config
    }

    #[test]
    fn test_defaults_with_agent_are_valid() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_agent_is_reported() {
        let errors = collect_validation_errors(&AppConfig::default());
        assert_eq!(
            errors,
            vec![ValidationError::new(
                "near.agent_account_id",
                "account id is required"
            )]
        );
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = valid_config();
        config.network.log_level = "loud".to_string();
        config.relay.solver_relay_url = "ftp://relay".to_string();
        config.settlement.not_found_grace = 40;
        config.api.listen_addr = "localhost".to_string();
        config
            .tokens
            .insert("BAD".to_string(), "usdc.near".to_string());

        let fields: Vec<_> = collect_validation_errors(&config)
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(
            fields,
            vec![
                "network.log_level",
                "relay.solver_relay_url",
                "settlement.not_found_grace",
                "api.listen_addr",
                "tokens.BAD",
            ]
        );

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("api.listen_addr"));
    }

    #[test]
    fn test_account_id_rules() {
        assert!(validate_account_id("v1.signer").is_ok());
        assert!(validate_account_id("Agent.near").is_err());
        assert!(validate_account_id("a").is_err());
    }
}
