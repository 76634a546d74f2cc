//! Configuration loading from files and the environment

use std::path::Path;

use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use tracing::debug;

use crate::{validate_config, AppConfig, ConfigError, Result};

/// Prefix of environment overrides, e.g. `FLUXFOLIO_NEAR__RPC_URL`
pub const ENV_PREFIX: &str = "FLUXFOLIO";

/// Configuration loader with support for multiple formats and sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    ///
    /// Supports TOML, YAML, and JSON formats based on file extension
    pub fn from_file(path: &Path) -> Result<AppConfig> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::LoadError("No file extension found".to_string()))?;

        let content = std::fs::read_to_string(path)?;

        match extension {
            "toml" => Self::from_toml(&content),
            "yaml" | "yml" => Self::from_yaml(&content),
            "json" => Self::from_json(&content),
            _ => Err(ConfigError::LoadError(format!(
                "Unsupported file extension: {extension}"
            ))),
        }
    }

    pub fn from_toml(content: &str) -> Result<AppConfig> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    pub fn from_yaml(content: &str) -> Result<AppConfig> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    pub fn from_json(content: &str) -> Result<AppConfig> {
        serde_json::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration from `FLUXFOLIO_`-prefixed environment variables
    pub fn from_env() -> Result<AppConfig> {
        Self::from_env_with_prefix(ENV_PREFIX)
    }

    /// Load configuration from environment variables with a custom prefix.
    ///
    /// Sections and keys are separated by a double underscore:
    /// `FLUXFOLIO_RELAY__TIMEOUT_MS=8000` sets `relay.timeout_ms`.
    pub fn from_env_with_prefix(prefix: &str) -> Result<AppConfig> {
        Self::builder().add_env(prefix).build()
    }

    /// The service's standard layering: defaults, then `path` if given, then
    /// environment overrides, validated
    pub fn load(path: Option<&Path>) -> Result<AppConfig> {
        let mut builder = Self::builder();
        if let Some(path) = path {
            builder = builder.add_file(path, true);
        }
        builder.add_env(ENV_PREFIX).validate(true).build()
    }

    /// Build configuration from several layered sources; later sources win
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder {
            builder: Config::builder(),
            validate: false,
        }
    }
}

/// Builder for layered configuration loading
pub struct ConfigLoaderBuilder {
    builder: ConfigBuilder<config::builder::DefaultState>,
    validate: bool,
}

impl ConfigLoaderBuilder {
    /// Add a configuration file source
    pub fn add_file(mut self, path: &Path, required: bool) -> Self {
        let format = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            _ => FileFormat::Toml,
        };

        debug!(path = %path.display(), ?format, required, "Adding config file");
        self.builder = self
            .builder
            .add_source(File::from(path).format(format).required(required));
        self
    }

    /// Add environment variable source with prefix
    pub fn add_env(mut self, prefix: &str) -> Self {
        self.builder = self.builder.add_source(
            Environment::with_prefix(prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
        self
    }

    /// Set a default value for a key such as `relay.timeout_ms`
    pub fn set_default(mut self, key: &str, value: &str) -> Result<Self> {
        self.builder = self.builder.set_default(key, value)?;
        Ok(self)
    }

    /// Force a value regardless of other sources
    pub fn set_override(mut self, key: &str, value: &str) -> Result<Self> {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Run [`validate_config`] on the result
    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Result<AppConfig> {
        let config: AppConfig = self.builder.build()?.try_deserialize()?;
        if self.validate {
            validate_config(&config)?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_toml() {
        let toml = r#"
            [network]
            environment = "testnet"
            log_level = "debug"
            json_logs = true

            [near]
            agent_account_id = "agent.testnet"
            registrar = "testnet"

            [settlement]
            max_attempts = 10

            [tokens]
            USDC = "nep141:usdc.testnet"
        "#;

        let config = ConfigLoader::from_toml(toml).unwrap();
        assert_eq!(config.network.environment, crate::Environment::Testnet);
        assert!(config.network.json_logs);
        assert_eq!(config.near.agent_account_id, "agent.testnet");
        assert_eq!(config.near.intents_contract, "intents.near");
        assert_eq!(config.settlement.max_attempts, 10);
        assert_eq!(config.settlement.interval_ms, 2_000);
        assert_eq!(config.tokens.len(), 1);
    }

    #[test]
    fn test_load_from_yaml() {
        let yaml = r#"
network:
  log_level: warn
relay:
  timeout_ms: 8000
jobs:
  database_url: "sqlite::memory:"
        "#;

        let config = ConfigLoader::from_yaml(yaml).unwrap();
        assert_eq!(config.network.log_level, "warn");
        assert_eq!(config.relay.timeout_ms, 8_000);
        assert_eq!(config.jobs.database_url, "sqlite::memory:");
        assert_eq!(config.signature.timeout_ms, 400_000);
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"
{
  "signature": { "poll_interval_ms": 1000, "timeout_ms": 60000 },
  "account": { "initial_balance": "1.25" }
}
        "#;

        let config = ConfigLoader::from_json(json).unwrap();
        assert_eq!(config.signature.poll_interval_ms, 1_000);
        assert_eq!(
            config.account.initial_balance_yocto().unwrap(),
            1_250_000_000_000_000_000_000_000
        );
    }

    #[test]
    fn test_load_from_file() {
        let toml = r#"
[api]
listen_addr = "127.0.0.1:8080"
        "#;

        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(toml.as_bytes()).unwrap();

        let config = ConfigLoader::from_file(file.path()).unwrap();
        assert_eq!(config.api.listen_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new()
            .suffix(".ini")
            .tempfile()
            .unwrap();
        assert!(matches!(
            ConfigLoader::from_file(file.path()),
            Err(ConfigError::LoadError(_))
        ));
    }
}
