use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;

use crate::transaction::PublicKey;
use crate::RpcError;

const ED25519_PREFIX: &str = "ed25519:";

/// An account id with the full-access key that signs for it
#[derive(Clone)]
pub struct InMemorySigner {
    pub account_id: String,
    signing_key: SigningKey,
}

impl std::fmt::Debug for InMemorySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySigner")
            .field("account_id", &self.account_id)
            .field("public_key", &self.public_key_string())
            .finish()
    }
}

impl InMemorySigner {
    pub fn new(account_id: impl Into<String>, signing_key: SigningKey) -> Self {
        Self {
            account_id: account_id.into(),
            signing_key,
        }
    }

    /// Parse a NEAR secret key string (`ed25519:<base58>`), either the 64-byte
    /// keypair form or a bare 32-byte seed.
    pub fn from_secret_key(account_id: impl Into<String>, secret: &str) -> Result<Self, RpcError> {
        let encoded = secret
            .strip_prefix(ED25519_PREFIX)
            .ok_or_else(|| RpcError::InvalidKey("expected ed25519: prefix".to_string()))?;

        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| RpcError::InvalidKey(e.to_string()))?;

        let seed: [u8; 32] = match bytes.len() {
            32 | 64 => bytes[..32]
                .try_into()
                .map_err(|_| RpcError::InvalidKey("bad seed".to_string()))?,
            n => {
                return Err(RpcError::InvalidKey(format!(
                    "expected 32 or 64 bytes, got {n}"
                )))
            }
        };

        let signing_key = SigningKey::from_bytes(&seed);
        if bytes.len() == 64 && bytes[32..] != signing_key.verifying_key().to_bytes() {
            return Err(RpcError::InvalidKey(
                "public half does not match secret".to_string(),
            ));
        }

        Ok(Self::new(account_id, signing_key))
    }

    /// Fresh random key for a new account
    pub fn generate(account_id: impl Into<String>) -> Self {
        Self::new(account_id, SigningKey::generate(&mut OsRng))
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    pub fn public_key_string(&self) -> String {
        format!(
            "{ED25519_PREFIX}{}",
            bs58::encode(self.signing_key.verifying_key().to_bytes()).into_string()
        )
    }

    /// Keypair form accepted by NEAR tooling
    pub fn secret_key_string(&self) -> String {
        let mut keypair = [0u8; 64];
        keypair[..32].copy_from_slice(&self.signing_key.to_bytes());
        keypair[32..].copy_from_slice(&self.signing_key.verifying_key().to_bytes());
        format!("{ED25519_PREFIX}{}", bs58::encode(keypair).into_string())
    }
}
