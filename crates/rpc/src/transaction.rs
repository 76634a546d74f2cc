use std::io::Write;

use borsh::BorshSerialize;
use ed25519_dalek::{Signer, SigningKey};
use sha2::{Digest, Sha256};

/// Attached gas for every contract call: 300 Tgas
pub const DEFAULT_GAS: u64 = 300_000_000_000_000;

const ED25519_KEY_TYPE: u8 = 0;

/// ed25519 public key in NEAR's borsh layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(pub [u8; 32]);

impl BorshSerialize for PublicKey {
    fn serialize<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        ED25519_KEY_TYPE.serialize(writer)?;
        writer.write_all(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl BorshSerialize for Signature {
    fn serialize<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        ED25519_KEY_TYPE.serialize(writer)?;
        writer.write_all(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub struct FunctionCallAction {
    pub method_name: String,
    pub args: Vec<u8>,
    pub gas: u64,
    pub deposit: u128,
}

/// Subset of NEAR actions this service submits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    FunctionCall(FunctionCallAction),
    Transfer { deposit: u128 },
}

impl Action {
    // borsh enum discriminants as defined by the protocol
    fn discriminant(&self) -> u8 {
        match self {
            Action::FunctionCall(_) => 2,
            Action::Transfer { .. } => 3,
        }
    }
}

impl BorshSerialize for Action {
    fn serialize<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        self.discriminant().serialize(writer)?;
        match self {
            Action::FunctionCall(call) => call.serialize(writer),
            Action::Transfer { deposit } => deposit.serialize(writer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub struct Transaction {
    pub signer_id: String,
    pub public_key: PublicKey,
    pub nonce: u64,
    pub receiver_id: String,
    pub block_hash: [u8; 32],
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signature: Signature,
}

impl Transaction {
    /// sha256 of the borsh encoding; base58 of this is the transaction hash
    pub fn hash(&self) -> std::io::Result<[u8; 32]> {
        let bytes = self.try_to_vec()?;
        Ok(Sha256::digest(&bytes).into())
    }

    pub fn sign(self, key: &SigningKey) -> std::io::Result<(SignedTransaction, String)> {
        let hash = self.hash()?;
        let signature = key.sign(&hash);
        let signed = SignedTransaction {
            transaction: self,
            signature: Signature(signature.to_bytes()),
        };
        Ok((signed, bs58::encode(hash).into_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::Verifier;

    fn sample_tx(key: &SigningKey) -> Transaction {
        Transaction {
            signer_id: "agent.near".to_string(),
            public_key: PublicKey(key.verifying_key().to_bytes()),
            nonce: 7,
            receiver_id: "proxy.near".to_string(),
            block_hash: [9u8; 32],
            actions: vec![Action::FunctionCall(FunctionCallAction {
                method_name: "m".to_string(),
                args: b"{}".to_vec(),
                gas: DEFAULT_GAS,
                deposit: 0,
            })],
        }
    }

    #[test]
    fn test_borsh_layout() {
        let key = SigningKey::from_bytes(&[1u8; 32]);
        let bytes = sample_tx(&key).try_to_vec().unwrap();

        // signer_id: u32 length prefix + bytes
        assert_eq!(&bytes[0..4], &10u32.to_le_bytes());
        assert_eq!(&bytes[4..14], b"agent.near");
        // public key: key type + 32 bytes
        assert_eq!(bytes[14], 0);
        // nonce follows the key
        assert_eq!(&bytes[47..55], &7u64.to_le_bytes());

        // the last action starts with the function call discriminant
        let actions_start = 55 + 4 + "proxy.near".len() + 32;
        assert_eq!(&bytes[actions_start..actions_start + 4], &1u32.to_le_bytes());
        assert_eq!(bytes[actions_start + 4], 2);
    }

    #[test]
    fn test_sign_verifies_and_hash_is_base58() {
        let key = SigningKey::from_bytes(&[3u8; 32]);
        let tx = sample_tx(&key);
        let expected_hash = tx.hash().unwrap();

        let (signed, hash) = tx.sign(&key).unwrap();
        assert_eq!(bs58::decode(&hash).into_vec().unwrap(), expected_hash.to_vec());

        let sig = ed25519_dalek::Signature::from_bytes(&signed.signature.0);
        assert!(key.verifying_key().verify(&expected_hash, &sig).is_ok());
    }

    #[test]
    fn test_transfer_discriminant() {
        let bytes = Action::Transfer { deposit: 5 }.try_to_vec().unwrap();
        assert_eq!(bytes[0], 3);
        assert_eq!(&bytes[1..], &5u128.to_le_bytes());
    }
}
