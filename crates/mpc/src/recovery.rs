use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::hash::{keccak256, to_hex_prefixed};
use crate::normalize::{Secp256k1Signature, SECP256K1_PREFIX};
use crate::SignatureError;

/// Recover the signing key from a 32-byte prehash and a normalized signature
pub fn recover_public_key(
    prehash: &[u8; 32],
    signature: &Secp256k1Signature,
) -> Result<VerifyingKey, SignatureError> {
    let mut rs = [0u8; 64];
    rs[..32].copy_from_slice(&signature.r);
    rs[32..].copy_from_slice(&signature.s);

    let sig = Signature::from_slice(&rs)
        .map_err(|e| SignatureError::MalformedSignature(e.to_string()))?;
    let recovery_id = RecoveryId::from_byte(signature.recovery_id).ok_or_else(|| {
        SignatureError::MalformedSignature(format!(
            "recovery id out of range: {}",
            signature.recovery_id
        ))
    })?;

    VerifyingKey::recover_from_prehash(prehash, &sig, recovery_id)
        .map_err(|e| SignatureError::RecoveryFailed(e.to_string()))
}

/// Parse a NEAR-style `secp256k1:<base58(x || y)>` public key
pub fn parse_public_key(encoded: &str) -> Result<VerifyingKey, SignatureError> {
    let body = encoded
        .strip_prefix(SECP256K1_PREFIX)
        .ok_or_else(|| SignatureError::InvalidPublicKey(format!("missing prefix: {encoded}")))?;
    let raw = bs58::decode(body)
        .into_vec()
        .map_err(|e| SignatureError::InvalidPublicKey(e.to_string()))?;

    let sec1 = match raw.len() {
        64 => {
            let mut uncompressed = Vec::with_capacity(65);
            uncompressed.push(0x04);
            uncompressed.extend_from_slice(&raw);
            uncompressed
        }
        33 | 65 => raw,
        n => {
            return Err(SignatureError::InvalidPublicKey(format!(
                "unexpected key length {n}"
            )))
        }
    };

    VerifyingKey::from_sec1_bytes(&sec1).map_err(|e| SignatureError::InvalidPublicKey(e.to_string()))
}

/// Ethereum-style address: last 20 bytes of keccak256 over the uncompressed key
pub fn derive_evm_address(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    to_hex_prefixed(&hash[12..])
}
