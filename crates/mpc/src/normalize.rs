use fluxfolio_types::MpcSignature;

use crate::SignatureError;

/// Algorithm prefix of the transport signature format
pub const SECP256K1_PREFIX: &str = "secp256k1:";

/// r, s and recovery id in fixed-width form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Secp256k1Signature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub recovery_id: u8,
}

impl Secp256k1Signature {
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.recovery_id;
        out
    }

    /// `secp256k1:<base58(r || s || v)>`
    pub fn encode(&self) -> String {
        format!(
            "{SECP256K1_PREFIX}{}",
            bs58::encode(self.to_bytes()).into_string()
        )
    }

    pub fn decode(encoded: &str) -> Result<Self, SignatureError> {
        let body = encoded.strip_prefix(SECP256K1_PREFIX).ok_or_else(|| {
            SignatureError::MalformedSignature(format!("missing {SECP256K1_PREFIX} prefix"))
        })?;

        let bytes = bs58::decode(body)
            .into_vec()
            .map_err(|e| SignatureError::MalformedSignature(e.to_string()))?;
        if bytes.len() != 65 {
            return Err(SignatureError::MalformedSignature(format!(
                "expected 65 bytes, got {}",
                bytes.len()
            )));
        }

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok(Self {
            r,
            s,
            recovery_id: bytes[64],
        })
    }
}

impl TryFrom<&MpcSignature> for Secp256k1Signature {
    type Error = SignatureError;

    fn try_from(sig: &MpcSignature) -> Result<Self, Self::Error> {
        let mut r_hex = strip_0x(&sig.big_r.affine_point);
        if !r_hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(SignatureError::MalformedSignature(
                "r is not a hex string".to_string(),
            ));
        }
        // compressed point: the first byte is the parity prefix
        if r_hex.len() == 66 {
            r_hex = &r_hex[2..];
        }
        let r = fixed_32(r_hex, "r")?;
        let s = fixed_32(strip_0x(&sig.s.scalar), "s")?;

        if sig.recovery_id > 3 {
            return Err(SignatureError::MalformedSignature(format!(
                "recovery id out of range: {}",
                sig.recovery_id
            )));
        }

        Ok(Self {
            r,
            s,
            recovery_id: sig.recovery_id,
        })
    }
}

/// Normalize an MPC signature into the transport format
pub fn to_secp256k1(sig: &MpcSignature) -> Result<String, SignatureError> {
    Secp256k1Signature::try_from(sig).map(|s| s.encode())
}

fn strip_0x(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

/// Left-pad to 64 hex chars and decode
fn fixed_32(hex_value: &str, field: &str) -> Result<[u8; 32], SignatureError> {
    if hex_value.len() > 64 {
        return Err(SignatureError::MalformedSignature(format!(
            "{field} is {} hex chars, expected at most 64",
            hex_value.len()
        )));
    }

    let padded = format!("{hex_value:0>64}");
    let mut out = [0u8; 32];
    hex::decode_to_slice(&padded, &mut out)
        .map_err(|e| SignatureError::MalformedSignature(format!("{field}: {e}")))?;
    Ok(out)
}
