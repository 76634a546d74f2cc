use serde::{Deserialize, Serialize};

/// Threshold signature as returned by the MPC signer contract
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpcSignature {
    pub big_r: AffinePoint,
    pub s: Scalar,
    pub recovery_id: u8,
}

impl MpcSignature {
    pub fn new(big_r: impl Into<String>, s: impl Into<String>, recovery_id: u8) -> Self {
        Self {
            big_r: AffinePoint {
                affine_point: big_r.into(),
            },
            s: Scalar { scalar: s.into() },
            recovery_id,
        }
    }
}

/// Hex-encoded curve point, usually SEC1 compressed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffinePoint {
    pub affine_point: String,
}

/// Hex-encoded scalar
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scalar {
    pub scalar: String,
}
