use sha3::{Digest, Keccak256};

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Ethereum personal-message hash; the length prefix counts bytes, not chars
pub fn erc191_hash(payload: &str) -> [u8; 32] {
    let prefix = format!("\x19Ethereum Signed Message:\n{}", payload.len());
    let mut hasher = Keccak256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(payload.as_bytes());
    hasher.finalize().into()
}

/// `0x` prefixed lowercase hex, the form the proxy contract expects
pub fn to_hex_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_erc191_matches_manual_prefix() {
        let payload = r#"{"a":1}"#;
        let manual = keccak256(format!("\x19Ethereum Signed Message:\n7{payload}").as_bytes());
        assert_eq!(erc191_hash(payload), manual);
    }

    #[test]
    fn test_erc191_hello_world() {
        // eth_sign("hello world")
        assert_eq!(
            hex::encode(erc191_hash("hello world")),
            "d9eba16ed0ecae432b71fe008c98cc872bb4cc214d3220a36f365326cf807d68"
        );
    }

    #[test]
    fn test_erc191_counts_utf8_bytes() {
        let payload = "é";
        let manual = keccak256("\x19Ethereum Signed Message:\n2é".as_bytes());
        assert_eq!(erc191_hash(payload), manual);
    }

    #[test]
    fn test_hex_prefixed() {
        assert_eq!(to_hex_prefixed(&[0xab, 0x01]), "0xab01");
    }
}
