//! SHA-256 and RIPEMD-160 digests.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Computes the SHA-256 digest of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

/// Computes the RIPEMD-160 digest of `data`.
pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut out = [0u8; 20];
    out.copy_from_slice(&result);
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_empty() {
        let digest = sha256(b"");
        assert_eq!(digest[..4], [0xe3, 0xb0, 0xc4, 0x42]);
    }

    #[test]
    fn ripemd160_empty() {
        let digest = ripemd160(b"");
        assert_eq!(digest[..4], [0x9c, 0x11, 0x85, 0xa5]);
    }

    #[test]
    fn digests_are_deterministic() {
        assert_eq!(sha256(b"ward"), sha256(b"ward"));
        assert_ne!(sha256(b"ward"), sha256(b"Ward"));
    }
}
