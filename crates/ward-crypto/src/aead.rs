//! XChaCha20-Poly1305 sealing of wallet blobs.
//!
//! A sealed box is `nonce (24 bytes) || ciphertext || tag (16 bytes)`.
//! Nonces come from OS entropy and are never reused with the same key.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::rngs::OsRng;
use rand::RngCore;
use ward_types::{Result, WardError};

/// Poly1305 tag length.
pub const TAG_LEN: usize = 16;

// ---------------------------------------------------------------------------
// AeadNonce
// ---------------------------------------------------------------------------

/// 192-bit nonce for XChaCha20-Poly1305.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AeadNonce([u8; 24]);

impl AeadNonce {
    /// Fixed byte length of an XChaCha20-Poly1305 nonce.
    pub const LEN: usize = 24;

    /// Creates an [`AeadNonce`] from raw bytes.
    pub fn from_bytes(bytes: [u8; 24]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying 24-byte array.
    pub fn as_bytes(&self) -> &[u8; 24] {
        &self.0
    }
}

/// Generates a fresh random nonce from OS entropy.
pub fn generate_aead_nonce() -> AeadNonce {
    let mut bytes = [0u8; 24];
    OsRng.fill_bytes(&mut bytes);
    AeadNonce(bytes)
}

// ---------------------------------------------------------------------------
// Seal / Open
// ---------------------------------------------------------------------------

/// Encrypts `plaintext` under `key` with an explicit nonce and returns
/// `nonce || ciphertext || tag`.
pub fn seal_with_nonce(key: &[u8; 32], nonce: &AeadNonce, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce.0), plaintext)
        .map_err(|e| WardError::CryptoError {
            reason: format!("XChaCha20-Poly1305 encryption failed: {e}"),
        })?;

    let mut sealed = Vec::with_capacity(AeadNonce::LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce.0);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Encrypts `plaintext` under `key` with a fresh random nonce.
pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>> {
    seal_with_nonce(key, &generate_aead_nonce(), plaintext)
}

/// Opens a box produced by [`seal`].
///
/// # Errors
///
/// [`WardError::CryptoError`] if the box is truncated or the tag does
/// not verify (wrong key or tampered data).
pub fn open(key: &[u8; 32], sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < AeadNonce::LEN + TAG_LEN {
        return Err(WardError::CryptoError {
            reason: format!("sealed box too short: {} bytes", sealed.len()),
        });
    }
    let (nonce, ciphertext) = sealed.split_at(AeadNonce::LEN);

    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|e| WardError::CryptoError {
            reason: format!("XChaCha20-Poly1305 decryption failed: {e}"),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() -> std::result::Result<(), WardError> {
        let key = [0x42u8; 32];
        let sealed = seal(&key, b"abandon abandon art")?;
        assert_eq!(sealed.len(), AeadNonce::LEN + 19 + TAG_LEN);
        assert_eq!(open(&key, &sealed)?, b"abandon abandon art");
        Ok(())
    }

    #[test]
    fn empty_plaintext_roundtrip() -> std::result::Result<(), WardError> {
        let key = [0x01u8; 32];
        let sealed = seal(&key, b"")?;
        assert_eq!(sealed.len(), AeadNonce::LEN + TAG_LEN);
        assert!(open(&key, &sealed)?.is_empty());
        Ok(())
    }

    #[test]
    fn wrong_key_fails_open() -> std::result::Result<(), WardError> {
        let sealed = seal(&[0x42u8; 32], b"secret")?;
        assert!(open(&[0x43u8; 32], &sealed).is_err());
        Ok(())
    }

    #[test]
    fn tampered_box_fails_open() -> std::result::Result<(), WardError> {
        let key = [0x42u8; 32];
        let mut sealed = seal(&key, b"secret")?;
        if let Some(byte) = sealed.last_mut() {
            *byte ^= 0xFF;
        }
        assert!(open(&key, &sealed).is_err());
        Ok(())
    }

    #[test]
    fn truncated_box_rejected() {
        assert!(open(&[0u8; 32], &[0u8; 20]).is_err());
    }

    #[test]
    fn explicit_nonce_is_deterministic() -> std::result::Result<(), WardError> {
        let key = [0xAA; 32];
        let nonce = AeadNonce::from_bytes([0xBB; 24]);
        let a = seal_with_nonce(&key, &nonce, b"determinism")?;
        let b = seal_with_nonce(&key, &nonce, b"determinism")?;
        assert_eq!(a, b);
        assert_eq!(&a[..AeadNonce::LEN], nonce.as_bytes());
        Ok(())
    }

    #[test]
    fn random_nonces_differ() -> std::result::Result<(), WardError> {
        let key = [0x07u8; 32];
        assert_ne!(seal(&key, b"x")?, seal(&key, b"x")?);
        Ok(())
    }
}
