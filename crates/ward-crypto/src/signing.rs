//! secp256k1 ECDSA keys and signatures.
//!
//! Signatures are produced over a caller-supplied SHA-256 digest and
//! returned in the 64-byte `r || s` form used by Cosmos SDK chains, with
//! `s` normalized to the lower half of the curve order. No recovery byte
//! is appended.

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use ward_types::{Result, WardError};

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// Compressed SEC1 secp256k1 public key (33 bytes).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PublicKey([u8; 33]);

impl PublicKey {
    /// Fixed byte length of a compressed public key.
    pub const LEN: usize = 33;

    /// Parses and validates a compressed public key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::LEN {
            return Err(WardError::CryptoError {
                reason: format!("expected 33-byte public key, got {}", bytes.len()),
            });
        }
        VerifyingKey::from_sec1_bytes(bytes).map_err(|e| WardError::CryptoError {
            reason: format!("invalid secp256k1 public key: {e}"),
        })?;
        let mut arr = [0u8; 33];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Returns the compressed encoding.
    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    fn verifying_key(&self) -> Result<VerifyingKey> {
        VerifyingKey::from_sec1_bytes(&self.0).map_err(|e| WardError::CryptoError {
            reason: format!("invalid secp256k1 public key: {e}"),
        })
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// Fixed-length `r || s` ECDSA signature (64 bytes).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Signature([u8; 64]);

impl Signature {
    /// Fixed byte length of a signature.
    pub const LEN: usize = 64;

    /// Creates a [`Signature`] from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::LEN {
            return Err(WardError::CryptoError {
                reason: format!("expected 64-byte signature, got {}", bytes.len()),
            });
        }
        let mut arr = [0u8; 64];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Returns the underlying 64-byte array.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// PrivateKey
// ---------------------------------------------------------------------------

/// secp256k1 signing key.
///
/// `k256::ecdsa::SigningKey` zeroizes its scalar on drop, so the key
/// material is wiped as soon as this value goes out of scope.
pub struct PrivateKey {
    signing_key: SigningKey,
}

// PrivateKey does not implement Clone/Debug to prevent leakage.

impl PrivateKey {
    /// Wraps an existing signing key.
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        Self { signing_key }
    }

    /// Builds a key from a 32-byte big-endian scalar.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let signing_key = SigningKey::from_slice(bytes).map_err(|e| WardError::CryptoError {
            reason: format!("invalid secp256k1 private key: {e}"),
        })?;
        Ok(Self { signing_key })
    }

    /// Returns the compressed public key.
    pub fn public_key(&self) -> PublicKey {
        let point = self.signing_key.verifying_key().to_encoded_point(true);
        let mut arr = [0u8; 33];
        arr.copy_from_slice(point.as_bytes());
        PublicKey(arr)
    }

    /// Signs a 32-byte digest and returns a low-S `r || s` signature.
    pub fn sign_prehash(&self, digest: &[u8; 32]) -> Result<Signature> {
        let sig = PrehashSigner::<EcdsaSignature>::sign_prehash(&self.signing_key, digest)
            .map_err(|e| WardError::CryptoError {
                reason: format!("secp256k1 signing failed: {e}"),
            })?;
        let sig = sig.normalize_s().unwrap_or(sig);
        Signature::from_bytes(&sig.to_bytes())
    }
}

/// Verifies a signature over a 32-byte digest.
///
/// # Errors
///
/// [`WardError::CryptoError`] if the key or signature is malformed or
/// the signature does not verify.
pub fn verify_prehash(public_key: &PublicKey, digest: &[u8; 32], signature: &Signature) -> Result<()> {
    let sig = EcdsaSignature::from_slice(signature.as_bytes()).map_err(|e| WardError::CryptoError {
        reason: format!("malformed signature: {e}"),
    })?;
    public_key
        .verifying_key()?
        .verify_prehash(digest, &sig)
        .map_err(|_| WardError::CryptoError {
            reason: "signature verification failed".into(),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
