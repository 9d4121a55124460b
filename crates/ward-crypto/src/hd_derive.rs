//! BIP32 secp256k1 derivation.
//!
//! Derives the account signing key from a BIP39 seed along a path such
//! as `m/44'/60'/0'/0`. Both hardened and normal indices are accepted.

use std::str::FromStr;

use bip32::{DerivationPath, XPrv};
use ward_types::{Result, WardError};

use crate::mnemonic::Seed;
use crate::signing::PrivateKey;

/// Parses a derivation path.
///
/// # Errors
///
/// [`WardError::ConfigError`] when the path is malformed.
pub fn parse_path(path: &str) -> Result<DerivationPath> {
    DerivationPath::from_str(path).map_err(|e| WardError::ConfigError {
        reason: format!("invalid derivation path {path:?}: {e}"),
    })
}

/// Derives the private key at `path` from `seed`.
///
/// Intermediate extended keys are zeroized by `bip32` when dropped.
pub fn derive_private_key(seed: &Seed, path: &str) -> Result<PrivateKey> {
    let path = parse_path(path)?;
    let child = XPrv::derive_from_path(seed.as_bytes(), &path).map_err(|e| {
        WardError::CryptoError {
            reason: format!("BIP32 derivation failed: {e}"),
        }
    })?;
    Ok(PrivateKey::from_signing_key(child.private_key().clone()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
