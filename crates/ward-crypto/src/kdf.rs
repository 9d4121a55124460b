//! Argon2id password stretching for wallet blobs.
//!
//! Turns the user's password plus a salt into the 256-bit key that seals
//! the mnemonic. Work factors travel inside each blob, so a blob written
//! with one set of parameters stays readable after the defaults change.

use rand::rngs::OsRng;
use rand::RngCore;
use ward_types::config::KdfConfig;
use ward_types::{Result, WardError};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Salt used by blobs that predate per-blob salts.
pub const LEGACY_SALT: &[u8; 16] = b"The CosmJS salt.";

/// Length of freshly generated salts.
pub const SALT_LEN: usize = 16;

/// Minimum acceptable salt length (the `argon2` crate enforces 8).
const MIN_SALT_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Argon2Params
// ---------------------------------------------------------------------------

/// Argon2id tuning parameters.
///
/// | Parameter | Default | Meaning |
/// |-----------|---------|---------|
/// | `m_cost`  | 12 288  | Memory usage in KiB (12 MiB) |
/// | `t_cost`  | 24      | Number of passes |
/// | `p_cost`  | 1       | Degree of parallelism |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Argon2Params {
    /// Memory cost in KiB. Must be at least 8 × `p_cost`.
    pub m_cost: u32,
    /// Time cost. Must be at least 1.
    pub t_cost: u32,
    /// Parallelism degree. Must be at least 1.
    pub p_cost: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self::from(&KdfConfig::default())
    }
}

impl From<&KdfConfig> for Argon2Params {
    fn from(config: &KdfConfig) -> Self {
        Self {
            m_cost: config.m_cost_kib,
            t_cost: config.t_cost,
            p_cost: config.p_cost,
        }
    }
}

// ---------------------------------------------------------------------------
// DerivedKey
// ---------------------------------------------------------------------------

/// 256-bit key derived by Argon2id. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; 32]);

impl DerivedKey {
    /// Fixed byte length of the derived key.
    pub const LEN: usize = 32;

    /// Returns the raw 32-byte key material.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

// DerivedKey does not implement Clone/Debug to prevent leakage.

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

/// Generates a random salt from OS entropy.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Derives a 256-bit key from a password and salt using Argon2id v1.3.
///
/// # Errors
///
/// - [`WardError::ConfigError`] if the parameters or salt are invalid.
/// - [`WardError::CryptoError`] if the Argon2 computation fails.
pub fn argon2id_derive_key(
    password: &[u8],
    salt: &[u8],
    params: &Argon2Params,
) -> Result<DerivedKey> {
    if salt.len() < MIN_SALT_LEN {
        return Err(WardError::ConfigError {
            reason: format!(
                "salt must be at least {MIN_SALT_LEN} bytes, got {}",
                salt.len()
            ),
        });
    }

    let argon2_params = argon2::Params::new(
        params.m_cost,
        params.t_cost,
        params.p_cost,
        Some(DerivedKey::LEN),
    )
    .map_err(|e| WardError::ConfigError {
        reason: format!("invalid Argon2 parameters: {e}"),
    })?;

    let argon2 = argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2_params,
    );

    let mut output = [0u8; 32];
    argon2
        .hash_password_into(password, salt, &mut output)
        .map_err(|e| WardError::CryptoError {
            reason: format!("Argon2id derivation failed: {e}"),
        })?;

    Ok(DerivedKey(output))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
