//! Cosmos account addresses.
//!
//! `address = bech32(prefix, RIPEMD-160(SHA-256(compressed_pubkey)))`.

use ward_types::{Address, Result};

use crate::hash::{ripemd160, sha256};
use crate::signing::PublicKey;

/// Derives the bech32 account address of `public_key` under `prefix`.
pub fn pubkey_to_address(prefix: &str, public_key: &PublicKey) -> Result<Address> {
    let hash = ripemd160(&sha256(public_key.as_bytes()));
    Address::from_bytes(prefix, &hash)
}
