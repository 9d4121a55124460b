//! Decrypted account handed to a single caller.

use ward_crypto::signing::{PrivateKey, PublicKey};
use ward_types::Address;

/// The wallet's account together with its signing key.
///
/// Produced by the custodian for one operation and dropped afterwards;
/// the key scalar is wiped when the value goes out of scope.
pub struct AccountWithPrivkey {
    address: Address,
    public_key: PublicKey,
    private_key: PrivateKey,
}

// AccountWithPrivkey does not implement Clone/Debug to prevent leakage.

impl AccountWithPrivkey {
    pub(crate) fn new(address: Address, private_key: PrivateKey) -> Self {
        Self {
            address,
            public_key: private_key.public_key(),
            private_key,
        }
    }

    /// Bech32 account address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Compressed secp256k1 public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Signing key.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }
}
