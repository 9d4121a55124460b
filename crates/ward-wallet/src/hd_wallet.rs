//! Mnemonic-backed single-account wallet.
//!
//! An [`HdWallet`] holds the phrase plus the derivation options of its
//! one account. It is the unit that gets sealed into, and recovered
//! from, an [`EncryptedBlob`].

use ward_crypto::address::pubkey_to_address;
use ward_crypto::hd_derive::derive_private_key;
use ward_crypto::kdf::Argon2Params;
use ward_crypto::mnemonic::Mnemonic;
use ward_types::config::WardConfig;
use ward_types::{Address, Result, WardError};

use crate::account::AccountWithPrivkey;
use crate::blob::{decrypt_payload, encrypt_payload, AccountDescriptor, EncryptedBlob, WalletPayload};
use crate::password::Password;

/// Where and how the account is derived.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeriveOptions {
    /// BIP32 path.
    pub hd_path: String,
    /// Bech32 prefix of the resulting address.
    pub prefix: String,
}

impl DeriveOptions {
    /// Uses the configured path and the host chain's prefix.
    pub fn from_config(config: &WardConfig) -> Self {
        Self {
            hd_path: config.hd_path.clone(),
            prefix: config.host_chain.prefix.clone(),
        }
    }
}

/// Wallet holding a validated mnemonic.
pub struct HdWallet {
    mnemonic: Mnemonic,
    options: DeriveOptions,
}

// HdWallet does not implement Clone/Debug to prevent leakage.

impl HdWallet {
    /// Validates `phrase` and binds it to `options`.
    ///
    /// # Errors
    ///
    /// [`WardError::InvalidMnemonic`] for a bad phrase.
    pub fn from_mnemonic(phrase: &str, options: DeriveOptions) -> Result<Self> {
        Ok(Self {
            mnemonic: Mnemonic::parse(phrase)?,
            options,
        })
    }

    /// Derivation options.
    pub fn options(&self) -> &DeriveOptions {
        &self.options
    }

    /// Derives the account and its signing key.
    pub fn account(&self) -> Result<AccountWithPrivkey> {
        let seed = self.mnemonic.to_seed()?;
        let private_key = derive_private_key(&seed, &self.options.hd_path)?;
        let address = pubkey_to_address(&self.options.prefix, &private_key.public_key())?;
        Ok(AccountWithPrivkey::new(address, private_key))
    }

    /// Derives only the account address.
    pub fn address(&self) -> Result<Address> {
        Ok(self.account()?.address().clone())
    }

    /// Seals the wallet under `password`.
    pub fn serialize(&self, password: &Password, params: &Argon2Params) -> Result<EncryptedBlob> {
        let payload = WalletPayload {
            mnemonic: self.mnemonic.as_str().to_owned(),
            accounts: vec![AccountDescriptor {
                hd_path: self.options.hd_path.clone(),
                prefix: self.options.prefix.clone(),
            }],
        };
        encrypt_payload(&payload, password, params)
    }

    /// Opens a sealed wallet. Uses the first recorded account.
    pub fn deserialize(blob: &EncryptedBlob, password: &Password) -> Result<Self> {
        let payload = decrypt_payload(blob, password)?;
        let descriptor = payload.accounts.first().ok_or_else(|| WardError::CryptoError {
            reason: "wallet payload lists no accounts".into(),
        })?;
        let options = DeriveOptions {
            hd_path: descriptor.hd_path.clone(),
            prefix: descriptor.prefix.clone(),
        };
        Self::from_mnemonic(&payload.mnemonic, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABANDON_ABOUT: &str = "abandon abandon abandon abandon abandon abandon \
        abandon abandon abandon abandon abandon about";

    fn options() -> DeriveOptions {
        DeriveOptions {
            hd_path: "m/44'/118'/0'/0/0".into(),
            prefix: "cosmos".into(),
        }
    }

    #[test]
    fn derives_known_address() -> std::result::Result<(), WardError> {
        let wallet = HdWallet::from_mnemonic(ABANDON_ABOUT, options())?;
        assert_eq!(
            wallet.address()?.as_str(),
            "cosmos19rl4cm2hmr8afy4kldpxz3fka4jguq0auqdal4"
        );
        Ok(())
    }

    #[test]
    fn serialize_roundtrip_keeps_address() -> std::result::Result<(), WardError> {
        let params = Argon2Params {
            m_cost: 256,
            t_cost: 1,
            p_cost: 1,
        };
        let wallet = HdWallet::from_mnemonic(ABANDON_ABOUT, options())?;
        let blob = wallet.serialize(&Password::new("pw"), &params)?;
        let restored = HdWallet::deserialize(&blob, &Password::new("pw"))?;
        assert_eq!(restored.address()?, wallet.address()?);
        assert_eq!(restored.options(), wallet.options());
        Ok(())
    }

    #[test]
    fn invalid_phrase_rejected() {
        assert!(matches!(
            HdWallet::from_mnemonic("abandon abandon", options()),
            Err(WardError::InvalidMnemonic { .. })
        ));
    }

    #[test]
    fn options_follow_host_chain() {
        let config = WardConfig::default();
        let opts = DeriveOptions::from_config(&config);
        assert_eq!(opts.prefix, "inj");
        assert_eq!(opts.hd_path, "m/44'/60'/0'/0");
    }
}
