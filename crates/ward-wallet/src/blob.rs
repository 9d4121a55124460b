//! Versioned encrypted blob format.
//!
//! # Layout
//!
//! ```json
//! {
//!   "type": "directsecp256k1hdwallet-v1",
//!   "kdf": {
//!     "algorithm": "argon2id",
//!     "params": {"outputLength": 32, "opsLimit": 24, "memLimitKib": 12288, "salt": "<b64>"}
//!   },
//!   "encryption": {"algorithm": "xchacha20poly1305-ietf"},
//!   "data": "<base64(nonce || ciphertext || tag)>"
//! }
//! ```
//!
//! The plaintext is the JSON [`WalletPayload`]. Blobs without a `salt`
//! use [`LEGACY_SALT`]; new blobs always carry a random one.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use ward_crypto::aead::{open, seal};
use ward_crypto::kdf::{argon2id_derive_key, generate_salt, Argon2Params, LEGACY_SALT};
use ward_types::config::{MAX_KDF_LANES, MAX_KDF_MEMORY_KIB, MAX_KDF_PASSES};
use ward_types::{Result, WardError};
use zeroize::{Zeroize, Zeroizing};

use crate::password::Password;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Blob type tag of format version 1.
pub const BLOB_TYPE: &str = "directsecp256k1hdwallet-v1";

/// KDF algorithm tag.
pub const KDF_ALGORITHM: &str = "argon2id";

/// Cipher algorithm tag.
pub const ENCRYPTION_ALGORITHM: &str = "xchacha20poly1305-ietf";

/// Derived key length recorded in every blob.
const OUTPUT_LENGTH: u32 = 32;

// ---------------------------------------------------------------------------
// Blob structure
// ---------------------------------------------------------------------------

/// Argon2id parameters embedded in a blob.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KdfParams {
    /// Derived key length in bytes. Always 32.
    pub output_length: u32,
    /// Argon2 time cost.
    pub ops_limit: u32,
    /// Argon2 memory cost in KiB.
    pub mem_limit_kib: u32,
    /// Argon2 lanes; absent means 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<u32>,
    /// Base64 salt; absent means the legacy fixed salt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

/// Key-derivation section.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct KdfSpec {
    /// Algorithm tag, see [`KDF_ALGORITHM`].
    pub algorithm: String,
    /// Work factors.
    pub params: KdfParams,
}

/// Encryption section.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct EncryptionSpec {
    /// Algorithm tag, see [`ENCRYPTION_ALGORITHM`].
    pub algorithm: String,
}

/// Serialized, password-sealed wallet.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    /// Format tag, see [`BLOB_TYPE`].
    #[serde(rename = "type")]
    pub blob_type: String,
    /// Key derivation.
    pub kdf: KdfSpec,
    /// Cipher.
    pub encryption: EncryptionSpec,
    /// Base64 sealed payload.
    pub data: String,
}

impl EncryptedBlob {
    /// Parses a stored blob.
    ///
    /// # Errors
    ///
    /// [`WardError::StorageError`] if the text is not a blob.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| WardError::StorageError {
            reason: format!("malformed wallet blob: {e}"),
        })
    }

    /// Renders the blob as compact JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| WardError::StorageError {
            reason: format!("failed to serialize wallet blob: {e}"),
        })
    }

    fn check_supported(&self) -> Result<()> {
        if self.blob_type != BLOB_TYPE {
            return Err(unsupported("blob type", &self.blob_type));
        }
        if self.kdf.algorithm != KDF_ALGORITHM {
            return Err(unsupported("kdf", &self.kdf.algorithm));
        }
        if self.encryption.algorithm != ENCRYPTION_ALGORITHM {
            return Err(unsupported("cipher", &self.encryption.algorithm));
        }
        if self.kdf.params.output_length != OUTPUT_LENGTH {
            return Err(WardError::CryptoError {
                reason: format!(
                    "unsupported kdf output length {}",
                    self.kdf.params.output_length
                ),
            });
        }
        Ok(())
    }

    /// Work factors read from the blob, refused above the configured
    /// maxima so a tampered blob cannot exhaust memory.
    fn argon2_params(&self) -> Result<Argon2Params> {
        let params = Argon2Params {
            m_cost: self.kdf.params.mem_limit_kib,
            t_cost: self.kdf.params.ops_limit,
            p_cost: self.kdf.params.parallelism.unwrap_or(1),
        };
        if params.m_cost > MAX_KDF_MEMORY_KIB
            || params.t_cost > MAX_KDF_PASSES
            || params.p_cost > MAX_KDF_LANES
        {
            return Err(WardError::CryptoError {
                reason: format!(
                    "kdf costs out of range: {} KiB, {} passes, {} lanes",
                    params.m_cost, params.t_cost, params.p_cost
                ),
            });
        }
        Ok(params)
    }

    fn salt(&self) -> Result<Vec<u8>> {
        match &self.kdf.params.salt {
            Some(encoded) => STANDARD.decode(encoded).map_err(|e| WardError::CryptoError {
                reason: format!("invalid salt encoding: {e}"),
            }),
            None => Ok(LEGACY_SALT.to_vec()),
        }
    }
}

fn unsupported(what: &str, tag: &str) -> WardError {
    WardError::CryptoError {
        reason: format!("unsupported {what} {tag:?}"),
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// One derived account recorded in the payload.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDescriptor {
    /// BIP32 path.
    pub hd_path: String,
    /// Bech32 prefix.
    pub prefix: String,
}

/// Decrypted blob contents. The mnemonic is wiped on drop.
#[derive(Serialize, Deserialize)]
pub struct WalletPayload {
    /// BIP39 phrase.
    pub mnemonic: String,
    /// Derived accounts; Ward uses only the first.
    pub accounts: Vec<AccountDescriptor>,
}

impl Drop for WalletPayload {
    fn drop(&mut self) {
        self.mnemonic.zeroize();
    }
}

// ---------------------------------------------------------------------------
// Seal / Open
// ---------------------------------------------------------------------------

/// Seals `payload` under `password`.
pub fn encrypt_payload(
    payload: &WalletPayload,
    password: &Password,
    params: &Argon2Params,
) -> Result<EncryptedBlob> {
    let salt = generate_salt();
    let key = argon2id_derive_key(password.expose().as_bytes(), &salt, params)?;

    let plaintext = Zeroizing::new(serde_json::to_vec(payload).map_err(|e| {
        WardError::CryptoError {
            reason: format!("failed to encode wallet payload: {e}"),
        }
    })?);
    let sealed = seal(key.as_bytes(), &plaintext)?;

    Ok(EncryptedBlob {
        blob_type: BLOB_TYPE.into(),
        kdf: KdfSpec {
            algorithm: KDF_ALGORITHM.into(),
            params: KdfParams {
                output_length: OUTPUT_LENGTH,
                ops_limit: params.t_cost,
                mem_limit_kib: params.m_cost,
                parallelism: (params.p_cost != 1).then_some(params.p_cost),
                salt: Some(STANDARD.encode(salt)),
            },
        },
        encryption: EncryptionSpec {
            algorithm: ENCRYPTION_ALGORITHM.into(),
        },
        data: STANDARD.encode(sealed),
    })
}

/// Opens `blob` with `password`.
///
/// Errors are reported faithfully here; the custodian collapses them
/// into `IncorrectPassword` before they reach callers.
pub fn decrypt_payload(blob: &EncryptedBlob, password: &Password) -> Result<WalletPayload> {
    blob.check_supported()?;
    let salt = blob.salt()?;
    let key = argon2id_derive_key(password.expose().as_bytes(), &salt, &blob.argon2_params()?)?;

    let sealed = STANDARD.decode(&blob.data).map_err(|e| WardError::CryptoError {
        reason: format!("invalid blob data encoding: {e}"),
    })?;
    let plaintext = Zeroizing::new(open(key.as_bytes(), &sealed)?);

    serde_json::from_slice(&plaintext).map_err(|e| WardError::CryptoError {
        reason: format!("decrypted payload is not a wallet: {e}"),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn light() -> Argon2Params {
        Argon2Params {
            m_cost: 256,
            t_cost: 1,
            p_cost: 1,
        }
    }

    fn payload() -> WalletPayload {
        WalletPayload {
            mnemonic: "zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo wrong".into(),
            accounts: vec![AccountDescriptor {
                hd_path: "m/44'/60'/0'/0".into(),
                prefix: "inj".into(),
            }],
        }
    }

    #[test]
    fn blob_json_shape() -> std::result::Result<(), WardError> {
        let blob = encrypt_payload(&payload(), &Password::new("pw"), &light())?;
        let value: serde_json::Value = serde_json::from_str(&blob.to_json()?).map_err(|e| {
            WardError::StorageError {
                reason: e.to_string(),
            }
        })?;
        assert_eq!(value["type"], BLOB_TYPE);
        assert_eq!(value["kdf"]["algorithm"], "argon2id");
        assert_eq!(value["kdf"]["params"]["outputLength"], 32);
        assert_eq!(value["kdf"]["params"]["opsLimit"], 1);
        assert_eq!(value["kdf"]["params"]["memLimitKib"], 256);
        assert!(value["kdf"]["params"].get("parallelism").is_none());
        assert_eq!(value["encryption"]["algorithm"], "xchacha20poly1305-ietf");
        Ok(())
    }

    #[test]
    fn encrypt_decrypt_roundtrip() -> std::result::Result<(), WardError> {
        let original = payload();
        let blob = encrypt_payload(&original, &Password::new("pw"), &light())?;
        let parsed = EncryptedBlob::from_json(&blob.to_json()?)?;
        let opened = decrypt_payload(&parsed, &Password::new("pw"))?;
        assert_eq!(opened.mnemonic, original.mnemonic);
        assert_eq!(opened.accounts, original.accounts);
        Ok(())
    }

    #[test]
    fn ciphertext_hides_mnemonic() -> std::result::Result<(), WardError> {
        let blob = encrypt_payload(&payload(), &Password::new("pw"), &light())?;
        assert!(!blob.to_json()?.contains("zoo"));
        Ok(())
    }

    #[test]
    fn wrong_password_fails() -> std::result::Result<(), WardError> {
        let blob = encrypt_payload(&payload(), &Password::new("pw"), &light())?;
        assert!(decrypt_payload(&blob, &Password::new("pW")).is_err());
        Ok(())
    }

    #[test]
    fn legacy_blob_without_salt_uses_fixed_salt() -> std::result::Result<(), WardError> {
        let params = light();
        let key = argon2id_derive_key(b"pw", LEGACY_SALT, &params)?;
        let plaintext = serde_json::to_vec(&payload()).map_err(|e| WardError::CryptoError {
            reason: e.to_string(),
        })?;
        let blob = EncryptedBlob {
            blob_type: BLOB_TYPE.into(),
            kdf: KdfSpec {
                algorithm: KDF_ALGORITHM.into(),
                params: KdfParams {
                    output_length: 32,
                    ops_limit: 1,
                    mem_limit_kib: 256,
                    parallelism: None,
                    salt: None,
                },
            },
            encryption: EncryptionSpec {
                algorithm: ENCRYPTION_ALGORITHM.into(),
            },
            data: STANDARD.encode(seal(key.as_bytes(), &plaintext)?),
        };
        let opened = decrypt_payload(&blob, &Password::new("pw"))?;
        assert_eq!(opened.accounts[0].prefix, "inj");
        Ok(())
    }

    #[test]
    fn unknown_type_rejected() -> std::result::Result<(), WardError> {
        let mut blob = encrypt_payload(&payload(), &Password::new("pw"), &light())?;
        blob.blob_type = "directsecp256k1hdwallet-v2".into();
        assert!(decrypt_payload(&blob, &Password::new("pw")).is_err());
        Ok(())
    }

    #[test]
    fn oversized_kdf_costs_rejected_before_derivation() -> std::result::Result<(), WardError> {
        let mut blob = encrypt_payload(&payload(), &Password::new("pw"), &light())?;
        blob.kdf.params.mem_limit_kib = u32::MAX;
        assert!(matches!(
            decrypt_payload(&blob, &Password::new("pw")),
            Err(WardError::CryptoError { .. })
        ));

        let mut blob = encrypt_payload(&payload(), &Password::new("pw"), &light())?;
        blob.kdf.params.ops_limit = MAX_KDF_PASSES + 1;
        assert!(decrypt_payload(&blob, &Password::new("pw")).is_err());
        Ok(())
    }

    #[test]
    fn malformed_json_is_storage_error() {
        assert!(matches!(
            EncryptedBlob::from_json("{\"type\":1}"),
            Err(WardError::StorageError { .. })
        ));
    }
}
