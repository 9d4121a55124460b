//! Core shared types for the Ward wallet.
//!
//! Every crate in the workspace speaks in terms of the types defined
//! here: bech32 [`Address`]es, [`ChainId`]s, the [`SignMode`] tag and
//! the central [`WardError`] enum.

pub mod config;

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use bech32::{FromBase32, ToBase32, Variant};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cosmwasm_std::{Binary, Coin, Uint128};

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// Bech32 account or contract address (`<prefix>1<data><checksum>`).
///
/// Always validated on construction. The human-readable prefix selects
/// the chain family (`inj`, `wasm`, `cosmos`, ...).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parses and validates a bech32 address string.
    pub fn parse(s: &str) -> Result<Self> {
        let (hrp, data, variant) = bech32::decode(s).map_err(|e| WardError::InvalidAddress {
            reason: format!("{s:?} is not valid bech32: {e}"),
        })?;
        if variant != Variant::Bech32 {
            return Err(WardError::InvalidAddress {
                reason: format!("{s:?} uses bech32m, expected bech32"),
            });
        }
        if hrp.is_empty() || data.is_empty() {
            return Err(WardError::InvalidAddress {
                reason: format!("{s:?} has an empty prefix or payload"),
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Encodes raw address bytes under the given human-readable prefix.
    pub fn from_bytes(prefix: &str, bytes: &[u8]) -> Result<Self> {
        let encoded = bech32::encode(prefix, bytes.to_base32(), Variant::Bech32).map_err(|e| {
            WardError::InvalidAddress {
                reason: format!("cannot encode address with prefix {prefix:?}: {e}"),
            }
        })?;
        Ok(Self(encoded))
    }

    /// Returns the decoded address payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let (_, data, _) = bech32::decode(&self.0).map_err(|e| WardError::InvalidAddress {
            reason: format!("{e}"),
        })?;
        Vec::<u8>::from_base32(&data).map_err(|e| WardError::InvalidAddress {
            reason: format!("invalid base32 payload: {e}"),
        })
    }

    /// Human-readable prefix (everything before the last `1`).
    pub fn prefix(&self) -> &str {
        match self.0.rfind('1') {
            Some(idx) => &self.0[..idx],
            None => "",
        }
    }

    /// Returns the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = WardError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = WardError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// ChainId
// ---------------------------------------------------------------------------

/// Cosmos chain identifier such as `injective-888`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(String);

impl ChainId {
    /// Wraps a chain identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChainId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ChainId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for ChainId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// SignMode
// ---------------------------------------------------------------------------

/// Transaction signing mode requested by a caller.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignMode {
    /// Legacy JSON (amino) sign docs.
    Amino,
    /// Protobuf sign docs. Recognized but never signed.
    Direct,
}

impl fmt::Display for SignMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Amino => write!(f, "amino"),
            Self::Direct => write!(f, "direct"),
        }
    }
}

impl FromStr for SignMode {
    type Err = WardError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "amino" => Ok(Self::Amino),
            "direct" => Ok(Self::Direct),
            other => Err(WardError::ProtocolError {
                reason: format!("unknown sign mode {other:?}"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// WardError
// ---------------------------------------------------------------------------

/// Central error type for Ward.
///
/// All crates in the workspace convert their internal errors into
/// variants of this enum. Messages never contain secret material.
#[derive(Debug, Error)]
pub enum WardError {
    /// The password failed to decrypt the stored blob. Any decryption,
    /// parse or derivation failure collapses into this variant so that
    /// callers cannot distinguish the cause.
    #[error("Password does not match.")]
    IncorrectPassword,

    /// No stored account exists for the requested address.
    #[error("address not found: {address}")]
    AddressNotFound {
        /// The address that was looked up, or a description when no
        /// default address is set.
        address: String,
    },

    /// A mnemonic phrase is malformed (word list, count or checksum).
    #[error("invalid mnemonic: {reason}")]
    InvalidMnemonic {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// The chain id is neither the host chain nor a configured slave chain.
    #[error("unknown chain: {chain_id}")]
    UnknownChain {
        /// The unrecognized chain id.
        chain_id: String,
    },

    /// The sign doc's chain id does not match the signer's chain.
    #[error("Chain ID in request does not match account address (expected {expected}, got {actual})")]
    ChainMismatch {
        /// Chain resolved from the signer address.
        expected: String,
        /// Chain carried by the sign doc.
        actual: String,
    },

    /// The requested capability is declared but not implemented.
    #[error("not supported: {reason}")]
    NotSupported {
        /// What was requested.
        reason: String,
    },

    /// The chain rejected a broadcast transaction.
    #[error("broadcast failed with code {code} (tx {tx_hash}): {raw_log}")]
    BroadcastFailure {
        /// Non-zero ABCI result code.
        code: u32,
        /// Raw log returned by the node.
        raw_log: String,
        /// Hash of the rejected transaction.
        tx_hash: String,
    },

    /// The chain has no account for the address yet.
    #[error("account {address} does not exist on chain")]
    AccountNotFound {
        /// Queried address.
        address: String,
    },

    /// A sign doc fails structural validation.
    #[error("invalid sign doc: {reason}")]
    InvalidSignDoc {
        /// Human-readable description of the validation failure.
        reason: String,
    },

    /// The provided address is malformed or fails checksum validation.
    #[error("invalid address: {reason}")]
    InvalidAddress {
        /// Human-readable description of why the address is invalid.
        reason: String,
    },

    /// A cryptographic operation failed (derivation, signing, encryption).
    #[error("crypto error: {reason}")]
    CryptoError {
        /// Human-readable description of the cryptographic failure.
        reason: String,
    },

    /// A storage backend operation failed.
    #[error("storage error: {reason}")]
    StorageError {
        /// Human-readable description of the storage failure.
        reason: String,
    },

    /// A chain RPC call failed at the transport or decoding level.
    #[error("chain error: {reason}")]
    ChainError {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// A relay round trip failed (channel closed, malformed reply).
    #[error("relay error: {reason}")]
    RelayError {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// The user closed the password prompt without signing.
    #[error("signing prompt was dismissed")]
    PromptDismissed,

    /// A relay request did not complete in time.
    #[error("timed out waiting for {operation}")]
    Timeout {
        /// The request type that timed out.
        operation: String,
    },

    /// A configuration value is invalid or missing.
    #[error("config error: {reason}")]
    ConfigError {
        /// Human-readable description of the configuration problem.
        reason: String,
    },

    /// A protocol-level error (serialization, schema, canonical form).
    #[error("protocol error: {reason}")]
    ProtocolError {
        /// Human-readable description of the protocol failure.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Result alias
// ---------------------------------------------------------------------------

/// Convenience result type using [`WardError`].
pub type Result<T> = std::result::Result<T, WardError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
