//! Amino sign documents.
//!
//! The bytes that get hashed and signed are the document's JSON with
//! object keys sorted at every depth, no insignificant whitespace, and
//! `&`, `<`, `>` written as `\u0026`, `\u003c`, `\u003e`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ward_crypto::signing::{PublicKey, Signature};
use ward_types::{Coin, Result, WardError};

use crate::wrap::WrappedMessage;

/// Amino type of a compressed secp256k1 public key.
pub const PUBKEY_TYPE: &str = "tendermint/PubKeySecp256k1";

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// Transaction fee.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct StdFee {
    /// Fee coins; empty for zero-fee chains.
    pub amount: Vec<Coin>,
    /// Gas limit as a decimal string.
    pub gas: String,
    /// Explicit fee payer. The signer pays when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
    /// Fee granter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granter: Option<String>,
}

/// Legacy amino sign document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StdSignDoc {
    pub chain_id: String,
    pub account_number: String,
    pub sequence: String,
    pub fee: StdFee,
    pub msgs: Vec<Value>,
    pub memo: String,
}

impl StdSignDoc {
    /// Canonical bytes covered by the signature.
    pub fn sign_bytes(&self) -> Result<Vec<u8>> {
        let value = serde_json::to_value(self).map_err(|e| WardError::InvalidSignDoc {
            reason: format!("sign doc is not serializable: {e}"),
        })?;
        Ok(canonical_json(&value)?.into_bytes())
    }

    /// Parses a numeric document field.
    pub(crate) fn parse_number(field: &str, value: &str) -> Result<u64> {
        value.parse().map_err(|_| WardError::InvalidSignDoc {
            reason: format!("{field} {value:?} is not an unsigned integer"),
        })
    }
}

// ---------------------------------------------------------------------------
// Signed output
// ---------------------------------------------------------------------------

/// Amino JSON public key.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PubKeyJson {
    #[serde(rename = "type")]
    pub key_type: String,
    /// Base64 compressed key.
    pub value: String,
}

/// Signature with the key that produced it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StdSignature {
    pub pub_key: PubKeyJson,
    /// Base64 `r || s`.
    pub signature: String,
}

impl StdSignature {
    pub(crate) fn new(public_key: &PublicKey, signature: &Signature) -> Self {
        Self {
            pub_key: PubKeyJson {
                key_type: PUBKEY_TYPE.into(),
                value: STANDARD.encode(public_key.as_bytes()),
            },
            signature: STANDARD.encode(signature.as_bytes()),
        }
    }

    /// Decoded public key.
    pub fn public_key(&self) -> Result<PublicKey> {
        if self.pub_key.key_type != PUBKEY_TYPE {
            return Err(WardError::CryptoError {
                reason: format!("unsupported public key type {:?}", self.pub_key.key_type),
            });
        }
        PublicKey::from_bytes(&decode_b64(&self.pub_key.value)?)
    }

    /// Decoded signature.
    pub fn signature(&self) -> Result<Signature> {
        Signature::from_bytes(&decode_b64(&self.signature)?)
    }
}

/// Signed document as returned to the requester.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AminoSignResponse {
    /// The exact document that was signed.
    pub signed: StdSignDoc,
    pub signature: StdSignature,
}

impl AminoSignResponse {
    /// The signed messages as contract envelopes.
    pub fn messages(&self) -> Result<Vec<WrappedMessage>> {
        self.signed.msgs.iter().map(WrappedMessage::from_amino).collect()
    }
}

fn decode_b64(text: &str) -> Result<Vec<u8>> {
    STANDARD.decode(text).map_err(|e| WardError::CryptoError {
        reason: format!("invalid base64: {e}"),
    })
}

// ---------------------------------------------------------------------------
// Canonical JSON
// ---------------------------------------------------------------------------

/// Serializes `value` in canonical sign-bytes form.
pub fn canonical_json(value: &Value) -> Result<String> {
    let sorted = sort_keys(value);
    let text = serde_json::to_string(&sorted).map_err(|e| WardError::InvalidSignDoc {
        reason: format!("failed to serialize sign doc: {e}"),
    })?;
    Ok(text
        .replace('&', "\\u0026")
        .replace('<', "\\u003c")
        .replace('>', "\\u003e"))
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key.clone(), sort_keys(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
