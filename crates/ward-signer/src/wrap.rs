//! Contract envelopes.
//!
//! An application message reaches the chain as
//!
//! ```text
//! MsgExecuteContract {
//!     sender: <account>,
//!     contract: <host contract>,
//!     msg: {"execute_same_chain": {"body_proxy": <application message>}},
//!     funds: [],
//! }
//! ```
//!
//! The application message is embedded verbatim, so unwrapping returns
//! its exact bytes.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::{json, Value};
use ward_types::{Address, Binary, ChainId, Coin, Result, WardError};

/// Protobuf type URL of a contract execution.
pub const EXECUTE_MSG_TYPE_URL: &str = "/cosmwasm.wasm.v1.MsgExecuteContract";

/// Amino type name of a contract execution.
pub const EXECUTE_MSG_AMINO_TYPE: &str = "cosmwasm/MsgExecuteContract";

#[derive(Serialize, Deserialize)]
struct BodyProxy<P> {
    body_proxy: P,
}

#[derive(Serialize, Deserialize)]
struct InnerEnvelope<P> {
    execute_same_chain: BodyProxy<P>,
}

/// Contract execution payload.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MsgExecuteContract {
    pub sender: String,
    pub contract: String,
    /// JSON execute message, base64 on the wire.
    pub msg: Binary,
    pub funds: Vec<Coin>,
}

/// Typed outer envelope.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct WrappedMessage {
    #[serde(rename = "typeUrl")]
    pub type_url: String,
    pub value: MsgExecuteContract,
}

impl WrappedMessage {
    /// Amino JSON form used inside a [`StdSignDoc`](crate::StdSignDoc).
    pub fn to_amino(&self) -> Result<Value> {
        let value = serde_json::to_value(&self.value).map_err(|e| WardError::InvalidSignDoc {
            reason: format!("failed to encode execute message: {e}"),
        })?;
        Ok(json!({"type": EXECUTE_MSG_AMINO_TYPE, "value": value}))
    }

    /// Parses the amino JSON form.
    pub fn from_amino(amino: &Value) -> Result<Self> {
        let amino_type = amino.get("type").and_then(Value::as_str);
        if amino_type != Some(EXECUTE_MSG_AMINO_TYPE) {
            return Err(WardError::InvalidSignDoc {
                reason: format!("expected {EXECUTE_MSG_AMINO_TYPE}, got {amino_type:?}"),
            });
        }
        let value = amino.get("value").cloned().unwrap_or(Value::Null);
        let value = serde_json::from_value(value).map_err(|e| WardError::InvalidSignDoc {
            reason: format!("malformed execute message: {e}"),
        })?;
        Ok(Self {
            type_url: EXECUTE_MSG_TYPE_URL.into(),
            value,
        })
    }
}

/// Builds the inner `execute_same_chain` message.
///
/// # Errors
///
/// [`WardError::NotSupported`] unless `chain_id` is the host chain.
pub fn wrap_with_inner(host_chain: &ChainId, chain_id: &str, msg: &RawValue) -> Result<Binary> {
    if host_chain.as_str() != chain_id {
        return Err(WardError::NotSupported {
            reason: "IBC not supported yet.".into(),
        });
    }
    let inner = InnerEnvelope {
        execute_same_chain: BodyProxy { body_proxy: msg },
    };
    let bytes = serde_json::to_vec(&inner).map_err(|e| WardError::InvalidSignDoc {
        reason: format!("failed to encode inner message: {e}"),
    })?;
    Ok(Binary::from(bytes))
}

/// Builds the outer contract execution sent by `sender` to `host`.
pub fn wrap_with_outer(inner: Binary, sender: &Address, host: &Address) -> WrappedMessage {
    WrappedMessage {
        type_url: EXECUTE_MSG_TYPE_URL.into(),
        value: MsgExecuteContract {
            sender: sender.to_string(),
            contract: host.to_string(),
            msg: inner,
            funds: Vec::new(),
        },
    }
}

/// Recovers the application message from an outer envelope, as the host
/// contract does.
pub fn unwrap_body_proxy(wrapped: &WrappedMessage) -> Result<Box<RawValue>> {
    if wrapped.type_url != EXECUTE_MSG_TYPE_URL {
        return Err(WardError::InvalidSignDoc {
            reason: format!("not a contract execution: {}", wrapped.type_url),
        });
    }
    let inner: InnerEnvelope<Box<RawValue>> = serde_json::from_slice(wrapped.value.msg.as_slice())
        .map_err(|e| WardError::InvalidSignDoc {
            reason: format!("not an execute_same_chain message: {e}"),
        })?;
    Ok(inner.execute_same_chain.body_proxy)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(text: &str) -> std::result::Result<Box<RawValue>, WardError> {
        RawValue::from_string(text.to_owned()).map_err(|e| WardError::InvalidSignDoc {
            reason: e.to_string(),
        })
    }

    fn addresses() -> std::result::Result<(Address, Address), WardError> {
        Ok((
            Address::from_bytes("wasm", &[1u8; 20])?,
            Address::from_bytes("wasm", &[2u8; 20])?,
        ))
    }

    #[test]
    fn unwrap_returns_exact_bytes() -> std::result::Result<(), WardError> {
        let text = r#"{"bank":{"send":{"to_address":"wasm1xyz","amount":[{"denom":"ustake","amount":"10"}]}}}"#;
        let (sender, host) = addresses()?;
        let inner = wrap_with_inner(&ChainId::from("foo-1"), "foo-1", &*raw(text)?)?;
        let wrapped = wrap_with_outer(inner, &sender, &host);
        assert_eq!(unwrap_body_proxy(&wrapped)?.get(), text);
        Ok(())
    }

    #[test]
    fn whitespace_and_key_order_survive() -> std::result::Result<(), WardError> {
        let text = "{ \"z\": 1,\n  \"a\": [true, null] }";
        let (sender, host) = addresses()?;
        let inner = wrap_with_inner(&ChainId::from("foo-1"), "foo-1", &*raw(text)?)?;
        let wrapped = wrap_with_outer(inner, &sender, &host);
        assert_eq!(unwrap_body_proxy(&wrapped)?.get(), text);
        Ok(())
    }

    #[test]
    fn inner_message_layout() -> std::result::Result<(), WardError> {
        let inner = wrap_with_inner(&ChainId::from("foo-1"), "foo-1", &*raw("{\"ping\":{}}")?)?;
        assert_eq!(
            inner.as_slice(),
            br#"{"execute_same_chain":{"body_proxy":{"ping":{}}}}"#
        );
        Ok(())
    }

    #[test]
    fn other_chain_is_not_supported() -> std::result::Result<(), WardError> {
        let result = wrap_with_inner(&ChainId::from("foo-1"), "bar-2", &*raw("{}")?);
        assert!(matches!(result, Err(WardError::NotSupported { .. })));
        Ok(())
    }

    #[test]
    fn outer_envelope_fields() -> std::result::Result<(), WardError> {
        let (sender, host) = addresses()?;
        let wrapped = wrap_with_outer(Binary::from(b"{}".to_vec()), &sender, &host);
        assert_eq!(wrapped.type_url, EXECUTE_MSG_TYPE_URL);
        assert_eq!(wrapped.value.sender, sender.to_string());
        assert_eq!(wrapped.value.contract, host.to_string());
        assert!(wrapped.value.funds.is_empty());
        Ok(())
    }

    #[test]
    fn amino_form_roundtrips() -> std::result::Result<(), WardError> {
        let (sender, host) = addresses()?;
        let wrapped = wrap_with_outer(Binary::from(b"{\"a\":1}".to_vec()), &sender, &host);
        let amino = wrapped.to_amino()?;
        assert_eq!(amino["type"], EXECUTE_MSG_AMINO_TYPE);
        assert_eq!(amino["value"]["msg"], "eyJhIjoxfQ==");
        assert_eq!(WrappedMessage::from_amino(&amino)?, wrapped);
        Ok(())
    }

    #[test]
    fn foreign_amino_type_rejected() {
        let amino = json!({"type": "cosmos-sdk/MsgSend", "value": {}});
        assert!(WrappedMessage::from_amino(&amino).is_err());
    }
}
