//! Relay wire protocol.
//!
//! Requests travel as `{"id": n, "type": "<kind>", ...fields}` and
//! answers as `{"id": n, "type": "<kind>-result", "result"?: ..,
//! "error"?: ..}`. The id is assigned by the requesting client and is
//! unique across every client of one relay.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ward_signer::AminoSignResponse;
use ward_types::{Address, Result, SignMode, WardError};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Correlation id of one request.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request kinds, one per privileged operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RequestKind {
    Sign,
    SignDeliver,
    GetKey,
    SetKey,
}

impl RequestKind {
    /// Wire name of the request.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sign => "sign",
            Self::SignDeliver => "signDeliver",
            Self::GetKey => "getKey",
            Self::SetKey => "setKey",
        }
    }

    /// Event name of the answer.
    pub fn result_event(self) -> String {
        format!("{}-result", self.as_str())
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// How a sign prompt ended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SignOutcome {
    /// The user approved and the document was signed.
    Signed { response: AminoSignResponse },
    /// The user closed the prompt.
    Dismissed,
    /// Signing failed for a reason other than a wrong password.
    Rejected { reason: String },
}

/// Operation requested of the privileged side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RelayRequest {
    /// Open a sign prompt for `tx`.
    #[serde(rename = "sign")]
    Sign {
        tx: Value,
        #[serde(rename = "signMode")]
        sign_mode: SignMode,
        signer: Address,
    },
    /// Hand a prompt's outcome back to the request that opened it.
    #[serde(rename = "signDeliver")]
    SignDeliver {
        #[serde(rename = "requestId")]
        request_id: RequestId,
        outcome: SignOutcome,
    },
    /// Read one stored value.
    #[serde(rename = "getKey")]
    GetKey { key: String },
    /// Write all `entries` or none of them.
    #[serde(rename = "setKey")]
    SetKey { entries: BTreeMap<String, String> },
}

impl RelayRequest {
    /// Kind of this request.
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Sign { .. } => RequestKind::Sign,
            Self::SignDeliver { .. } => RequestKind::SignDeliver,
            Self::GetKey { .. } => RequestKind::GetKey,
            Self::SetKey { .. } => RequestKind::SetKey,
        }
    }
}

/// A request with its correlation id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: RequestId,
    #[serde(flatten)]
    pub request: RelayRequest,
}

impl Envelope {
    /// Parses a wire message.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| WardError::ProtocolError {
            reason: format!("malformed relay request: {e}"),
        })
    }

    /// Renders the wire message.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| WardError::ProtocolError {
            reason: format!("failed to encode relay request: {e}"),
        })
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Error carried on a result event.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RelayFailure {
    pub message: String,
}

/// Answer to one request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelayResponse {
    pub id: RequestId,
    /// `<kind>-result`.
    #[serde(rename = "type")]
    pub event: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RelayFailure>,
}

impl RelayResponse {
    /// Successful answer.
    pub fn ok(id: RequestId, kind: RequestKind, result: Value) -> Self {
        Self {
            id,
            event: kind.result_event(),
            result,
            error: None,
        }
    }

    /// Failed answer on the same event name.
    pub fn failed(id: RequestId, kind: RequestKind, message: impl Into<String>) -> Self {
        Self {
            id,
            event: kind.result_event(),
            result: Value::Null,
            error: Some(RelayFailure {
                message: message.into(),
            }),
        }
    }

    /// Whether this answers a request of `kind`.
    pub fn is_result_of(&self, kind: RequestKind) -> bool {
        self.event == kind.result_event()
    }

    /// The result payload, or the carried error.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(failure) => Err(WardError::RelayError {
                reason: failure.message,
            }),
            None => Ok(self.result),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_key_wire_shape() -> std::result::Result<(), WardError> {
        let envelope = Envelope {
            id: RequestId(7),
            request: RelayRequest::GetKey {
                key: "__WARD_default_address".into(),
            },
        };
        let value: Value = serde_json::from_str(&envelope.to_json()?).map_err(|e| {
            WardError::ProtocolError {
                reason: e.to_string(),
            }
        })?;
        assert_eq!(
            value,
            json!({"id": 7, "type": "getKey", "key": "__WARD_default_address"})
        );
        assert_eq!(Envelope::from_json(&envelope.to_json()?)?, envelope);
        Ok(())
    }

    #[test]
    fn sign_request_parses() -> std::result::Result<(), WardError> {
        let text = r#"{"id":3,"type":"sign","tx":{"memo":""},"signMode":"amino","signer":"cosmos19rl4cm2hmr8afy4kldpxz3fka4jguq0auqdal4"}"#;
        let envelope = Envelope::from_json(text)?;
        assert_eq!(envelope.id, RequestId(3));
        match envelope.request {
            RelayRequest::Sign { sign_mode, .. } => assert_eq!(sign_mode, SignMode::Amino),
            other => panic!("expected sign, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn unknown_type_is_protocol_error() {
        assert!(matches!(
            Envelope::from_json(r#"{"id":1,"type":"erase"}"#),
            Err(WardError::ProtocolError { .. })
        ));
    }

    #[test]
    fn dismissed_outcome_shape() -> std::result::Result<(), WardError> {
        let value = serde_json::to_value(SignOutcome::Dismissed).map_err(|e| WardError::ProtocolError {
            reason: e.to_string(),
        })?;
        assert_eq!(value, json!({"status": "dismissed"}));
        Ok(())
    }

    #[test]
    fn response_event_names() {
        let ok = RelayResponse::ok(RequestId(1), RequestKind::SetKey, Value::Null);
        assert_eq!(ok.event, "setKey-result");
        assert!(ok.is_result_of(RequestKind::SetKey));
        assert!(!ok.is_result_of(RequestKind::GetKey));

        let failed = RelayResponse::failed(RequestId(2), RequestKind::GetKey, "quota exceeded");
        assert!(matches!(
            failed.into_result(),
            Err(WardError::RelayError { reason }) if reason == "quota exceeded"
        ));
    }
}
