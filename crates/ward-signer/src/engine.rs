//! The Signing Engine.
//!
//! A call moves through `Requested -> PasswordPending -> Decrypting ->
//! Building -> Signing -> Delivered`, or ends `Rejected` at any step.
//! Without a password the request is handed to a [`SignDelegate`],
//! which collects one out of band and returns the finished signature.
//!
//! Every check that can reject a request runs before the key is
//! decrypted.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;
use ward_chain::AccountData;
use ward_crypto::hash::sha256;
use ward_crypto::signing::verify_prehash;
use ward_types::{Address, Binary, Result, SignMode, WardError};
use ward_wallet::{AccountWithPrivkey, KeyCustodian, Password};

use crate::sign_doc::{AminoSignResponse, StdFee, StdSignDoc, StdSignature};
use crate::wrap::{wrap_with_inner, wrap_with_outer};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Protobuf sign document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectSignDoc {
    pub body_bytes: Binary,
    pub auth_info_bytes: Binary,
    pub chain_id: String,
    pub account_number: String,
}

/// Amino signing request.
#[derive(Clone, Debug, PartialEq)]
pub struct AminoRequest {
    /// Address the requester expects to sign with.
    pub signer: Address,
    pub sign_doc: StdSignDoc,
}

/// Direct signing request.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectRequest {
    pub signer: Address,
    pub sign_doc: DirectSignDoc,
}

/// A request in either signing mode.
#[derive(Clone, Debug, PartialEq)]
pub enum SignRequest {
    Amino(AminoRequest),
    Direct(DirectRequest),
}

impl SignRequest {
    /// Builds a request from its wire parts: the sign document as JSON,
    /// the mode, and the signer.
    pub fn from_parts(mode: SignMode, signer: Address, tx: Value) -> Result<Self> {
        let invalid = |e: serde_json::Error| WardError::InvalidSignDoc {
            reason: format!("malformed {mode} sign doc: {e}"),
        };
        Ok(match mode {
            SignMode::Amino => Self::Amino(AminoRequest {
                signer,
                sign_doc: serde_json::from_value(tx).map_err(invalid)?,
            }),
            SignMode::Direct => Self::Direct(DirectRequest {
                signer,
                sign_doc: serde_json::from_value(tx).map_err(invalid)?,
            }),
        })
    }

    /// Signing mode.
    pub fn mode(&self) -> SignMode {
        match self {
            Self::Amino(_) => SignMode::Amino,
            Self::Direct(_) => SignMode::Direct,
        }
    }

    /// Address the requester expects to sign with.
    pub fn signer(&self) -> &Address {
        match self {
            Self::Amino(r) => &r.signer,
            Self::Direct(r) => &r.signer,
        }
    }

    /// The sign document as JSON.
    pub fn tx_json(&self) -> Result<Value> {
        let encoded = match self {
            Self::Amino(r) => serde_json::to_value(&r.sign_doc),
            Self::Direct(r) => serde_json::to_value(&r.sign_doc),
        };
        encoded.map_err(|e| WardError::InvalidSignDoc {
            reason: format!("failed to encode sign doc: {e}"),
        })
    }
}

/// Out-of-band signer used when the caller holds no password.
#[async_trait]
pub trait SignDelegate: Send + Sync {
    /// Obtains a signature for `request`, typically by prompting the
    /// user. Resolves once the prompt completes or is dismissed.
    async fn request_signature(&self, request: &SignRequest) -> Result<AminoSignResponse>;
}

// ---------------------------------------------------------------------------
// SigningEngine
// ---------------------------------------------------------------------------

/// Builds and signs transactions for the wallet's account.
pub struct SigningEngine {
    custodian: Arc<KeyCustodian>,
    delegate: Option<Arc<dyn SignDelegate>>,
}

impl fmt::Debug for SigningEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningEngine")
            .field("delegate", &self.delegate.is_some())
            .finish_non_exhaustive()
    }
}

impl SigningEngine {
    /// Engine that signs only with an explicit password.
    pub fn new(custodian: Arc<KeyCustodian>) -> Self {
        Self {
            custodian,
            delegate: None,
        }
    }

    /// Routes password-less requests to `delegate`.
    pub fn with_delegate(mut self, delegate: Arc<dyn SignDelegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    /// The custodian that owns the key.
    pub fn custodian(&self) -> &Arc<KeyCustodian> {
        &self.custodian
    }

    /// Signs `request`.
    ///
    /// # Errors
    ///
    /// - [`WardError::NotSupported`] for direct mode, or when no password
    ///   is given and no delegate is configured.
    /// - [`WardError::InvalidSignDoc`] unless the document carries exactly
    ///   one message.
    /// - [`WardError::ChainMismatch`] when the signer belongs to another
    ///   chain than the document.
    pub async fn sign(&self, request: &SignRequest, password: Option<&Password>) -> Result<AminoSignResponse> {
        let Some(password) = password else {
            let delegate = self.delegate.as_ref().ok_or_else(|| WardError::NotSupported {
                reason: "no password given and no prompt available".into(),
            })?;
            tracing::debug!(mode = %request.mode(), signer = %request.signer(), "delegating signature");
            return delegate.request_signature(request).await;
        };

        match request {
            SignRequest::Amino(amino) => self.sign_amino(amino, password).await,
            SignRequest::Direct(_) => Err(WardError::NotSupported {
                reason: "Direct signing not supported yet.".into(),
            }),
        }
    }

    async fn sign_amino(&self, request: &AminoRequest, password: &Password) -> Result<AminoSignResponse> {
        let doc = &request.sign_doc;
        let [msg] = doc.msgs.as_slice() else {
            return Err(WardError::InvalidSignDoc {
                reason: "Can submit strictly one message only.".into(),
            });
        };

        let chain_id = self.custodian.address_to_chain_id(&request.signer).await?;
        if chain_id.as_str() != doc.chain_id {
            tracing::warn!(signer = %request.signer, expected = %chain_id, actual = %doc.chain_id, "chain mismatch");
            return Err(WardError::ChainMismatch {
                expected: chain_id.to_string(),
                actual: doc.chain_id.clone(),
            });
        }

        let account_data = AccountData {
            account_number: StdSignDoc::parse_number("account_number", &doc.account_number)?,
            sequence: StdSignDoc::parse_number("sequence", &doc.sequence)?,
        };
        let msg = to_raw(msg)?;
        self.sign_simple(&doc.chain_id, &msg, &doc.fee, &doc.memo, password, Some(account_data))
            .await
    }

    /// Wraps `msg` in the host contract envelope and signs it.
    ///
    /// `account_data` pins the account number and sequence; without it
    /// both are read from the chain.
    pub async fn sign_simple(
        &self,
        chain_id: &str,
        msg: &RawValue,
        fee: &StdFee,
        memo: &str,
        password: &Password,
        account_data: Option<AccountData>,
    ) -> Result<AminoSignResponse> {
        let inner = wrap_with_inner(&self.custodian.config().host_chain.chain_id, chain_id, msg)?;
        let host = self.custodian.get_host_contract().await?;

        let account = self.custodian.get_account_with_privkey(password, None).await?;
        let outer = wrap_with_outer(inner, account.address(), &host);
        let account_data = match account_data {
            Some(data) => data,
            None => self.custodian.get_sequence(chain_id, Some(account.address())).await?,
        };

        let doc = build_doc(chain_id, account_data, fee, memo, vec![outer.to_amino()?]);
        sign_with(&account, doc)
    }

    /// Signs `msg` as sent by the account itself, without the contract
    /// envelope.
    pub async fn sign_simple_as_self(
        &self,
        chain_id: &str,
        msg: &RawValue,
        fee: &StdFee,
        memo: &str,
        password: &Password,
    ) -> Result<AminoSignResponse> {
        let msg: Value = serde_json::from_str(msg.get()).map_err(|e| WardError::InvalidSignDoc {
            reason: format!("message is not JSON: {e}"),
        })?;
        let account = self.custodian.get_account_with_privkey(password, None).await?;
        let account_data = self
            .custodian
            .get_sequence(chain_id, Some(account.address()))
            .await?;
        let doc = build_doc(chain_id, account_data, fee, memo, vec![msg]);
        sign_with(&account, doc)
    }

    /// Checks that `response` carries a valid signature over its
    /// document by its embedded public key.
    pub fn verify_amino_response(&self, response: &AminoSignResponse) -> Result<()> {
        let digest = sha256(&response.signed.sign_bytes()?);
        verify_prehash(
            &response.signature.public_key()?,
            &digest,
            &response.signature.signature()?,
        )
    }
}

fn to_raw(msg: &Value) -> Result<Box<RawValue>> {
    serde_json::value::to_raw_value(msg).map_err(|e| WardError::InvalidSignDoc {
        reason: format!("failed to encode message: {e}"),
    })
}

fn build_doc(chain_id: &str, data: AccountData, fee: &StdFee, memo: &str, msgs: Vec<Value>) -> StdSignDoc {
    StdSignDoc {
        chain_id: chain_id.to_owned(),
        account_number: data.account_number.to_string(),
        sequence: data.sequence.to_string(),
        fee: fee.clone(),
        msgs,
        memo: memo.to_owned(),
    }
}

fn sign_with(account: &AccountWithPrivkey, doc: StdSignDoc) -> Result<AminoSignResponse> {
    let digest = sha256(&doc.sign_bytes()?);
    let signature = account.private_key().sign_prehash(&digest)?;
    tracing::info!(
        chain_id = %doc.chain_id,
        sequence = %doc.sequence,
        signer = %account.address(),
        "signed transaction"
    );
    Ok(AminoSignResponse {
        signature: StdSignature::new(account.public_key(), &signature),
        signed: doc,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
