//! Popup-side sign session.
//!
//! A [`SignSession`] is built from the popup query, signs with the
//! password the user types, and delivers the outcome back to the
//! request that opened the popup. A wrong password is returned to the
//! surface so the user can retry; every other outcome is delivered
//! exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ward_signer::{AminoSignResponse, SignRequest, SigningEngine};
use ward_types::{Result, WardError};
use ward_wallet::Password;

use crate::client::RelayClient;
use crate::popup::PopupRequest;
use crate::protocol::{RelayRequest, RequestId, SignOutcome};

/// One pending signature prompt.
pub struct SignSession {
    rid: RequestId,
    request: SignRequest,
    engine: Arc<SigningEngine>,
    relay: Arc<RelayClient>,
    completed: AtomicBool,
}

impl SignSession {
    /// Builds a session from the popup parameters.
    ///
    /// # Errors
    ///
    /// [`WardError::ProtocolError`] or [`WardError::InvalidSignDoc`] when
    /// the parameters do not describe a sign request.
    pub fn from_popup(popup: &PopupRequest, engine: Arc<SigningEngine>, relay: Arc<RelayClient>) -> Result<Self> {
        let tx = serde_json::from_str(&popup.tx).map_err(|e| WardError::ProtocolError {
            reason: format!("popup tx is not JSON: {e}"),
        })?;
        let request = SignRequest::from_parts(popup.sign_mode, popup.who.clone(), tx)?;
        Ok(Self {
            rid: popup.rid,
            request,
            engine,
            relay,
            completed: AtomicBool::new(false),
        })
    }

    /// Builds a session from a raw popup query string.
    pub fn from_query(query: &str, engine: Arc<SigningEngine>, relay: Arc<RelayClient>) -> Result<Self> {
        Self::from_popup(&PopupRequest::from_query(query)?, engine, relay)
    }

    /// The request shown to the user.
    pub fn request(&self) -> &SignRequest {
        &self.request
    }

    /// Id of the request that opened this prompt.
    pub fn request_id(&self) -> RequestId {
        self.rid
    }

    /// Whether an outcome has been delivered.
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    /// Signs with `password` and delivers the result.
    ///
    /// # Errors
    ///
    /// [`WardError::IncorrectPassword`] leaves the session open. Any
    /// other error is delivered to the requester as a rejection and
    /// then returned.
    pub async fn submit(&self, password: &Password) -> Result<AminoSignResponse> {
        self.ensure_open()?;
        match self.engine.sign(&self.request, Some(password)).await {
            Ok(response) => {
                self.deliver(SignOutcome::Signed {
                    response: response.clone(),
                })
                .await?;
                Ok(response)
            }
            Err(WardError::IncorrectPassword) => {
                tracing::info!(rid = %self.rid, "sign prompt: incorrect password");
                Err(WardError::IncorrectPassword)
            }
            Err(e) => {
                tracing::warn!(rid = %self.rid, error = %e, "sign prompt rejected");
                self.deliver(SignOutcome::Rejected {
                    reason: e.to_string(),
                })
                .await?;
                Err(e)
            }
        }
    }

    /// Closes the prompt without signing.
    pub async fn dismiss(&self) -> Result<()> {
        self.ensure_open()?;
        tracing::info!(rid = %self.rid, "sign prompt dismissed");
        self.deliver(SignOutcome::Dismissed).await
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_completed() {
            return Err(WardError::RelayError {
                reason: format!("sign request {} already answered", self.rid),
            });
        }
        Ok(())
    }

    async fn deliver(&self, outcome: SignOutcome) -> Result<()> {
        if self.completed.swap(true, Ordering::SeqCst) {
            return Err(WardError::RelayError {
                reason: format!("sign request {} already answered", self.rid),
            });
        }
        let timeout = self.relay.request_timeout();
        self.relay
            .send_and_wait(
                RelayRequest::SignDeliver {
                    request_id: self.rid,
                    outcome,
                },
                timeout,
            )
            .await?;
        Ok(())
    }
}
