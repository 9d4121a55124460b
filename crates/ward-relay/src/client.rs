//! Requesting side of the relay.
//!
//! A [`RelayClient`] subscribes to the result broadcast when it is
//! created and runs a router task that hands each answer to the one
//! listener registered for its correlation id and event name. A
//! listener is registered before its request is queued and removed
//! when the answer arrives, the wait times out, or the waiting future
//! is dropped.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use ward_signer::{AminoSignResponse, SignDelegate, SignRequest};
use ward_storage::KeyValueStore;
use ward_types::{Result, WardError};

use crate::background::RelayHub;
use crate::protocol::{Envelope, RelayRequest, RelayResponse, RequestId, RequestKind, SignOutcome};

struct Listener {
    kind: RequestKind,
    reply: oneshot::Sender<RelayResponse>,
}

type Listeners = Arc<Mutex<HashMap<RequestId, Listener>>>;

fn lock(listeners: &Listeners) -> Result<MutexGuard<'_, HashMap<RequestId, Listener>>> {
    listeners.lock().map_err(|_| WardError::RelayError {
        reason: "listener table poisoned".into(),
    })
}

/// Removes a listener when the wait ends, however it ends.
struct ListenerGuard {
    listeners: Listeners,
    id: RequestId,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Ok(mut table) = self.listeners.lock() {
            table.remove(&self.id);
        }
    }
}

// ---------------------------------------------------------------------------
// RelayClient
// ---------------------------------------------------------------------------

/// Sends requests to the background and awaits correlated answers.
pub struct RelayClient {
    hub: RelayHub,
    listeners: Listeners,
    router: JoinHandle<()>,
}

impl RelayClient {
    pub(crate) fn connect(hub: &RelayHub) -> Self {
        let listeners: Listeners = Arc::new(Mutex::new(HashMap::new()));
        let router = tokio::spawn(route(hub.results.subscribe(), listeners.clone()));
        Self {
            hub: hub.clone(),
            listeners,
            router,
        }
    }

    /// Number of requests still awaiting an answer.
    pub fn pending_listeners(&self) -> usize {
        self.listeners.lock().map(|table| table.len()).unwrap_or(0)
    }

    /// Queues `request` without waiting for an answer.
    pub async fn send(&self, request: RelayRequest) -> Result<RequestId> {
        let id = self.hub.next_id();
        self.enqueue(Envelope { id, request }).await?;
        Ok(id)
    }

    /// Queues `request` and waits for its answer.
    ///
    /// # Errors
    ///
    /// - [`WardError::Timeout`] when `timeout` elapses first.
    /// - [`WardError::RelayError`] when the relay stops or the answer
    ///   carries an error.
    pub async fn send_and_wait(&self, request: RelayRequest, timeout: Option<Duration>) -> Result<Value> {
        let id = self.hub.next_id();
        let kind = request.kind();
        let (reply, answer) = oneshot::channel();
        lock(&self.listeners)?.insert(id, Listener { kind, reply });
        let _guard = ListenerGuard {
            listeners: self.listeners.clone(),
            id,
        };

        self.enqueue(Envelope { id, request }).await?;

        let answer = async {
            answer.await.map_err(|_| WardError::RelayError {
                reason: format!("relay closed before answering {kind} request {id}"),
            })
        };
        let response = match timeout {
            Some(limit) => tokio::time::timeout(limit, answer)
                .await
                .map_err(|_| WardError::Timeout {
                    operation: format!("{kind} request {id}"),
                })??,
            None => answer.await?,
        };
        response.into_result()
    }

    async fn enqueue(&self, envelope: Envelope) -> Result<()> {
        tracing::debug!(id = %envelope.id, kind = %envelope.request.kind(), "relay send");
        self.hub.requests.send(envelope).await.map_err(|_| WardError::RelayError {
            reason: "relay background is not running".into(),
        })
    }

    /// Timeout applied to storage and delivery round trips.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.hub.config.request_timeout_secs.map(Duration::from_secs)
    }

    fn sign_timeout(&self) -> Option<Duration> {
        self.hub.config.sign_timeout_secs.map(Duration::from_secs)
    }
}

impl Drop for RelayClient {
    fn drop(&mut self) {
        self.router.abort();
    }
}

async fn route(mut results: broadcast::Receiver<RelayResponse>, listeners: Listeners) {
    loop {
        match results.recv().await {
            Ok(response) => {
                let Ok(mut table) = listeners.lock() else {
                    break;
                };
                let matches = table
                    .get(&response.id)
                    .is_some_and(|listener| response.is_result_of(listener.kind));
                if !matches {
                    tracing::trace!(id = %response.id, event = %response.event, "no listener");
                    continue;
                }
                if let Some(listener) = table.remove(&response.id) {
                    let _ = listener.reply.send(response);
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // Skipped answers cannot be attributed, so every waiter fails.
                let Ok(mut table) = listeners.lock() else {
                    break;
                };
                tracing::warn!(skipped, pending = table.len(), "relay client lagged behind results");
                for (id, listener) in table.drain() {
                    let failure = RelayResponse::failed(
                        id,
                        listener.kind,
                        format!("relay client lagged and skipped {skipped} results"),
                    );
                    let _ = listener.reply.send(failure);
                }
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    if let Ok(mut table) = listeners.lock() {
        table.clear();
    }
}

// ---------------------------------------------------------------------------
// Store proxy
// ---------------------------------------------------------------------------

#[async_trait]
impl KeyValueStore for RelayClient {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let result = self
            .send_and_wait(RelayRequest::GetKey { key: key.to_owned() }, self.request_timeout())
            .await?;
        match result.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.clone())),
            Some(other) => Err(WardError::ProtocolError {
                reason: format!("getKey returned a non-string value for {key}: {other}"),
            }),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_many(&[(key.to_owned(), value.to_owned())]).await
    }

    async fn set_many(&self, entries: &[(String, String)]) -> Result<()> {
        let entries: BTreeMap<String, String> = entries.iter().cloned().collect();
        self.send_and_wait(RelayRequest::SetKey { entries }, self.request_timeout())
            .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sign delegation
// ---------------------------------------------------------------------------

#[async_trait]
impl SignDelegate for RelayClient {
    async fn request_signature(&self, request: &SignRequest) -> Result<AminoSignResponse> {
        let sign = RelayRequest::Sign {
            tx: request.tx_json()?,
            sign_mode: request.mode(),
            signer: request.signer().clone(),
        };
        let result = self.send_and_wait(sign, self.sign_timeout()).await?;
        let outcome: SignOutcome = serde_json::from_value(result).map_err(|e| WardError::ProtocolError {
            reason: format!("malformed sign-result: {e}"),
        })?;
        match outcome {
            SignOutcome::Signed { response } => Ok(response),
            SignOutcome::Dismissed => Err(WardError::PromptDismissed),
            SignOutcome::Rejected { reason } => Err(WardError::RelayError { reason }),
        }
    }
}
