//! Privileged side of the relay.
//!
//! [`Background`] owns the credential store and the prompt surface. It
//! runs as one task that drains a bounded request queue and fans every
//! answer out to all connected clients through a broadcast channel.
//!
//! ```text
//! RelayClient ──mpsc──▶ Background ──broadcast──▶ every RelayClient
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use ward_storage::KeyValueStore;
use ward_types::config::RelayConfig;
use ward_types::{Result, WardError};

use crate::client::RelayClient;
use crate::popup::{PopupGeometry, PopupRequest, PromptSurface};
use crate::protocol::{Envelope, RelayRequest, RelayResponse, RequestId, RequestKind};

// ---------------------------------------------------------------------------
// RelayHub
// ---------------------------------------------------------------------------

/// Connection point handed to clients of a running [`Background`].
#[derive(Clone)]
pub struct RelayHub {
    pub(crate) requests: mpsc::Sender<Envelope>,
    pub(crate) results: broadcast::Sender<RelayResponse>,
    pub(crate) ids: Arc<AtomicU64>,
    pub(crate) config: RelayConfig,
    shutdown: Arc<watch::Sender<bool>>,
}

impl RelayHub {
    /// Connects a new client.
    pub fn client(&self) -> RelayClient {
        RelayClient::connect(self)
    }

    /// Relay settings.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Allocates a correlation id unique across this relay.
    pub(crate) fn next_id(&self) -> RequestId {
        RequestId(self.ids.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Asks the background task to exit after the current request.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

// ---------------------------------------------------------------------------
// Background
// ---------------------------------------------------------------------------

/// Executes relay requests against the store and the prompt surface.
pub struct Background {
    store: Arc<dyn KeyValueStore>,
    prompt: Arc<dyn PromptSurface>,
    geometry: PopupGeometry,
    results: broadcast::Sender<RelayResponse>,
}

impl Background {
    /// Starts the background task.
    ///
    /// Returns the hub clients connect through and the task handle,
    /// which completes after [`RelayHub::shutdown`] or once every hub
    /// and client is gone.
    pub fn spawn(
        store: Arc<dyn KeyValueStore>,
        prompt: Arc<dyn PromptSurface>,
        config: RelayConfig,
    ) -> (RelayHub, JoinHandle<()>) {
        let (requests, request_rx) = mpsc::channel(config.channel_capacity);
        let (results, _) = broadcast::channel(config.channel_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let background = Self {
            store,
            prompt,
            geometry: PopupGeometry::from(&config),
            results: results.clone(),
        };
        let handle = tokio::spawn(background.run(request_rx, shutdown_rx));

        let hub = RelayHub {
            requests,
            results,
            ids: Arc::new(AtomicU64::new(0)),
            config,
            shutdown: Arc::new(shutdown_tx),
        };
        (hub, handle)
    }

    async fn run(self, mut requests: mpsc::Receiver<Envelope>, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("relay background started");
        loop {
            tokio::select! {
                received = requests.recv() => match received {
                    Some(envelope) => self.dispatch(envelope).await,
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("relay background exited");
    }

    /// Executes one request and publishes its answers.
    ///
    /// `sign` publishes nothing on success; its answer arrives later
    /// through `signDeliver`.
    pub async fn dispatch(&self, envelope: Envelope) {
        let Envelope { id, request } = envelope;
        let kind = request.kind();
        tracing::debug!(%id, %kind, "relay dispatch");

        match request {
            RelayRequest::Sign {
                tx,
                sign_mode,
                signer,
            } => {
                let popup = PopupRequest {
                    tx: tx.to_string(),
                    sign_mode,
                    who: signer,
                    rid: id,
                };
                if let Err(e) = self.prompt.open(popup, self.geometry).await {
                    tracing::warn!(%id, error = %e, "failed to open sign prompt");
                    self.publish(RelayResponse::failed(id, kind, e.to_string()));
                }
            }
            RelayRequest::SignDeliver {
                request_id,
                outcome,
            } => match serde_json::to_value(&outcome) {
                Ok(result) => {
                    self.publish(RelayResponse::ok(request_id, RequestKind::Sign, result));
                    self.publish(RelayResponse::ok(id, kind, Value::Null));
                }
                Err(e) => self.publish(RelayResponse::failed(id, kind, e.to_string())),
            },
            RelayRequest::GetKey { key } => {
                let response = match self.get_key(&key).await {
                    Ok(result) => RelayResponse::ok(id, kind, result),
                    Err(e) => RelayResponse::failed(id, kind, e.to_string()),
                };
                self.publish(response);
            }
            RelayRequest::SetKey { entries } => {
                let entries: Vec<(String, String)> = entries.into_iter().collect();
                let response = match self.store.set_many(&entries).await {
                    Ok(()) => RelayResponse::ok(id, kind, Value::Null),
                    Err(e) => {
                        tracing::warn!(%id, error = %e, "setKey failed");
                        RelayResponse::failed(id, kind, e.to_string())
                    }
                };
                self.publish(response);
            }
        }
    }

    async fn get_key(&self, key: &str) -> Result<Value> {
        let mut result = BTreeMap::new();
        if let Some(value) = self.store.get(key).await? {
            result.insert(key.to_owned(), value);
        }
        serde_json::to_value(result).map_err(|e| WardError::ProtocolError {
            reason: format!("failed to encode getKey result: {e}"),
        })
    }

    fn publish(&self, response: RelayResponse) {
        if self.results.send(response).is_err() {
            tracing::debug!("relay result dropped: no clients connected");
        }
    }
}
