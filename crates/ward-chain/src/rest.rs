//! Cosmos SDK REST gateway client.
//!
//! | operation              | route                                                   |
//! |------------------------|---------------------------------------------------------|
//! | `get_sequence`         | `GET /cosmos/auth/v1beta1/accounts/{address}`           |
//! | `get_balance`          | `GET /cosmos/bank/v1beta1/balances/{address}/by_denom`  |
//! | `query_contract_smart` | `GET /cosmwasm/wasm/v1/contract/{contract}/smart/{b64}` |
//! | `broadcast_tx`         | `POST /cosmos/tx/v1beta1/txs`                           |

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::{StatusCode, Url};
use serde_json::{json, Value};
use ward_types::config::ChainConfig;
use ward_types::{Address, ChainId, Coin, Result, Uint128, WardError};

use crate::{AccountData, BroadcastResponse, ChainClient, ChainConnector};

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Type URL of Injective's Ethereum-compatible account wrapper.
const ETH_ACCOUNT_TYPE: &str = "/injective.types.v1beta1.EthAccount";

// ---------------------------------------------------------------------------
// RestConnector
// ---------------------------------------------------------------------------

/// Opens [`RestClient`]s sharing one HTTP connection pool.
#[derive(Clone)]
pub struct RestConnector {
    http: reqwest::Client,
}

impl RestConnector {
    /// Builds a connector with the default timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Builds a connector with a custom per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WardError::ChainError {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http })
    }
}

#[async_trait]
impl ChainConnector for RestConnector {
    async fn connect(&self, chain: &ChainConfig) -> Result<Arc<dyn ChainClient>> {
        let base = Url::parse(&chain.endpoint).map_err(|e| WardError::ConfigError {
            reason: format!("invalid endpoint {:?} for {}: {e}", chain.endpoint, chain.chain_id),
        })?;
        tracing::debug!(chain_id = %chain.chain_id, endpoint = %base, "connecting");
        Ok(Arc::new(RestClient {
            chain_id: chain.chain_id.clone(),
            base,
            http: self.http.clone(),
        }))
    }
}

// ---------------------------------------------------------------------------
// RestClient
// ---------------------------------------------------------------------------

/// [`ChainClient`] speaking to one REST gateway.
pub struct RestClient {
    chain_id: ChainId,
    base: Url,
    http: reqwest::Client,
}

impl RestClient {
    fn url(&self, segments: &[&str]) -> Result<Url> {
        build_url(&self.base, segments)
    }

    async fn get_json(&self, url: Url) -> Result<(StatusCode, Value)> {
        let response = self.http.get(url.clone()).send().await.map_err(|e| {
            WardError::ChainError {
                reason: format!("GET {url} failed: {e}"),
            }
        })?;
        read_json(response).await
    }
}

#[async_trait]
impl ChainClient for RestClient {
    fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    async fn get_sequence(&self, address: &Address) -> Result<AccountData> {
        let url = self.url(&["cosmos", "auth", "v1beta1", "accounts", address.as_str()])?;
        let (status, body) = self.get_json(url).await?;
        if status == StatusCode::NOT_FOUND || is_not_found(&body) {
            return Err(WardError::AccountNotFound {
                address: address.to_string(),
            });
        }
        ensure_success(status, &body)?;
        parse_account(&body)
    }

    async fn get_balance(&self, address: &Address, denom: &str) -> Result<Coin> {
        let mut url = self.url(&[
            "cosmos",
            "bank",
            "v1beta1",
            "balances",
            address.as_str(),
            "by_denom",
        ])?;
        url.query_pairs_mut().append_pair("denom", denom);
        let (status, body) = self.get_json(url).await?;
        ensure_success(status, &body)?;
        parse_balance(&body, denom)
    }

    async fn broadcast_tx(&self, tx_bytes: &[u8]) -> Result<BroadcastResponse> {
        let url = self.url(&["cosmos", "tx", "v1beta1", "txs"])?;
        let payload = json!({
            "tx_bytes": STANDARD.encode(tx_bytes),
            "mode": "BROADCAST_MODE_SYNC",
        });
        let response = self
            .http
            .post(url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| WardError::ChainError {
                reason: format!("POST {url} failed: {e}"),
            })?;
        let (status, body) = read_json(response).await?;
        ensure_success(status, &body)?;
        parse_broadcast(&body)
    }

    async fn query_contract_smart(&self, contract: &Address, query: &Value) -> Result<Value> {
        let encoded = STANDARD.encode(serde_json::to_vec(query).map_err(|e| {
            WardError::ProtocolError {
                reason: format!("failed to encode smart query: {e}"),
            }
        })?);
        let url = self.url(&[
            "cosmwasm",
            "wasm",
            "v1",
            "contract",
            contract.as_str(),
            "smart",
            &encoded,
        ])?;
        let (status, body) = self.get_json(url).await?;
        ensure_success(status, &body)?;
        body.get("data").cloned().ok_or_else(|| WardError::ChainError {
            reason: "smart query response has no data field".into(),
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Appends percent-encoded path segments to `base`.
pub(crate) fn build_url(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| WardError::ConfigError {
            reason: format!("endpoint {base} cannot carry a path"),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn read_json(response: reqwest::Response) -> Result<(StatusCode, Value)> {
    let status = response.status();
    let text = response.text().await.map_err(|e| WardError::ChainError {
        reason: format!("failed to read response body: {e}"),
    })?;
    let body = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    Ok((status, body))
}

fn ensure_success(status: StatusCode, body: &Value) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| body.to_string());
    Err(WardError::ChainError {
        reason: format!("gateway returned {status}: {message}"),
    })
}

/// gRPC-gateway reports missing accounts as code 5 with "not found".
fn is_not_found(body: &Value) -> bool {
    let code_is_five = body.get("code").and_then(Value::as_u64) == Some(5);
    let message = body.get("message").and_then(Value::as_str).unwrap_or_default();
    code_is_five || message.to_ascii_lowercase().contains("not found")
}

fn parse_u64_field(value: &Value, field: &str) -> Result<u64> {
    match value.get(field) {
        None | Some(Value::Null) => Ok(0),
        Some(Value::String(s)) => s.parse().map_err(|e| WardError::ChainError {
            reason: format!("{field} {s:?} is not an integer: {e}"),
        }),
        Some(Value::Number(n)) => n.as_u64().ok_or_else(|| WardError::ChainError {
            reason: format!("{field} {n} is not an unsigned integer"),
        }),
        Some(other) => Err(WardError::ChainError {
            reason: format!("unexpected {field} value {other}"),
        }),
    }
}

pub(crate) fn parse_account(body: &Value) -> Result<AccountData> {
    let account = body.get("account").ok_or_else(|| WardError::ChainError {
        reason: "account response has no account field".into(),
    })?;
    let is_eth = account.get("@type").and_then(Value::as_str) == Some(ETH_ACCOUNT_TYPE);
    let base = if is_eth {
        account.get("base_account").ok_or_else(|| WardError::ChainError {
            reason: "EthAccount without base_account".into(),
        })?
    } else {
        account
    };
    Ok(AccountData {
        account_number: parse_u64_field(base, "account_number")?,
        sequence: parse_u64_field(base, "sequence")?,
    })
}

pub(crate) fn parse_balance(body: &Value, denom: &str) -> Result<Coin> {
    let balance = match body.get("balance") {
        Some(Value::Null) | None => return Ok(Coin::new(0u128, denom)),
        Some(balance) => balance,
    };
    let amount = balance
        .get("amount")
        .and_then(Value::as_str)
        .unwrap_or("0");
    let amount = Uint128::from_str(amount).map_err(|e| WardError::ChainError {
        reason: format!("balance amount {amount:?} is invalid: {e}"),
    })?;
    let denom = balance
        .get("denom")
        .and_then(Value::as_str)
        .unwrap_or(denom);
    Ok(Coin {
        denom: denom.to_owned(),
        amount,
    })
}

pub(crate) fn parse_broadcast(body: &Value) -> Result<BroadcastResponse> {
    let tx = body.get("tx_response").ok_or_else(|| WardError::ChainError {
        reason: "broadcast response has no tx_response field".into(),
    })?;
    let code = tx.get("code").and_then(Value::as_u64).unwrap_or(0);
    Ok(BroadcastResponse {
        transaction_hash: tx
            .get("txhash")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        code: u32::try_from(code).map_err(|_| WardError::ChainError {
            reason: format!("result code {code} out of range"),
        })?,
        raw_log: tx
            .get("raw_log")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
