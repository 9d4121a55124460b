//! Scripted in-process chain.
//!
//! Accounts, balances and smart-query answers are registered up front;
//! broadcasts are recorded. Query and connect counters let callers check
//! memoization.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use ward_types::config::ChainConfig;
use ward_types::{Address, ChainId, Coin, Result, WardError};

use crate::{tx_hash, AccountData, BroadcastResponse, ChainClient, ChainConnector};

#[derive(Default)]
struct ChainState {
    accounts: HashMap<String, AccountData>,
    balances: HashMap<(String, String), u128>,
    smart: HashMap<(String, String), Value>,
    broadcasts: Vec<Vec<u8>>,
    next_failure: Option<(u32, String)>,
}

// ---------------------------------------------------------------------------
// InMemoryChain
// ---------------------------------------------------------------------------

/// [`ChainClient`] answering from registered state.
pub struct InMemoryChain {
    chain_id: ChainId,
    state: Mutex<ChainState>,
    smart_queries: AtomicUsize,
}

impl InMemoryChain {
    /// Creates an empty chain.
    pub fn new(chain_id: impl Into<ChainId>) -> Self {
        Self {
            chain_id: chain_id.into(),
            state: Mutex::new(ChainState::default()),
            smart_queries: AtomicUsize::new(0),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, ChainState>> {
        self.state.lock().map_err(|_| WardError::ChainError {
            reason: "in-memory chain state poisoned".into(),
        })
    }

    /// Registers an on-chain account.
    pub fn set_account(&self, address: &Address, account_number: u64, sequence: u64) -> Result<()> {
        self.state()?.accounts.insert(
            address.to_string(),
            AccountData {
                account_number,
                sequence,
            },
        );
        Ok(())
    }

    /// Registers a balance.
    pub fn set_balance(&self, address: &Address, denom: &str, amount: u128) -> Result<()> {
        self.state()?
            .balances
            .insert((address.to_string(), denom.to_owned()), amount);
        Ok(())
    }

    /// Registers the answer `contract` gives to `query`.
    pub fn set_smart_response(&self, contract: &Address, query: &Value, response: Value) -> Result<()> {
        self.state()?
            .smart
            .insert((contract.to_string(), query.to_string()), response);
        Ok(())
    }

    /// Makes the next broadcast fail with `code`.
    pub fn fail_next_broadcast(&self, code: u32, raw_log: &str) -> Result<()> {
        self.state()?.next_failure = Some((code, raw_log.to_owned()));
        Ok(())
    }

    /// Transactions broadcast so far.
    pub fn broadcasts(&self) -> Result<Vec<Vec<u8>>> {
        Ok(self.state()?.broadcasts.clone())
    }

    /// Number of smart queries served.
    pub fn smart_query_count(&self) -> usize {
        self.smart_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for InMemoryChain {
    fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    async fn get_sequence(&self, address: &Address) -> Result<AccountData> {
        self.state()?
            .accounts
            .get(address.as_str())
            .copied()
            .ok_or_else(|| WardError::AccountNotFound {
                address: address.to_string(),
            })
    }

    async fn get_balance(&self, address: &Address, denom: &str) -> Result<Coin> {
        let amount = self
            .state()?
            .balances
            .get(&(address.to_string(), denom.to_owned()))
            .copied()
            .unwrap_or(0);
        Ok(Coin::new(amount, denom))
    }

    async fn broadcast_tx(&self, tx_bytes: &[u8]) -> Result<BroadcastResponse> {
        let mut state = self.state()?;
        state.broadcasts.push(tx_bytes.to_vec());
        let (code, raw_log) = state.next_failure.take().unwrap_or((0, String::new()));
        Ok(BroadcastResponse {
            transaction_hash: tx_hash(tx_bytes),
            code,
            raw_log,
        })
    }

    async fn query_contract_smart(&self, contract: &Address, query: &Value) -> Result<Value> {
        self.smart_queries.fetch_add(1, Ordering::SeqCst);
        self.state()?
            .smart
            .get(&(contract.to_string(), query.to_string()))
            .cloned()
            .ok_or_else(|| WardError::ChainError {
                reason: format!("contract {contract} has no answer for {query}"),
            })
    }
}

// ---------------------------------------------------------------------------
// InMemoryConnector
// ---------------------------------------------------------------------------

/// [`ChainConnector`] handing out registered [`InMemoryChain`]s.
#[derive(Default)]
pub struct InMemoryConnector {
    chains: Mutex<HashMap<ChainId, Arc<InMemoryChain>>>,
    connects: AtomicUsize,
}

impl InMemoryConnector {
    /// Creates a connector with no chains.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `chain` and returns it for further scripting.
    pub fn add_chain(&self, chain: InMemoryChain) -> Result<Arc<InMemoryChain>> {
        let chain = Arc::new(chain);
        self.chains
            .lock()
            .map_err(|_| WardError::ChainError {
                reason: "connector state poisoned".into(),
            })?
            .insert(chain.chain_id.clone(), chain.clone());
        Ok(chain)
    }

    /// Number of `connect` calls served.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainConnector for InMemoryConnector {
    async fn connect(&self, chain: &ChainConfig) -> Result<Arc<dyn ChainClient>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let chains = self.chains.lock().map_err(|_| WardError::ChainError {
            reason: "connector state poisoned".into(),
        })?;
        let found: Arc<dyn ChainClient> = chains
            .get(&chain.chain_id)
            .cloned()
            .ok_or_else(|| WardError::ChainError {
                reason: format!("no endpoint reachable for {}", chain.chain_id),
            })?;
        Ok(found)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
