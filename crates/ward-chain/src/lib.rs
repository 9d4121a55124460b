//! Chain interaction contract for Ward.
//!
//! The wallet never talks to a node directly; it goes through
//! [`ChainConnector`] and [`ChainClient`]. [`rest`] implements both over
//! the Cosmos SDK REST gateway. [`memory`] holds a scripted in-process
//! chain for tests and offline runs.

pub mod memory;
pub mod rest;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use ward_types::config::ChainConfig;
use ward_types::{Address, ChainId, Coin, Result};

pub use memory::{InMemoryChain, InMemoryConnector};
pub use rest::{RestClient, RestConnector};

// ---------------------------------------------------------------------------
// Data
// ---------------------------------------------------------------------------

/// Account number and next sequence of an on-chain account.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AccountData {
    /// Global account number.
    pub account_number: u64,
    /// Next expected sequence.
    pub sequence: u64,
}

/// Outcome of a broadcast as reported by the node.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BroadcastResponse {
    /// Uppercase hex transaction hash.
    pub transaction_hash: String,
    /// ABCI result code; zero means accepted.
    pub code: u32,
    /// Raw log text.
    pub raw_log: String,
}

impl BroadcastResponse {
    /// Returns `true` when the transaction was accepted.
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Connected client for one chain.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Chain this client talks to.
    fn chain_id(&self) -> &ChainId;

    /// Fetches account number and sequence.
    ///
    /// Fails with `AccountNotFound` when the chain has never seen the
    /// address.
    async fn get_sequence(&self, address: &Address) -> Result<AccountData>;

    /// Fetches the balance of `denom` held by `address`.
    async fn get_balance(&self, address: &Address, denom: &str) -> Result<Coin>;

    /// Submits signed transaction bytes.
    async fn broadcast_tx(&self, tx_bytes: &[u8]) -> Result<BroadcastResponse>;

    /// Runs a CosmWasm smart query and returns the decoded JSON answer.
    async fn query_contract_smart(
        &self,
        contract: &Address,
        query: &serde_json::Value,
    ) -> Result<serde_json::Value>;
}

/// Opens clients for configured chains.
#[async_trait]
pub trait ChainConnector: Send + Sync {
    /// Connects to `chain`.
    async fn connect(&self, chain: &ChainConfig) -> Result<Arc<dyn ChainClient>>;
}

/// Hash a node would report for `tx_bytes`: uppercase hex SHA-256.
pub fn tx_hash(tx_bytes: &[u8]) -> String {
    hex::encode_upper(ward_crypto::hash::sha256(tx_bytes))
}
