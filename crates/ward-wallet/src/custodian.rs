//! The Key Custodian.
//!
//! [`KeyCustodian`] is the only component that ever sees a decrypted
//! mnemonic. It also resolves the wallet's contract addresses, which
//! are memoized for the lifetime of the instance.
//!
//! # Thread Safety
//!
//! All methods take `&self`. Memoized lookups use write-once cells, so
//! concurrent first calls race to fill the cell and every caller
//! observes the same value afterwards.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use ward_chain::{AccountData, BroadcastResponse, ChainClient, ChainConnector};
use ward_crypto::kdf::Argon2Params;
use ward_storage::CredentialStore;
use ward_types::config::{DenomConfig, WardConfig};
use ward_types::{Address, ChainId, Coin, Result, WardError};

use crate::account::AccountWithPrivkey;
use crate::blob::EncryptedBlob;
use crate::hd_wallet::{DeriveOptions, HdWallet};
use crate::password::Password;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Which account an operation acts for.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum AccountSelector {
    /// The wallet's single account.
    #[default]
    Default,
    /// A specific address. Only the local address is accepted.
    Explicit(Address),
}

/// Balances held by the slave contract on one chain.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalances {
    /// Chain identifier.
    pub chain_id: ChainId,
    /// Display name of the chain.
    pub name: String,
    /// Slave contract address.
    pub address: Address,
    /// One entry per configured denom.
    pub balances: Vec<Coin>,
}

#[derive(Deserialize)]
struct HostContractResponse {
    host: Address,
}

#[derive(Deserialize)]
struct SlavesResponse {
    slaves: BTreeMap<ChainId, Address>,
}

// ---------------------------------------------------------------------------
// KeyCustodian
// ---------------------------------------------------------------------------

/// Owns the encrypted key material and the chain lookups around it.
pub struct KeyCustodian {
    store: CredentialStore,
    config: Arc<WardConfig>,
    connector: Arc<dyn ChainConnector>,
    local_address: OnceCell<Address>,
    host_contract: OnceCell<Address>,
    slave_contracts: OnceCell<BTreeMap<ChainId, Address>>,
    decrypt_attempts: AtomicU64,
}

impl KeyCustodian {
    /// Creates a custodian over `store`, reaching chains via `connector`.
    pub fn new(
        store: CredentialStore,
        config: Arc<WardConfig>,
        connector: Arc<dyn ChainConnector>,
    ) -> Self {
        Self {
            store,
            config,
            connector,
            local_address: OnceCell::new(),
            host_contract: OnceCell::new(),
            slave_contracts: OnceCell::new(),
            decrypt_attempts: AtomicU64::new(0),
        }
    }

    /// Injected configuration.
    pub fn config(&self) -> &WardConfig {
        &self.config
    }

    /// Number of blob decryptions attempted by this instance.
    pub fn decrypt_attempts(&self) -> u64 {
        self.decrypt_attempts.load(Ordering::SeqCst)
    }

    // -- Accounts ------------------------------------------------------------

    /// The default account address. Memoized after the first success.
    ///
    /// # Errors
    ///
    /// [`WardError::AddressNotFound`] when no account has been created.
    pub async fn get_local_address(&self) -> Result<Address> {
        let address = self
            .local_address
            .get_or_try_init(|| async {
                self.store
                    .default_address()
                    .await?
                    .ok_or_else(|| WardError::AddressNotFound {
                        address: "default".into(),
                    })
            })
            .await?;
        Ok(address.clone())
    }

    /// Whether a default account exists.
    pub async fn has_account(&self) -> Result<bool> {
        self.store.has_account().await
    }

    /// Derives the address `mnemonic` would produce, without storing
    /// anything.
    pub fn validate_mnemonic(&self, mnemonic: &str, options: &DeriveOptions) -> Result<Address> {
        HdWallet::from_mnemonic(mnemonic, options.clone())?.address()
    }

    /// Derives the account, seals it under `password` and persists the
    /// blob together with the default pointer in one atomic write.
    pub async fn create_from_mnemonic(
        &self,
        mnemonic: &str,
        password: &Password,
        options: &DeriveOptions,
    ) -> Result<Address> {
        let wallet = HdWallet::from_mnemonic(mnemonic, options.clone())?;
        let address = wallet.address()?;

        let params = Argon2Params::from(&self.config.kdf);
        let owned = Password::new(password.expose());
        let blob = tokio::task::spawn_blocking(move || wallet.serialize(&owned, &params))
            .await
            .map_err(|e| WardError::CryptoError {
                reason: format!("encryption task failed: {e}"),
            })??;

        self.store.save_account(&address, &blob.to_json()?).await?;
        tracing::info!(%address, "account created");
        Ok(address)
    }

    /// Decrypts the account at `address` (or the default account) and
    /// returns it with its signing key.
    ///
    /// # Errors
    ///
    /// - [`WardError::AddressNotFound`] when no blob is stored.
    /// - [`WardError::IncorrectPassword`] for every decryption, parse or
    ///   derivation failure.
    pub async fn get_account_with_privkey(
        &self,
        password: &Password,
        address: Option<&Address>,
    ) -> Result<AccountWithPrivkey> {
        let address = match address {
            Some(address) => address.clone(),
            None => self.get_local_address().await?,
        };
        let stored = self
            .store
            .encrypted_blob(&address)
            .await?
            .ok_or_else(|| WardError::AddressNotFound {
                address: address.to_string(),
            })?;

        self.decrypt_attempts.fetch_add(1, Ordering::SeqCst);
        let owned = Password::new(password.expose());
        let opened = tokio::task::spawn_blocking(move || -> Result<AccountWithPrivkey> {
            let blob = EncryptedBlob::from_json(&stored)?;
            HdWallet::deserialize(&blob, &owned)?.account()
        })
        .await;

        match opened {
            Ok(Ok(account)) => Ok(account),
            Ok(Err(e)) => {
                tracing::warn!(%address, error = %e, "failed to open account");
                Err(WardError::IncorrectPassword)
            }
            Err(e) => {
                tracing::warn!(%address, error = %e, "decryption task failed");
                Err(WardError::IncorrectPassword)
            }
        }
    }

    // -- Chains --------------------------------------------------------------

    /// Connects to the host or a slave chain.
    ///
    /// # Errors
    ///
    /// [`WardError::UnknownChain`] if `chain_id` is not configured.
    pub async fn get_client(&self, chain_id: &str) -> Result<Arc<dyn ChainClient>> {
        let chain = self.config.chain(chain_id)?;
        self.connector.connect(chain).await
    }

    /// Account number and sequence of `address` (default: local address).
    pub async fn get_sequence(&self, chain_id: &str, address: Option<&Address>) -> Result<AccountData> {
        let client = self.get_client(chain_id).await?;
        let address = match address {
            Some(address) => address.clone(),
            None => self.get_local_address().await?,
        };
        client.get_sequence(&address).await
    }

    /// Host contract owned by the local address. Memoized.
    pub async fn get_host_contract(&self) -> Result<Address> {
        let host = self
            .host_contract
            .get_or_try_init(|| async {
                let owner = self.get_local_address().await?;
                let client = self.get_client(self.config.host_chain.chain_id.as_str()).await?;
                let response = client
                    .query_contract_smart(
                        &self.config.factory_contract,
                        &json!({"get_host_contract": {"owner": owner}}),
                    )
                    .await?;
                let parsed: HostContractResponse = decode_response(response, "get_host_contract")?;
                tracing::debug!(host = %parsed.host, "resolved host contract");
                Ok::<_, WardError>(parsed.host)
            })
            .await?;
        Ok(host.clone())
    }

    /// Slave contract per chain, as registered on the host. Memoized.
    pub async fn get_slave_contracts(&self) -> Result<BTreeMap<ChainId, Address>> {
        let slaves = self
            .slave_contracts
            .get_or_try_init(|| async {
                let host = self.get_host_contract().await?;
                let client = self.get_client(self.config.host_chain.chain_id.as_str()).await?;
                let response = client
                    .query_contract_smart(&host, &json!({"get_slaves": {}}))
                    .await?;
                let parsed: SlavesResponse = decode_response(response, "get_slaves")?;
                tracing::debug!(count = parsed.slaves.len(), "resolved slave contracts");
                Ok::<_, WardError>(parsed.slaves)
            })
            .await?;
        Ok(slaves.clone())
    }

    /// Chain whose slave contract is `signer`.
    pub async fn address_to_chain_id(&self, signer: &Address) -> Result<ChainId> {
        self.get_slave_contracts()
            .await?
            .into_iter()
            .find_map(|(chain_id, address)| (&address == signer).then_some(chain_id))
            .ok_or_else(|| WardError::AddressNotFound {
                address: signer.to_string(),
            })
    }

    /// The address the wallet acts from on `chain_id`.
    ///
    /// # Errors
    ///
    /// [`WardError::NotSupported`] for an explicit address other than the
    /// local one.
    pub async fn get_from_address(&self, chain_id: &str, selector: &AccountSelector) -> Result<Address> {
        if let AccountSelector::Explicit(address) = selector {
            if address != &self.get_local_address().await? {
                return Err(WardError::NotSupported {
                    reason: "only single account allowed now".into(),
                });
            }
        }
        self.slave_address(chain_id).await
    }

    async fn slave_address(&self, chain_id: &str) -> Result<Address> {
        self.config.chain(chain_id)?;
        self.get_slave_contracts()
            .await?
            .remove(chain_id)
            .ok_or_else(|| WardError::ChainError {
                reason: format!("no slave contract registered on {chain_id}"),
            })
    }

    /// Balance of `denom` held by the slave contract on `chain_id`.
    pub async fn get_balance(&self, chain_id: &str, denom: &str) -> Result<Coin> {
        let address = self.slave_address(chain_id).await?;
        let client = self.get_client(chain_id).await?;
        let balance = client.get_balance(&address, denom).await?;
        tracing::debug!(chain_id, denom, %address, amount = %balance.amount, "balance");
        Ok(balance)
    }

    /// Balances of every configured denom on every slave chain.
    pub async fn get_all_balances(&self) -> Result<Vec<AccountBalances>> {
        let slaves = self.get_slave_contracts().await?;
        let mut all = Vec::with_capacity(self.config.slave_chains.len());
        for (chain_id, chain) in &self.config.slave_chains {
            let address = slaves
                .get(chain_id)
                .cloned()
                .ok_or_else(|| WardError::ChainError {
                    reason: format!("no slave contract registered on {chain_id}"),
                })?;
            let mut balances = Vec::with_capacity(chain.denoms.len());
            for denom in &chain.denoms {
                balances.push(self.get_balance(chain_id.as_str(), &denom.coin_minimal_denom).await?);
            }
            all.push(AccountBalances {
                chain_id: chain_id.clone(),
                name: chain.name.clone(),
                address,
                balances,
            });
        }
        Ok(all)
    }

    /// Recovery pool of the host contract, as returned by the chain.
    pub async fn get_recovery_state(&self) -> Result<Value> {
        let host = self.get_host_contract().await?;
        let client = self.get_client(self.config.host_chain.chain_id.as_str()).await?;
        client
            .query_contract_smart(&host, &json!({"get_recovery_pool": {}}))
            .await
    }

    /// Submits signed transaction bytes to `chain_id`.
    ///
    /// # Errors
    ///
    /// [`WardError::BroadcastFailure`] when the chain rejects the tx.
    pub async fn broadcast(&self, chain_id: &str, tx_bytes: &[u8]) -> Result<BroadcastResponse> {
        let client = self.get_client(chain_id).await?;
        let response = client.broadcast_tx(tx_bytes).await?;
        if !response.is_ok() {
            tracing::warn!(
                chain_id,
                code = response.code,
                tx_hash = %response.transaction_hash,
                "broadcast rejected"
            );
            return Err(WardError::BroadcastFailure {
                code: response.code,
                raw_log: response.raw_log,
                tx_hash: response.transaction_hash,
            });
        }
        tracing::info!(chain_id, tx_hash = %response.transaction_hash, "broadcast accepted");
        Ok(response)
    }

    /// Configured metadata of `denom` on `chain_id`.
    pub fn full_denom(&self, denom: &str, chain_id: &str) -> Result<DenomConfig> {
        self.config.denom(chain_id, denom).cloned()
    }
}

fn decode_response<T: serde::de::DeserializeOwned>(response: Value, query: &str) -> Result<T> {
    serde_json::from_value(response).map_err(|e| WardError::ChainError {
        reason: format!("unexpected {query} response: {e}"),
    })
}
