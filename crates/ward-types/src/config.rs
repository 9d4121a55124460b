//! Wallet configuration with defaults for the Injective testnet.
//!
//! The configuration is immutable once loaded and injected into the
//! custodian, signing engine and relay. Nothing reads chain tables from
//! globals.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Address, ChainId, Result, WardError};

/// Derivation path used for every account.
pub const DEFAULT_HD_PATH: &str = "m/44'/60'/0'/0";

/// Factory contract that maps owners to their host contract.
pub const DEFAULT_FACTORY_CONTRACT: &str = "inj1nlu6djpsq22rfees323r8yl8vt8cjwwufc8vks";

const DEFAULT_ENDPOINT: &str = "https://testnet.sentry.lcd.injective.network:443";

// ---------------------------------------------------------------------------
// Chain tables
// ---------------------------------------------------------------------------

/// Display metadata for a native denomination.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DenomConfig {
    /// Ticker shown to users.
    pub coin_denom: String,
    /// On-chain base denomination.
    pub coin_minimal_denom: String,
    /// Decimal places between the two.
    pub coin_decimals: u8,
}

/// Connection and address parameters of one chain.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain identifier.
    pub chain_id: ChainId,
    /// REST gateway base URL.
    pub endpoint: String,
    /// Bech32 prefix for account addresses.
    pub prefix: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Native denominations.
    #[serde(default)]
    pub denoms: Vec<DenomConfig>,
}

impl ChainConfig {
    fn injective_testnet() -> Self {
        Self {
            chain_id: ChainId::from("injective-888"),
            endpoint: DEFAULT_ENDPOINT.into(),
            prefix: "inj".into(),
            name: "Injective".into(),
            denoms: vec![DenomConfig {
                coin_denom: "inj".into(),
                coin_minimal_denom: "inj".into(),
                coin_decimals: 18,
            }],
        }
    }
}

// ---------------------------------------------------------------------------
// KdfConfig
// ---------------------------------------------------------------------------

/// Largest Argon2 memory cost accepted, in KiB (1 GiB).
pub const MAX_KDF_MEMORY_KIB: u32 = 1 << 20;

/// Largest Argon2 pass count accepted.
pub const MAX_KDF_PASSES: u32 = 256;

/// Largest Argon2 lane count accepted.
pub const MAX_KDF_LANES: u32 = 16;

/// Argon2id work factors applied when encrypting new accounts.
///
/// Existing blobs carry their own parameters, so changing these only
/// affects accounts created afterwards.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct KdfConfig {
    /// Memory cost in KiB.
    pub m_cost_kib: u32,
    /// Number of passes.
    pub t_cost: u32,
    /// Degree of parallelism.
    pub p_cost: u32,
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            m_cost_kib: 12_288,
            t_cost: 24,
            p_cost: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// RelayConfig
// ---------------------------------------------------------------------------

/// Timeouts and geometry for cross-context requests.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Upper bound for `getKey`/`setKey` round trips. `None` waits forever.
    pub request_timeout_secs: Option<u64>,
    /// Upper bound for interactive signing. `None` waits until the prompt
    /// resolves or is dismissed.
    pub sign_timeout_secs: Option<u64>,
    /// Prompt window width in pixels.
    pub popup_width: u32,
    /// Prompt window height in pixels.
    pub popup_height: u32,
    /// Capacity of the request queue and the result broadcast channel.
    pub channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: Some(30),
            sign_timeout_secs: None,
            popup_width: 400,
            popup_height: 600,
            channel_capacity: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// WardConfig
// ---------------------------------------------------------------------------

/// Complete wallet configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WardConfig {
    /// Chain on which the host contract lives.
    pub host_chain: ChainConfig,
    /// Chains with a slave contract, keyed by chain id.
    pub slave_chains: BTreeMap<ChainId, ChainConfig>,
    /// Factory contract queried for the owner's host contract.
    pub factory_contract: Address,
    /// BIP32 path of the single account.
    pub hd_path: String,
    /// Work factors for new blobs.
    #[serde(default)]
    pub kdf: KdfConfig,
    /// Relay settings.
    #[serde(default)]
    pub relay: RelayConfig,
}

impl Default for WardConfig {
    fn default() -> Self {
        let host = ChainConfig::injective_testnet();
        let mut slave_chains = BTreeMap::new();
        slave_chains.insert(host.chain_id.clone(), host.clone());
        Self {
            host_chain: host,
            slave_chains,
            factory_contract: Address(DEFAULT_FACTORY_CONTRACT.to_owned()),
            hd_path: DEFAULT_HD_PATH.into(),
            kdf: KdfConfig::default(),
            relay: RelayConfig::default(),
        }
    }
}

impl WardConfig {
    /// Reads a JSON configuration file and validates it.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| WardError::ConfigError {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;
        let config: Self = serde_json::from_str(&data).map_err(|e| WardError::ConfigError {
            reason: format!("failed to parse {}: {e}", path.display()),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Looks up a chain by id. The host chain wins over a slave entry with
    /// the same id.
    pub fn chain(&self, chain_id: &str) -> Result<&ChainConfig> {
        if self.host_chain.chain_id.as_str() == chain_id {
            return Ok(&self.host_chain);
        }
        self.slave_chains
            .get(chain_id)
            .ok_or_else(|| WardError::UnknownChain {
                chain_id: chain_id.to_owned(),
            })
    }

    /// Finds the display metadata for `denom` on `chain_id`.
    pub fn denom(&self, chain_id: &str, denom: &str) -> Result<&DenomConfig> {
        self.chain(chain_id)?
            .denoms
            .iter()
            .find(|d| d.coin_denom == denom || d.coin_minimal_denom == denom)
            .ok_or_else(|| WardError::ConfigError {
                reason: format!("denom {denom:?} is not configured on {chain_id}"),
            })
    }

    /// Validates all configuration values.
    pub fn validate(&self) -> Result<()> {
        validate_chain(&self.host_chain)?;

        let mut seen = BTreeSet::new();
        for (key, chain) in &self.slave_chains {
            if key != &chain.chain_id {
                return Err(WardError::ConfigError {
                    reason: format!(
                        "slave chain key {key} does not match its chain_id {}",
                        chain.chain_id
                    ),
                });
            }
            validate_chain(chain)?;
            seen.insert(chain.chain_id.clone());
        }
        if seen.is_empty() {
            return Err(WardError::ConfigError {
                reason: "at least one slave chain must be configured".into(),
            });
        }

        if !self.hd_path.starts_with("m/") {
            return Err(WardError::ConfigError {
                reason: format!("hd_path {:?} must start with \"m/\"", self.hd_path),
            });
        }

        if self.kdf.m_cost_kib < 8 * self.kdf.p_cost {
            return Err(WardError::ConfigError {
                reason: "kdf.m_cost_kib must be at least 8 * p_cost".into(),
            });
        }
        if self.kdf.t_cost == 0 || self.kdf.p_cost == 0 {
            return Err(WardError::ConfigError {
                reason: "kdf.t_cost and kdf.p_cost must be greater than 0".into(),
            });
        }
        if self.kdf.m_cost_kib > MAX_KDF_MEMORY_KIB
            || self.kdf.t_cost > MAX_KDF_PASSES
            || self.kdf.p_cost > MAX_KDF_LANES
        {
            return Err(WardError::ConfigError {
                reason: format!(
                    "kdf costs exceed the limits ({MAX_KDF_MEMORY_KIB} KiB, {MAX_KDF_PASSES} passes, {MAX_KDF_LANES} lanes)"
                ),
            });
        }

        if self.relay.channel_capacity == 0 {
            return Err(WardError::ConfigError {
                reason: "relay.channel_capacity must be greater than 0".into(),
            });
        }

        Ok(())
    }
}

fn validate_chain(chain: &ChainConfig) -> Result<()> {
    if chain.chain_id.as_str().is_empty() {
        return Err(WardError::ConfigError {
            reason: "chain_id must not be empty".into(),
        });
    }
    let prefix_ok = !chain.prefix.is_empty()
        && chain
            .prefix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !prefix_ok {
        return Err(WardError::ConfigError {
            reason: format!("invalid bech32 prefix {:?} for {}", chain.prefix, chain.chain_id),
        });
    }
    if chain.endpoint.is_empty() {
        return Err(WardError::ConfigError {
            reason: format!("endpoint for {} must not be empty", chain.chain_id),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = WardConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.host_chain.chain_id.as_str(), "injective-888");
        assert_eq!(config.hd_path, DEFAULT_HD_PATH);
        assert_eq!(config.relay.popup_width, 400);
        assert_eq!(config.relay.popup_height, 600);
    }

    #[test]
    fn default_factory_contract_parses() {
        assert!(Address::parse(DEFAULT_FACTORY_CONTRACT).is_ok());
    }

    #[test]
    fn chain_lookup() -> std::result::Result<(), WardError> {
        let config = WardConfig::default();
        assert_eq!(config.chain("injective-888")?.prefix, "inj");
        assert!(matches!(
            config.chain("osmosis-1"),
            Err(WardError::UnknownChain { .. })
        ));
        Ok(())
    }

    #[test]
    fn denom_lookup() -> std::result::Result<(), WardError> {
        let config = WardConfig::default();
        assert_eq!(config.denom("injective-888", "inj")?.coin_decimals, 18);
        assert!(config.denom("injective-888", "uatom").is_err());
        Ok(())
    }

    #[test]
    fn zero_t_cost_rejected() {
        let mut config = WardConfig::default();
        config.kdf.t_cost = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_kdf_rejected() {
        let mut config = WardConfig::default();
        config.kdf.m_cost_kib = MAX_KDF_MEMORY_KIB + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_prefix_rejected() {
        let mut config = WardConfig::default();
        config.host_chain.prefix = "INJ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn mismatched_slave_key_rejected() {
        let mut config = WardConfig::default();
        let chain = config.host_chain.clone();
        config.slave_chains.insert(ChainId::from("other-1"), chain);
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_slave_table_rejected() {
        let mut config = WardConfig::default();
        config.slave_chains.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn json_roundtrip() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let config = WardConfig::default();
        let json = serde_json::to_string_pretty(&config)?;
        let parsed: WardConfig = serde_json::from_str(&json)?;
        assert_eq!(parsed.host_chain, config.host_chain);
        assert_eq!(parsed.kdf, config.kdf);
        Ok(())
    }

    #[test]
    fn missing_file_is_config_error() {
        let result = WardConfig::from_json_file(Path::new("/nonexistent/ward.json"));
        assert!(matches!(result, Err(WardError::ConfigError { .. })));
    }
}
