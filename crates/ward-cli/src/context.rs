//! Wiring shared by every command: configuration, store and custodian.

use std::io::BufRead;
use std::sync::Arc;

use ward_chain::RestConnector;
use ward_storage::{CredentialStore, KeyValueStore, SledStore};
use ward_types::config::WardConfig;
use ward_types::{Result, WardError};
use ward_wallet::{DeriveOptions, KeyCustodian, Password};
use zeroize::Zeroizing;

use crate::GlobalOpts;

/// Environment variable read before prompting for a password.
pub const PASSWORD_ENV: &str = "WARD_PASSWORD";

/// Environment variable read before falling back to a generated mnemonic.
pub const MNEMONIC_ENV: &str = "WARD_MNEMONIC";

/// Loads the configuration and applies command-line overrides.
pub fn load_config(opts: &GlobalOpts) -> Result<WardConfig> {
    let mut config = match &opts.config {
        Some(path) => WardConfig::from_json_file(path)?,
        None => WardConfig::default(),
    };
    if let Some(endpoint) = &opts.endpoint {
        config.host_chain.endpoint = endpoint.clone();
        if let Some(slave) = config.slave_chains.get_mut(&config.host_chain.chain_id) {
            slave.endpoint = endpoint.clone();
        }
    }
    config.validate()?;
    Ok(config)
}

/// Handles opened for one command.
pub struct Context {
    pub config: Arc<WardConfig>,
    pub store: Arc<dyn KeyValueStore>,
    pub custodian: Arc<KeyCustodian>,
}

impl Context {
    /// Opens the store under `--data-dir` and builds a custodian that
    /// reaches chains over REST.
    pub fn open(opts: &GlobalOpts) -> Result<Self> {
        let config = Arc::new(load_config(opts)?);
        std::fs::create_dir_all(&opts.data_dir).map_err(|e| WardError::StorageError {
            reason: format!("failed to create {}: {e}", opts.data_dir.display()),
        })?;
        let store: Arc<dyn KeyValueStore> = Arc::new(SledStore::open(&opts.data_dir)?);
        let connector = Arc::new(RestConnector::new()?);
        let custodian = Arc::new(KeyCustodian::new(
            CredentialStore::new(store.clone()),
            config.clone(),
            connector,
        ));
        tracing::debug!(data_dir = %opts.data_dir.display(), host = %config.host_chain.chain_id, "context opened");
        Ok(Self {
            config,
            store,
            custodian,
        })
    }

    /// Derivation options for the configured host chain.
    pub fn derive_options(&self) -> DeriveOptions {
        DeriveOptions::from_config(&self.config)
    }
}

// ---------------------------------------------------------------------------
// Secrets input
// ---------------------------------------------------------------------------

/// Whether passwords come from the environment rather than the terminal.
pub fn password_from_env() -> bool {
    std::env::var_os(PASSWORD_ENV).is_some()
}

/// Reads the password from `WARD_PASSWORD`, or prompts on stderr and
/// reads one line from stdin (no echo hiding).
pub fn read_password(prompt: &str) -> Result<Password> {
    if let Ok(pass) = std::env::var(PASSWORD_ENV) {
        return Ok(Password::new(pass));
    }
    Ok(Password::new(read_secret_line(prompt)?.as_str()))
}

/// Prompts on stderr and reads one line from stdin without the line ending.
pub fn read_secret_line(prompt: &str) -> Result<Zeroizing<String>> {
    eprint!("{prompt}");
    let mut input = Zeroizing::new(String::new());
    std::io::stdin()
        .lock()
        .read_line(&mut input)
        .map_err(|e| WardError::ConfigError {
            reason: format!("failed to read from stdin: {e}"),
        })?;
    let trimmed = input.trim_end_matches(['\r', '\n']).len();
    input.truncate(trimmed);
    Ok(input)
}
