//! Key Custodian for Ward.
//!
//! Owns the encrypted mnemonic lifecycle: deriving the account from a
//! phrase, sealing it under a password, persisting it through the
//! credential store, and briefly decrypting it to hand a signing key to
//! a single caller. Also resolves the wallet's contracts on chain.
//!
//! # Modules
//!
//! - [`password`] : scoped password handle
//! - [`blob`] : versioned encrypted blob format
//! - [`hd_wallet`] : mnemonic-backed account derivation
//! - [`account`] : decrypted account with its private key
//! - [`custodian`] : the [`KeyCustodian`] itself

pub mod account;
pub mod blob;
pub mod custodian;
pub mod hd_wallet;
pub mod password;

pub use account::AccountWithPrivkey;
pub use custodian::{AccountBalances, AccountSelector, KeyCustodian};
pub use hd_wallet::{DeriveOptions, HdWallet};
pub use password::Password;
