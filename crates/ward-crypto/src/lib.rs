//! Cryptographic primitives for the Ward wallet.
//!
//! This crate is the only place in the workspace that touches raw key
//! material or cipher state.
//!
//! # Modules
//!
//! - [`kdf`] : Argon2id password stretching
//! - [`aead`] : XChaCha20-Poly1305 sealing of wallet blobs
//! - [`hash`] : SHA-256 and RIPEMD-160
//! - [`mnemonic`] : BIP39 parsing, generation and seed derivation
//! - [`hd_derive`] : BIP32 secp256k1 derivation
//! - [`signing`] : secp256k1 ECDSA keys and signatures
//! - [`address`] : Cosmos bech32 addresses from public keys

pub mod address;
pub mod aead;
pub mod hash;
pub mod hd_derive;
pub mod kdf;
pub mod mnemonic;
pub mod signing;
