//! Known-vector tests for the account derivation pipeline.
//!
//! - BIP39 seed: reference vector for the all-"abandon" phrase
//! - Cosmos address: `m/44'/118'/0'/0/0` of the same phrase, as
//!   published by every Cosmos SDK wallet
//! - Argon2id + XChaCha20-Poly1305: seal/open with a derived key

use ward_crypto::address::pubkey_to_address;
use ward_crypto::aead::{open, seal};
use ward_crypto::hash::sha256;
use ward_crypto::hd_derive::derive_private_key;
use ward_crypto::kdf::{argon2id_derive_key, generate_salt, Argon2Params};
use ward_crypto::mnemonic::Mnemonic;
use ward_crypto::signing::verify_prehash;
use ward_types::WardError;

const ABANDON_ABOUT: &str = "abandon abandon abandon abandon abandon abandon \
    abandon abandon abandon abandon abandon about";

#[test]
fn cosmos_hub_address_vector() -> std::result::Result<(), WardError> {
    let seed = Mnemonic::parse(ABANDON_ABOUT)?.to_seed()?;
    let key = derive_private_key(&seed, "m/44'/118'/0'/0/0")?;
    let addr = pubkey_to_address("cosmos", &key.public_key())?;
    assert_eq!(addr.as_str(), "cosmos19rl4cm2hmr8afy4kldpxz3fka4jguq0auqdal4");
    Ok(())
}

#[test]
fn bip39_seed_vector() -> std::result::Result<(), WardError> {
    let seed = Mnemonic::parse(ABANDON_ABOUT)?.to_seed()?;
    assert_eq!(
        hex::encode(&seed.as_bytes()[..16]),
        "5eb00bbddcf069084889a8ab91555681"
    );
    Ok(())
}

#[test]
fn derived_key_signs_verifiably() -> std::result::Result<(), WardError> {
    let seed = Mnemonic::parse(ABANDON_ABOUT)?.to_seed()?;
    let key = derive_private_key(&seed, "m/44'/60'/0'/0")?;
    let digest = sha256(b"{\"chain_id\":\"foo-1\"}");
    let sig = key.sign_prehash(&digest)?;
    verify_prehash(&key.public_key(), &digest, &sig)
}

#[test]
fn password_sealed_mnemonic_roundtrip() -> std::result::Result<(), WardError> {
    let params = Argon2Params {
        m_cost: 256,
        t_cost: 1,
        p_cost: 1,
    };
    let salt = generate_salt();
    let key = argon2id_derive_key(b"correct horse battery staple", &salt, &params)?;
    let sealed = seal(key.as_bytes(), ABANDON_ABOUT.as_bytes())?;

    let again = argon2id_derive_key(b"correct horse battery staple", &salt, &params)?;
    assert_eq!(open(again.as_bytes(), &sealed)?, ABANDON_ABOUT.as_bytes());

    let wrong = argon2id_derive_key(b"correct horse battery stapler", &salt, &params)?;
    assert!(open(wrong.as_bytes(), &sealed).is_err());
    Ok(())
}
