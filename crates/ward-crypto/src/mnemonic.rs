//! BIP39 mnemonic parsing, generation and seed derivation.
//!
//! Phrases are normalized before parsing (trimmed, lowercased, runs of
//! whitespace collapsed) so that pasted input with stray spacing maps to
//! the same wallet.

use rand::rngs::OsRng;
use rand::RngCore;
use ward_types::{Result, WardError};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

// ---------------------------------------------------------------------------
// Mnemonic
// ---------------------------------------------------------------------------

/// A validated BIP39 mnemonic phrase. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Mnemonic(String);

impl Mnemonic {
    /// Normalizes and validates `phrase` (English word list, checksum).
    ///
    /// # Errors
    ///
    /// [`WardError::InvalidMnemonic`] for unknown words, a bad word
    /// count or a checksum mismatch.
    pub fn parse(phrase: &str) -> Result<Self> {
        let normalized = Zeroizing::new(normalize(phrase));
        let parsed = bip39::Mnemonic::parse_normalized(&normalized).map_err(|e| {
            WardError::InvalidMnemonic {
                reason: e.to_string(),
            }
        })?;
        Ok(Self(parsed.to_string()))
    }

    /// Returns the phrase as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the number of words.
    pub fn word_count(&self) -> usize {
        self.0.split_whitespace().count()
    }

    /// Derives the 64-byte BIP39 seed with an empty passphrase.
    pub fn to_seed(&self) -> Result<Seed> {
        let parsed = bip39::Mnemonic::parse_normalized(&self.0).map_err(|e| {
            WardError::InvalidMnemonic {
                reason: e.to_string(),
            }
        })?;
        Ok(Seed(parsed.to_seed_normalized("")))
    }
}

// Mnemonic does not implement Clone/Debug to prevent leakage.

fn normalize(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Seed
// ---------------------------------------------------------------------------

/// A 64-byte BIP39 seed. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; 64]);

impl Seed {
    /// Fixed byte length of a BIP39 seed.
    pub const LEN: usize = 64;

    /// Returns the raw 64-byte seed.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Generates a new random 24-word mnemonic from 256 bits of OS entropy.
pub fn generate_mnemonic() -> Result<Mnemonic> {
    let mut entropy = [0u8; 32];
    OsRng.fill_bytes(&mut entropy);

    let result = bip39::Mnemonic::from_entropy(&entropy).map_err(|e| WardError::CryptoError {
        reason: format!("mnemonic generation failed: {e}"),
    });
    entropy.zeroize();

    Ok(Mnemonic(result?.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const ABANDON_ABOUT: &str = "abandon abandon abandon abandon abandon abandon \
        abandon abandon abandon abandon abandon about";

    #[test]
    fn parses_twelve_words() -> std::result::Result<(), WardError> {
        let m = Mnemonic::parse(ABANDON_ABOUT)?;
        assert_eq!(m.word_count(), 12);
        Ok(())
    }

    #[test]
    fn normalizes_case_and_spacing() -> std::result::Result<(), WardError> {
        let messy = format!("  {}  ", ABANDON_ABOUT.to_uppercase().replace(' ', "   "));
        let m = Mnemonic::parse(&messy)?;
        assert_eq!(m.as_str(), Mnemonic::parse(ABANDON_ABOUT)?.as_str());
        Ok(())
    }

    #[test]
    fn bad_checksum_rejected() {
        let phrase = ABANDON_ABOUT.replace("about", "abandon");
        assert!(matches!(
            Mnemonic::parse(&phrase),
            Err(WardError::InvalidMnemonic { .. })
        ));
    }

    #[test]
    fn unknown_word_rejected() {
        let phrase = ABANDON_ABOUT.replace("about", "zzzz");
        assert!(Mnemonic::parse(&phrase).is_err());
    }

    #[test]
    fn empty_phrase_rejected() {
        assert!(Mnemonic::parse("   ").is_err());
    }

    #[test]
    fn seed_matches_bip39_vector() -> std::result::Result<(), WardError> {
        let seed = Mnemonic::parse(ABANDON_ABOUT)?.to_seed()?;
        // BIP39 reference vector (empty passphrase) begins 5eb00bbd.
        assert_eq!(seed.as_bytes()[..4], [0x5e, 0xb0, 0x0b, 0xbd]);
        Ok(())
    }

    #[test]
    fn generated_mnemonic_is_valid() -> std::result::Result<(), WardError> {
        let m = generate_mnemonic()?;
        assert_eq!(m.word_count(), 24);
        assert!(Mnemonic::parse(m.as_str()).is_ok());
        Ok(())
    }
}
