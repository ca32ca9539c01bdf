//! Wallet secret handling: the recovery phrase, its encryption at rest, and
//! the signing keys derived from it.

pub mod keys;
pub mod session;
pub mod store;
pub mod vault;

pub use keys::WalletKeys;
pub use session::WalletSession;
pub use store::{MemorySecretStore, SecretStore, StoreError, SECRET_KEY};

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    #[error("Encryption password must not be empty")]
    EmptyPassword,
    #[error("Failed to decrypt. Password may be incorrect or data corrupted.")]
    Decryption,
    #[error("Encoding error: {0}")]
    Encoding(String),
    #[error("{0}")]
    InvalidMnemonic(String),
}

/// A recovery phrase of 12 or 24 lowercase words.
///
/// Debug output never includes the words.
#[derive(Clone, PartialEq, Eq)]
pub struct WalletSecret {
    words: Vec<String>,
}

impl WalletSecret {
    pub fn from_phrase(phrase: &str) -> Result<Self, VaultError> {
        Self::from_words(phrase.split_whitespace().map(str::to_string).collect())
    }

    pub fn from_words(words: Vec<String>) -> Result<Self, VaultError> {
        let words: Vec<String> = words
            .into_iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        if words.len() != 12 && words.len() != 24 {
            return Err(VaultError::InvalidMnemonic(format!(
                "Mnemonic must be 12 or 24 words, got {}",
                words.len()
            )));
        }
        if let Some(bad) = words.iter().find(|w| !w.chars().all(|c| c.is_ascii_lowercase())) {
            return Err(VaultError::InvalidMnemonic(format!(
                "Mnemonic word '{}' contains invalid characters",
                bad
            )));
        }

        Ok(Self { words })
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }
}

impl fmt::Debug for WalletSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletSecret([REDACTED; {} words])", self.words.len())
    }
}
