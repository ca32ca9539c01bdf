use super::{VaultError, WalletSecret};
use ed25519_dalek::{SigningKey, VerifyingKey};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;
use std::fmt;

const SEED_SALT: &[u8] = b"TON default seed";
const SEED_ITERATIONS: u32 = 100_000;

/// Ed25519 keypair derived from a recovery phrase.
pub struct WalletKeys {
    signing: SigningKey,
}

impl WalletKeys {
    /// Phrase → HMAC-SHA512 entropy → PBKDF2-SHA512 seed → first 32 bytes.
    pub fn derive(secret: &WalletSecret) -> Result<Self, VaultError> {
        let phrase = secret.words().join(" ");
        let mac = <Hmac<Sha512> as Mac>::new_from_slice(phrase.as_bytes())
            .map_err(|e| VaultError::InvalidMnemonic(e.to_string()))?;
        let entropy = mac.finalize().into_bytes();

        let mut seed = [0u8; 64];
        pbkdf2_hmac::<Sha512>(&entropy, SEED_SALT, SEED_ITERATIONS, &mut seed);

        let mut key_bytes = [0u8; 32];
        key_bytes.copy_from_slice(&seed[..32]);
        Ok(Self {
            signing: SigningKey::from_bytes(&key_bytes),
        })
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing
    }

    pub fn public_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key().as_bytes())
    }
}

impl fmt::Debug for WalletKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletKeys")
            .field("public_key", &self.public_key_hex())
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}
