//! Password-based encryption of the recovery phrase at rest.
//!
//! Blob layout: `base64(salt[16] ‖ iv[12] ‖ ciphertext ‖ tag[16])`, key from
//! PBKDF2-HMAC-SHA256 over the password, cipher AES-256-GCM.

use super::{VaultError, WalletSecret};
use aes_gcm::aead::{Aead, OsRng};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

pub const PBKDF2_ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;

fn derive_key(password: &str, salt: &[u8]) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    key
}

/// Encrypt `plaintext` under `password` with a fresh salt and IV.
pub fn encrypt(plaintext: &[u8], password: &str) -> Result<String, VaultError> {
    if password.is_empty() {
        return Err(VaultError::EmptyPassword);
    }

    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);

    let key = derive_key(password, &salt);
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| VaultError::Encoding(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|_| VaultError::Encoding("encryption failed".to_string()))?;

    let mut combined = Vec::with_capacity(SALT_LEN + IV_LEN + ciphertext.len());
    combined.extend_from_slice(&salt);
    combined.extend_from_slice(&iv);
    combined.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(combined))
}

/// Decrypt a blob produced by [`encrypt`]. A wrong password, a corrupted
/// blob, or a truncated blob all fail authentication.
pub fn decrypt(blob: &str, password: &str) -> Result<Vec<u8>, VaultError> {
    if password.is_empty() {
        return Err(VaultError::EmptyPassword);
    }

    let combined = BASE64
        .decode(blob.trim())
        .map_err(|_| VaultError::Decryption)?;
    if combined.len() < SALT_LEN + IV_LEN + TAG_LEN {
        return Err(VaultError::Decryption);
    }

    let (salt, rest) = combined.split_at(SALT_LEN);
    let (iv, ciphertext) = rest.split_at(IV_LEN);

    let key = derive_key(password, salt);
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| VaultError::Decryption)?;
    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| VaultError::Decryption)
}

/// Encrypt a recovery phrase (stored as a JSON word array).
pub fn seal_secret(secret: &WalletSecret, password: &str) -> Result<String, VaultError> {
    let json =
        serde_json::to_vec(secret.words()).map_err(|e| VaultError::Encoding(e.to_string()))?;
    encrypt(&json, password)
}

pub fn open_secret(blob: &str, password: &str) -> Result<WalletSecret, VaultError> {
    let json = decrypt(blob, password)?;
    let words: Vec<String> = serde_json::from_slice(&json).map_err(|_| VaultError::Decryption)?;
    WalletSecret::from_words(words)
}
