use super::{vault, SecretStore, VaultError, WalletKeys, WalletSecret, SECRET_KEY};
use crate::domain::Address;
use crate::error::SwapError;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Owns the encrypted wallet blob and hands out signing keys on demand.
///
/// The decrypted phrase only lives inside a blocking task for the duration
/// of a single import or key derivation.
#[derive(Clone)]
pub struct WalletSession {
    store: Arc<dyn SecretStore>,
    password: Arc<str>,
    address: Option<Address>,
}

impl WalletSession {
    pub fn new(
        store: Arc<dyn SecretStore>,
        password: &str,
        address: Option<Address>,
    ) -> Result<Self, VaultError> {
        if password.is_empty() {
            return Err(VaultError::EmptyPassword);
        }
        Ok(Self {
            store,
            password: Arc::from(password),
            address,
        })
    }

    /// Validate, encrypt and persist a recovery phrase. Returns the hex
    /// public key of the imported wallet.
    pub async fn import(&self, phrase: &str) -> Result<String, SwapError> {
        let secret = WalletSecret::from_phrase(phrase)?;
        let password = self.password.clone();

        let (blob, public_key) = tokio::task::spawn_blocking(move || {
            let keys = WalletKeys::derive(&secret)?;
            let blob = vault::seal_secret(&secret, &password)?;
            Ok::<_, VaultError>((blob, keys.public_key_hex()))
        })
        .await
        .map_err(|e| SwapError::Storage(format!("wallet import task failed: {}", e)))??;

        self.store.put(SECRET_KEY, &blob).await?;
        info!("Wallet imported (public key {})", public_key);
        Ok(public_key)
    }

    /// Decrypt the stored phrase and derive the signing keys from it.
    pub async fn load(&self) -> Result<WalletKeys, SwapError> {
        let blob = self
            .store
            .get(SECRET_KEY)
            .await?
            .ok_or(SwapError::WalletNotLoaded)?;
        let password = self.password.clone();

        tokio::task::spawn_blocking(move || {
            let secret = vault::open_secret(&blob, &password)?;
            WalletKeys::derive(&secret)
        })
        .await
        .map_err(|e| SwapError::Storage(format!("key derivation task failed: {}", e)))?
        .map_err(SwapError::from)
    }

    /// Remove the stored phrase. Returns whether one existed.
    pub async fn clear(&self) -> Result<bool, SwapError> {
        let removed = self.store.delete(SECRET_KEY).await?;
        if removed {
            info!("Wallet cleared");
        }
        Ok(removed)
    }

    pub async fn is_loaded(&self) -> Result<bool, SwapError> {
        Ok(self.store.get(SECRET_KEY).await?.is_some())
    }

    /// On-chain address of the wallet, when configured.
    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    /// The address swaps are sent from.
    pub fn require_address(&self) -> Result<&Address, SwapError> {
        self.address.as_ref().ok_or_else(|| {
            SwapError::ValidationError("Wallet address is not configured".to_string())
        })
    }
}

impl fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSession")
            .field("address", &self.address)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::MemorySecretStore;

    const PHRASE: &str = "abandon ability able about above absent absorb abstract absurd abuse access accident";

    fn session(password: &str) -> (Arc<MemorySecretStore>, WalletSession) {
        let store = Arc::new(MemorySecretStore::new());
        let session = WalletSession::new(store.clone(), password, None).unwrap();
        (store, session)
    }

    #[tokio::test]
    async fn test_import_then_derive_keys() {
        let (store, session) = session("pw");
        assert!(!session.is_loaded().await.unwrap());

        let public_key = session.import(PHRASE).await.unwrap();
        assert!(session.is_loaded().await.unwrap());

        let blob = store.get(SECRET_KEY).await.unwrap().unwrap();
        assert!(!blob.contains("abandon"));

        let keys = session.load().await.unwrap();
        assert_eq!(keys.public_key_hex(), public_key);
    }

    #[tokio::test]
    async fn test_keys_without_import() {
        let (_, session) = session("pw");
        assert_eq!(session.load().await.unwrap_err(), SwapError::WalletNotLoaded);
    }

    #[tokio::test]
    async fn test_wrong_password_is_decryption_error() {
        let store = Arc::new(MemorySecretStore::new());
        let writer = WalletSession::new(store.clone(), "right", None).unwrap();
        writer.import(PHRASE).await.unwrap();

        let reader = WalletSession::new(store, "wrong", None).unwrap();
        assert_eq!(reader.load().await.unwrap_err(), SwapError::DecryptionError);
    }

    #[tokio::test]
    async fn test_invalid_phrase_is_not_stored() {
        let (store, session) = session("pw");
        let err = session.import("only three words").await.unwrap_err();
        assert!(matches!(err, SwapError::ValidationError(_)));
        assert_eq!(store.get(SECRET_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear() {
        let (_, session) = session("pw");
        session.import(PHRASE).await.unwrap();
        assert!(session.clear().await.unwrap());
        assert!(!session.is_loaded().await.unwrap());
        assert!(!session.clear().await.unwrap());
    }

    #[test]
    fn test_empty_password_rejected() {
        let store = Arc::new(MemorySecretStore::new());
        assert!(matches!(
            WalletSession::new(store, "", None),
            Err(VaultError::EmptyPassword)
        ));
    }
}
