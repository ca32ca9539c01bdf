use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// Storage key of the encrypted recovery phrase.
pub const SECRET_KEY: &str = "wallet_mnemonic_encrypted";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError(err.to_string())
    }
}

/// Persistent key-value storage for the encrypted wallet blob.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Returns whether an entry was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
}

/// Process-local store, for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries()?.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries()?.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_lifecycle() {
        let store = MemorySecretStore::new();
        assert_eq!(store.get(SECRET_KEY).await.unwrap(), None);
        store.put(SECRET_KEY, "blob").await.unwrap();
        assert_eq!(store.get(SECRET_KEY).await.unwrap(), Some("blob".to_string()));
        assert!(store.delete(SECRET_KEY).await.unwrap());
        assert!(!store.delete(SECRET_KEY).await.unwrap());
    }
}
