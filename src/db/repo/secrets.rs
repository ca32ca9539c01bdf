//! Key-value operations backing the wallet vault.

use crate::wallet::{SecretStore, StoreError};
use async_trait::async_trait;
use sqlx::Row;

use super::Repository;

impl Repository {
    pub async fn get_value(&self, key: &str) -> Result<Option<String>, sqlx::Error> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    /// Insert or overwrite a value.
    pub async fn put_value(&self, key: &str, value: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete_value(&self, key: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SecretStore for Repository {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.get_value(key).await?)
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        Ok(self.put_value(key, value).await?)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.delete_value(key).await?)
    }
}
