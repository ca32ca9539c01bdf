use super::{AssetDirectory, DataSourceError};
use crate::domain::{Address, Asset, LiquidityTag};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// Assets below this bucket are not offered for trading.
pub const MIN_TRADABLE_LIQUIDITY: LiquidityTag = LiquidityTag::Medium;

/// Cached view of the liquid assets, refreshed once the TTL elapses.
pub struct AssetCatalog {
    directory: Arc<dyn AssetDirectory>,
    ttl: Duration,
    cached: RwLock<Option<(Instant, Arc<Vec<Asset>>)>>,
}

impl AssetCatalog {
    pub fn new(directory: Arc<dyn AssetDirectory>, ttl: Duration) -> Self {
        Self {
            directory,
            ttl,
            cached: RwLock::new(None),
        }
    }

    pub fn directory(&self) -> &Arc<dyn AssetDirectory> {
        &self.directory
    }

    pub async fn assets(&self) -> Result<Arc<Vec<Asset>>, DataSourceError> {
        if let Some((fetched_at, assets)) = self.cached.read().await.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                return Ok(assets.clone());
            }
        }

        let mut guard = self.cached.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some((fetched_at, assets)) = guard.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                return Ok(assets.clone());
            }
        }

        let assets = Arc::new(self.directory.list_assets(MIN_TRADABLE_LIQUIDITY).await?);
        debug!("Asset catalog refreshed with {} assets", assets.len());
        *guard = Some((Instant::now(), assets.clone()));
        Ok(assets)
    }

    pub async fn find(&self, address: &Address) -> Result<Option<Asset>, DataSourceError> {
        Ok(self
            .assets()
            .await?
            .iter()
            .find(|a| &a.contract_address == address)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockAssetDirectory;
    use crate::domain::AssetKind;

    fn catalog() -> AssetCatalog {
        let directory = MockAssetDirectory::new().with_asset(
            Asset::new(Address::new("EQa".into()), "A", 9, AssetKind::Token)
                .with_liquidity(LiquidityTag::High),
        );
        AssetCatalog::new(Arc::new(directory), Duration::from_secs(300))
    }

    #[tokio::test]
    async fn test_find_known_and_unknown() {
        let catalog = catalog();
        let found = catalog.find(&Address::new("EQa".into())).await.unwrap();
        assert_eq!(found.map(|a| a.symbol), Some("A".to_string()));
        let missing = catalog.find(&Address::new("EQz".into())).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_expires_after_ttl() {
        let catalog = catalog();
        let first = catalog.assets().await.unwrap();
        let second = catalog.assets().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        tokio::time::advance(Duration::from_secs(301)).await;
        let third = catalog.assets().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }
}
