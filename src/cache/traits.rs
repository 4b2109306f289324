use std::time::Duration;

use async_trait::async_trait;

use super::error::CacheResult;

/// TTL-keyed byte store for job status entries.
///
/// Implementations must be safe to share across worker tasks; all methods
/// take `&self`.
#[async_trait]
pub trait JobCache: Send + Sync {
    /// Get raw bytes from cache. `None` when the key is missing or expired.
    async fn get_bytes(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Set raw bytes with a TTL, overwriting any existing entry.
    async fn set_bytes(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()>;

    /// Delete a value from cache.
    async fn delete(&self, key: &str) -> CacheResult<()>;
}

/// JSON convenience layer over [`JobCache`].
pub trait CacheExt: JobCache {
    async fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        use super::error::CacheError;
        match self.get_bytes(key).await? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| CacheError::Deserialization(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set_json<T: serde::Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> CacheResult<()> {
        use super::error::CacheError;
        let bytes =
            serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.set_bytes(key, &bytes, ttl).await
    }
}

// Blanket implementation for all JobCache types
impl<T: JobCache + ?Sized> CacheExt for T {}
