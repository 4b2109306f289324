use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{error::CacheResult, traits::JobCache};

struct CacheEntry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(data: Vec<u8>, expires_at: Option<Instant>) -> Self {
        Self { data, expires_at }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() > exp)
    }
}

/// In-memory cache implementation using DashMap for concurrent access.
///
/// Suitable for single-node deployments and tests. Each node maintains its
/// own independent view, so status polled from another node may be stale
/// until the Redis cache is configured instead.
#[derive(Default)]
pub struct MemoryCache {
    data: DashMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-expired) entries, used by tests.
    pub fn len(&self) -> usize {
        self.data.iter().filter(|e| !e.is_expired()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl JobCache for MemoryCache {
    async fn get_bytes(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        if let Some(entry) = self.data.get(key) {
            if entry.is_expired() {
                drop(entry);
                self.data.remove(key);
                return Ok(None);
            }
            return Ok(Some(entry.data.clone()));
        }
        Ok(None)
    }

    async fn set_bytes(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let expires_at = Instant::now().checked_add(ttl);
        self.data
            .insert(key.to_string(), CacheEntry::new(value.to_vec(), expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.data.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheExt;

    #[tokio::test]
    async fn set_get_delete_roundtrip() {
        let cache = MemoryCache::new();
        cache
            .set_bytes("k", b"v", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get_bytes("k").await.unwrap(), Some(b"v".to_vec()));

        cache.delete("k").await.unwrap();
        assert_eq!(cache.get_bytes("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_are_invisible() {
        let cache = MemoryCache::new();
        cache
            .set_bytes("k", b"v", Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get_bytes("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn json_helpers_round_trip() {
        let cache = MemoryCache::new();
        cache
            .set_json("k", &vec![1u32, 2, 3], Duration::from_secs(60))
            .await
            .unwrap();
        let got: Option<Vec<u32>> = cache.get_json("k").await.unwrap();
        assert_eq!(got, Some(vec![1, 2, 3]));
    }
}
