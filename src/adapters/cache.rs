use crate::domain::ports::{CacheService, Clock};
use crate::utils::error::CacheError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// In-process cache. Entries with a TTL expire against the injected clock.
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Option<DateTime<Utc>>)>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub async fn remove(&self, key: &str) -> Option<String> {
        self.entries.lock().await.remove(key).map(|(value, _)| value)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.lock().await;
        let expired = match entries.get(key) {
            Some((_, Some(expires_at))) => *expires_at <= self.clock.now(),
            Some((_, None)) => false,
            None => return Ok(None),
        };

        if expired {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let expires_at = match ttl {
            Some(ttl) => {
                let ttl = chrono::Duration::from_std(ttl)
                    .map_err(|e| CacheError::Backend(format!("invalid ttl: {}", e)))?;
                Some(self.clock.now() + ttl)
            }
            None => None,
        };

        self.entries
            .lock()
            .await
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }
}

#[cfg(feature = "redis")]
pub use self::redis_backend::RedisCache;

#[cfg(feature = "redis")]
mod redis_backend {
    use super::*;
    use redis::aio::ConnectionManager;
    use redis::AsyncCommands;

    /// Redis-backed cache shared between server processes.
    #[derive(Clone)]
    pub struct RedisCache {
        connection: ConnectionManager,
    }

    impl RedisCache {
        pub async fn connect(url: &str) -> Result<Self, CacheError> {
            let client = redis::Client::open(url)?;
            let connection = ConnectionManager::new(client).await?;
            tracing::info!("Connected to cache backend at {}", url);
            Ok(Self { connection })
        }
    }

    #[async_trait]
    impl CacheService for RedisCache {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            let mut connection = self.connection.clone();
            let value: Option<String> = connection.get(key).await?;
            Ok(value)
        }

        async fn set(
            &self,
            key: &str,
            value: &str,
            ttl: Option<Duration>,
        ) -> Result<(), CacheError> {
            let mut connection = self.connection.clone();
            match ttl {
                Some(ttl) => {
                    let _: () = connection.set_ex(key, value, ttl.as_secs().max(1)).await?;
                }
                None => {
                    let _: () = connection.set(key, value).await?;
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::ManualClock;

    #[tokio::test]
    async fn test_entries_expire_with_clock() {
        let clock = Arc::new(ManualClock::at_millis(0));
        let cache = MemoryCache::new(clock.clone());

        cache
            .set("module-vpc", "{}", Some(Duration::from_secs(60)))
            .await
            .unwrap();
        cache.set("forever", "1", None).await.unwrap();
        assert_eq!(cache.get("module-vpc").await.unwrap().as_deref(), Some("{}"));

        clock.advance(Duration::from_secs(60));
        assert_eq!(cache.get("module-vpc").await.unwrap(), None);
        assert_eq!(cache.get("forever").await.unwrap().as_deref(), Some("1"));
        assert_eq!(cache.len().await, 1);
    }
}
