use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use bloomgate_core::{BackingStore, GateError, GateResult};

struct Slot {
    value: Vec<u8>,
    expires_at: Instant,
}

/// In-process store with per-key expiry.
///
/// `latency` is slept on every call to stand in for a network round trip, so
/// the benchmark can be run without a Redis server and still show what the
/// filter saves.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, Slot>>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            data: RwLock::default(),
            latency: (!latency.is_zero()).then_some(latency),
        }
    }

    pub fn latency(&self) -> Duration {
        self.latency.unwrap_or_default()
    }

    /// Live (unexpired) keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired keys. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let before = data.len();
        data.retain(|_, slot| slot.expires_at > now);
        before - data.len()
    }

    async fn round_trip(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> GateResult<()> {
        self.round_trip().await;
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| GateError::Store(format!("ttl {ttl:?} for {key} is out of range")))?;
        let slot = Slot {
            value: value.to_vec(),
            expires_at,
        };
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), slot);
        Ok(())
    }

    async fn get(&self, key: &str) -> GateResult<Option<Vec<u8>>> {
        self.round_trip().await;
        let now = Instant::now();
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        Ok(data
            .get(key)
            .filter(|slot| slot.expires_at > now)
            .map(|slot| slot.value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = MemoryStore::new();
        store.set("key0", b"abc", Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.get("key0").await.unwrap(), Some(b"abc".to_vec()));
        assert_eq!(store.get("key1").await.unwrap(), None);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() {
        let store = MemoryStore::new();
        store.set("k", b"one", Duration::from_secs(60)).await.unwrap();
        store.set("k", b"two", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"two".to_vec()));
    }

    #[tokio::test]
    async fn test_expired_key_is_absent() {
        let store = MemoryStore::new();
        store.set("short", b"v", Duration::from_millis(5)).await.unwrap();
        store.set("long", b"v", Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(store.get("short").await.unwrap(), None);
        assert!(store.get("long").await.unwrap().is_some());
        assert_eq!(store.len(), 1);
        assert_eq!(store.purge_expired(), 1);
        assert!(!store.is_empty());
    }

    #[tokio::test]
    async fn test_unrepresentable_ttl_is_an_error() {
        let store = MemoryStore::new();
        let result = store
            .set("k", b"v", Duration::from_secs(u64::MAX / 2))
            .await;
        assert!(matches!(result, Err(GateError::Store(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_latency_is_applied() {
        let store = MemoryStore::with_latency(Duration::from_millis(5));
        assert_eq!(store.latency(), Duration::from_millis(5));

        let started = Instant::now();
        store.get("missing").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(5));

        assert_eq!(MemoryStore::with_latency(Duration::ZERO).latency(), Duration::ZERO);
    }
}
