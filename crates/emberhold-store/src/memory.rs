//! In-process [`RecordStore`].

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;

use crate::{RecordStore, StoreError};

#[derive(Default)]
struct Collections {
    records: HashMap<String, BTreeMap<String, Vec<u8>>>,
    indexes: HashMap<String, u64>,
}

/// Keeps every collection in a map behind one async mutex.
///
/// Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
    read_only: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail with [`StoreError::ReadOnly`].
    pub fn set_read_only(&self, on: bool) {
        self.read_only.store(on, Ordering::Relaxed);
    }

    /// Number of records in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        self.inner
            .lock()
            .await
            .records
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.read_only.load(Ordering::Relaxed) {
            Err(StoreError::ReadOnly)
        } else {
            Ok(())
        }
    }
}

impl RecordStore for MemoryStore {
    async fn put(&self, collection: &str, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.check_writable()?;
        self.inner
            .lock()
            .await
            .records
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), value);
        tracing::trace!(collection, key, "record stored");
        Ok(())
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .records
            .get(collection)
            .and_then(|c| c.get(key))
            .cloned())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        if let Some(c) = self.inner.lock().await.records.get_mut(collection) {
            c.remove(key);
        }
        Ok(())
    }

    async fn scan(&self, collection: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .records
            .get(collection)
            .map(|c| c.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn next_index(&self, collection: &str) -> Result<u64, StoreError> {
        self.check_writable()?;
        let mut inner = self.inner.lock().await;
        let next = inner.indexes.entry(collection.to_string()).or_insert(0);
        *next += 1;
        Ok(*next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryStore::new();
        store.put("characters", "7", b"aria".to_vec()).await.unwrap();
        assert_eq!(
            store.get("characters", "7").await.unwrap().as_deref(),
            Some(&b"aria"[..])
        );

        store.delete("characters", "7").await.unwrap();
        assert_eq!(store.get("characters", "7").await.unwrap(), None);
        // Deleting again is fine.
        store.delete("characters", "7").await.unwrap();
    }

    #[tokio::test]
    async fn test_get_from_unknown_collection_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("nowhere", "1").await.unwrap(), None);
        assert!(store.scan("nowhere").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scan_is_ordered_by_key() {
        let store = MemoryStore::new();
        for key in ["b", "c", "a"] {
            store.put("accounts", key, key.as_bytes().to_vec()).await.unwrap();
        }
        let keys: Vec<String> = store
            .scan("accounts")
            .await
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_next_index_starts_at_one_per_collection() {
        let store = MemoryStore::new();
        assert_eq!(store.next_index("characters").await.unwrap(), 1);
        assert_eq!(store.next_index("characters").await.unwrap(), 2);
        assert_eq!(store.next_index("rooms").await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_next_index_never_repeats_under_contention() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut got = Vec::new();
                for _ in 0..50 {
                    got.push(store.next_index("characters").await.unwrap());
                }
                got
            }));
        }
        let mut all = Vec::new();
        for h in handles {
            all.extend(h.await.unwrap());
        }
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 400);
    }

    #[tokio::test]
    async fn test_read_only_rejects_writes() {
        let store = MemoryStore::new();
        store.set_read_only(true);
        let err = store.put("items", "x", vec![]).await.unwrap_err();
        assert!(matches!(err, StoreError::ReadOnly));
        assert!(store.next_index("items").await.is_err());
    }
}
