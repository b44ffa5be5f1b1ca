//! On-disk [`RecordStore`] backed by sled.
//!
//! Each collection is its own tree; index counters share one more tree,
//! stored as big-endian `u64`s. sled writes back in the background, so a
//! record is durable some hundreds of milliseconds after `put` returns,
//! or as soon as [`SledStore::flush`] completes.

use std::path::Path;

use crate::{RecordStore, StoreError};

const RECORD_TREE_PREFIX: &str = "records:";
const INDEX_TREE: &str = "indexes";

impl From<sled::Error> for StoreError {
    fn from(e: sled::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// A sled database holding every collection.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
    indexes: sled::Tree,
}

impl SledStore {
    /// Opens (or creates) the database directory at `path`.
    ///
    /// # Errors
    /// [`StoreError::Backend`] if the directory can't be created or the
    /// database is unreadable or locked by another process.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)
            .map_err(|e| StoreError::Backend(format!("creating {}: {e}", path.display())))?;
        let db = sled::open(path)?;
        let indexes = db.open_tree(INDEX_TREE)?;
        tracing::info!(path = %path.display(), "record store opened");
        Ok(Self { db, indexes })
    }

    /// Writes every buffered change to disk.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let db = self.db.clone();
        let written = tokio::task::spawn_blocking(move || db.flush())
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))??;
        tracing::debug!(bytes = written, "record store flushed");
        Ok(())
    }

    fn tree(&self, collection: &str) -> Result<sled::Tree, StoreError> {
        Ok(self.db.open_tree(format!("{RECORD_TREE_PREFIX}{collection}"))?)
    }
}

fn decode_index(bytes: &[u8]) -> Option<u64> {
    <[u8; 8]>::try_from(bytes).ok().map(u64::from_be_bytes)
}

impl RecordStore for SledStore {
    async fn put(&self, collection: &str, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.tree(collection)?.insert(key, value)?;
        tracing::trace!(collection, key, "record stored");
        Ok(())
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tree(collection)?.get(key)?.map(|v| v.to_vec()))
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        self.tree(collection)?.remove(key)?;
        Ok(())
    }

    async fn scan(&self, collection: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        let mut out = Vec::new();
        for entry in self.tree(collection)?.iter() {
            let (key, value) = entry?;
            let key = String::from_utf8(key.to_vec()).map_err(|e| {
                StoreError::Backend(format!("non-UTF-8 key in {collection}: {e}"))
            })?;
            out.push((key, value.to_vec()));
        }
        Ok(out)
    }

    async fn next_index(&self, collection: &str) -> Result<u64, StoreError> {
        let bumped = self.indexes.update_and_fetch(collection, |old| {
            let current = old.and_then(decode_index).unwrap_or(0);
            Some((current + 1).to_be_bytes().to_vec())
        })?;
        bumped
            .as_deref()
            .and_then(decode_index)
            .ok_or_else(|| StoreError::Backend(format!("corrupt index for {collection}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn open_temp() -> (tempfile::TempDir, SledStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStore::open(dir.path().join("db")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let (_dir, store) = open_temp();
        store.put("characters", "7", b"aria".to_vec()).await.unwrap();
        assert_eq!(
            store.get("characters", "7").await.unwrap().as_deref(),
            Some(&b"aria"[..])
        );
        assert_eq!(store.get("accounts", "7").await.unwrap(), None);

        store.delete("characters", "7").await.unwrap();
        assert_eq!(store.get("characters", "7").await.unwrap(), None);
        store.delete("characters", "7").await.unwrap();
    }

    #[tokio::test]
    async fn test_scan_is_ordered_by_key_and_per_collection() {
        let (_dir, store) = open_temp();
        for key in ["b", "c", "a"] {
            store.put("accounts", key, key.as_bytes().to_vec()).await.unwrap();
        }
        store.put("items", "z", vec![1]).await.unwrap();

        let keys: Vec<String> = store
            .scan("accounts")
            .await
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert!(store.scan("rooms").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_records_and_indexes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db");
        {
            let store = SledStore::open(&path).unwrap();
            store.put("characters", "1", b"ann".to_vec()).await.unwrap();
            assert_eq!(store.next_index("characters").await.unwrap(), 1);
            assert_eq!(store.next_index("characters").await.unwrap(), 2);
            store.flush().await.unwrap();
        }

        let store = SledStore::open(&path).unwrap();
        assert_eq!(
            store.get("characters", "1").await.unwrap().as_deref(),
            Some(&b"ann"[..])
        );
        assert_eq!(store.next_index("characters").await.unwrap(), 3);
        assert_eq!(store.next_index("rooms").await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_next_index_never_repeats_under_contention() {
        let (_dir, store) = open_temp();
        let store = Arc::new(store);
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
}
