//! Asynchronous file store: save, list and delete named blobs.
//!
//! Every call is one transaction against the [`RecordStore`], run on the
//! blocking pool while the handle's mutex and the store directory lock are
//! held. Calls never share a transaction, so concurrent saves and deletes,
//! whether from this process or another, interleave at call granularity and
//! the last one to commit decides what a name holds.

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::domain::{FileRow, StoredFile};
use crate::error::{HaloError, Result};
use crate::store::engine::{CompactReport, RecordStore, StoreOptions};
use crate::store::index::Stats;

#[derive(Clone)]
pub struct FileStore {
    inner: Arc<Mutex<RecordStore>>,
}

impl FileStore {
    pub async fn open(dir: impl AsRef<Path>, opts: StoreOptions) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let store = tokio::task::spawn_blocking(move || RecordStore::open(&dir, opts))
            .await
            .map_err(HaloError::unavailable)??;
        Ok(Self {
            inner: Arc::new(Mutex::new(store)),
        })
    }

    /// Persist `file`, overwriting any record with the same name.
    pub async fn save(&self, file: StoredFile) -> Result<()> {
        self.transact(move |s| s.put(&file)).await
    }

    /// All stored records. Order is not part of the contract.
    pub async fn list(&self) -> Result<Vec<StoredFile>> {
        self.transact(|s| s.all()).await
    }

    /// Remove `name` if present. Deleting an absent name is not an error.
    pub async fn delete_by_name(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.transact(move |s| s.delete(&name).map(|_| ())).await
    }

    pub async fn get(&self, name: &str) -> Result<Option<StoredFile>> {
        let name = name.to_string();
        self.transact(move |s| s.get(&name)).await
    }

    /// Metadata of all records without reading their bytes.
    pub async fn rows(&self) -> Result<Vec<FileRow>> {
        self.transact(|s| s.rows()).await
    }

    pub async fn stats(&self) -> Result<Stats> {
        self.transact(|s| s.stats()).await
    }

    pub async fn compact(&self) -> Result<CompactReport> {
        self.transact(|s| s.compact()).await
    }

    async fn transact<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut RecordStore) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut store = inner
                .lock()
                .map_err(|_| HaloError::StorageUnavailable("store lock poisoned".into()))?;
            op(&mut *store)
        })
        .await
        .map_err(HaloError::op_failed)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path(), StoreOptions::default())
            .await
            .unwrap();
        assert!(store.list().await.unwrap().is_empty());
        assert!(store.rows().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clones_share_one_store() {
        let tmp = TempDir::new().unwrap();
        let a = FileStore::open(tmp.path(), StoreOptions::default())
            .await
            .unwrap();
        let b = a.clone();
        a.save(StoredFile::new("n", "text/plain", vec![1])).await.unwrap();
        assert_eq!(b.get("n").await.unwrap().unwrap().data, vec![1]);
    }
}
