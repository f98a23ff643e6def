use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::info;

use super::{Collection, KvStore, StoreError};

/// JSON-file backend: `<dir>/<collection>.json`, one pretty-printed object per
/// collection.
///
/// Every operation holds the collection's lock for its whole read-modify-write,
/// and writes go to a temp file in the same directory that is then renamed
/// over the target, so readers never see a half-written document.
pub struct JsonFileStore {
    dir: PathBuf,
    locks: [Mutex<()>; 4],
}

impl JsonFileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        info!("JSON store at {}", dir.display());
        Ok(Self {
            dir,
            locks: [Mutex::new(()), Mutex::new(()), Mutex::new(()), Mutex::new(())],
        })
    }

    fn path(&self, collection: Collection) -> PathBuf {
        self.dir.join(format!("{}.json", collection.name()))
    }

    fn lock(&self, collection: Collection) -> &Mutex<()> {
        match collection {
            Collection::Users => &self.locks[0],
            Collection::Companies => &self.locks[1],
            Collection::Schedules => &self.locks[2],
            Collection::Accounts => &self.locks[3],
        }
    }

    async fn read(&self, collection: Collection) -> Result<BTreeMap<String, Value>, StoreError> {
        let path = self.path(collection);
        tokio::task::spawn_blocking(move || read_document(&path, collection)).await?
    }

    async fn write(
        &self,
        collection: Collection,
        records: BTreeMap<String, Value>,
    ) -> Result<(), StoreError> {
        let dir = self.dir.clone();
        let path = self.path(collection);
        tokio::task::spawn_blocking(move || write_document(&dir, &path, &records, collection))
            .await?
    }

    /// Runs `f` over the collection under its lock and writes the result back
    /// when `f` reports a change.
    async fn mutate<R, F>(&self, collection: Collection, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut BTreeMap<String, Value>) -> (bool, R),
    {
        let _guard = self.lock(collection).lock().await;
        let mut records = self.read(collection).await?;
        let (changed, result) = f(&mut records);
        if changed {
            self.write(collection, records).await?;
        }
        Ok(result)
    }
}

fn read_document(path: &Path, collection: Collection) -> Result<BTreeMap<String, Value>, StoreError> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
            collection: collection.to_string(),
            source,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(e.into()),
    }
}

fn write_document(
    dir: &Path,
    path: &Path,
    records: &BTreeMap<String, Value>,
    collection: Collection,
) -> Result<(), StoreError> {
    let body = serde_json::to_vec_pretty(records).map_err(|source| StoreError::Corrupt {
        collection: collection.to_string(),
        source,
    })?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&body)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

#[async_trait]
impl KvStore for JsonFileStore {
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock(collection).lock().await;
        Ok(self.read(collection).await?.remove(key))
    }

    async fn put(&self, collection: Collection, key: &str, value: Value) -> Result<(), StoreError> {
        self.mutate(collection, |records| {
            records.insert(key.to_string(), value);
            (true, ())
        })
        .await
    }

    async fn compare_and_swap(
        &self,
        collection: Collection,
        key: &str,
        expected: Option<&Value>,
        new: Value,
    ) -> Result<bool, StoreError> {
        self.mutate(collection, |records| {
            if records.get(key) != expected {
                return (false, false);
            }
            records.insert(key.to_string(), new);
            (true, true)
        })
        .await
    }

    async fn remove(&self, collection: Collection, key: &str) -> Result<bool, StoreError> {
        self.mutate(collection, |records| {
            let existed = records.remove(key).is_some();
            (existed, existed)
        })
        .await
    }

    async fn clear(&self, collection: Collection) -> Result<(), StoreError> {
        self.mutate(collection, |records| {
            records.clear();
            (true, ())
        })
        .await
    }

    async fn load_all(&self, collection: Collection) -> Result<BTreeMap<String, Value>, StoreError> {
        let _guard = self.lock(collection).lock().await;
        self.read(collection).await
    }

    async fn save_all(
        &self,
        collection: Collection,
        records: BTreeMap<String, Value>,
    ) -> Result<(), StoreError> {
        let _guard = self.lock(collection).lock().await;
        self.write(collection, records).await
    }

    async fn count(&self, collection: Collection) -> Result<usize, StoreError> {
        Ok(self.load_all(collection).await?.len())
    }
}
