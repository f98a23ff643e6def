//! Persistence adapter.
//!
//! Collections are flat mappings from string key to JSON value. Backends only
//! deal in `serde_json::Value`; `Table<T>` layers typed access and optimistic
//! read-modify-write on top.

pub mod blob;
pub mod file;
pub mod postgres;

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::company::CompanyAccount;
use crate::models::schedule::UserSchedule;
use crate::models::user::UserAccount;
use crate::models::Role;

/// Bounded retries for `Table::update` before reporting a conflict.
const MAX_CAS_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Companies,
    Schedules,
    /// Email → role. The single keyspace that makes emails unique across
    /// account kinds.
    Accounts,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Companies => "companies",
            Collection::Schedules => "schedules",
            Collection::Accounts => "accounts",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt record in {collection}: {source}")]
    Corrupt {
        collection: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Concurrent modification of {collection}/{key}")]
    Conflict { collection: String, key: String },

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A key-value store with per-key compare-and-swap.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, StoreError>;

    /// Unconditional upsert.
    async fn put(&self, collection: Collection, key: &str, value: Value) -> Result<(), StoreError>;

    /// Writes `new` only if the current value equals `expected`
    /// (`None` = key absent). Returns whether the write happened.
    async fn compare_and_swap(
        &self,
        collection: Collection,
        key: &str,
        expected: Option<&Value>,
        new: Value,
    ) -> Result<bool, StoreError>;

    /// Returns whether the key existed.
    async fn remove(&self, collection: Collection, key: &str) -> Result<bool, StoreError>;

    async fn clear(&self, collection: Collection) -> Result<(), StoreError>;

    async fn load_all(&self, collection: Collection) -> Result<BTreeMap<String, Value>, StoreError>;

    /// Replaces the whole collection.
    async fn save_all(
        &self,
        collection: Collection,
        records: BTreeMap<String, Value>,
    ) -> Result<(), StoreError>;

    async fn count(&self, collection: Collection) -> Result<usize, StoreError>;
}

/// Typed view over one collection.
pub struct Table<T> {
    store: Arc<dyn KvStore>,
    collection: Collection,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Table<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            collection: self.collection,
            _record: PhantomData,
        }
    }
}

impl<T> Table<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    pub fn new(store: Arc<dyn KvStore>, collection: Collection) -> Self {
        Self {
            store,
            collection,
            _record: PhantomData,
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<T>, StoreError> {
        self.store
            .get(self.collection, key)
            .await?
            .map(|v| self.decode(v))
            .transpose()
    }

    pub async fn put(&self, key: &str, record: &T) -> Result<(), StoreError> {
        let value = self.encode(record)?;
        self.store.put(self.collection, key, value).await
    }

    /// Inserts only if the key is absent. Returns false when it already exists.
    pub async fn insert_new(&self, key: &str, record: &T) -> Result<bool, StoreError> {
        let value = self.encode(record)?;
        self.store
            .compare_and_swap(self.collection, key, None, value)
            .await
    }

    /// Optimistic read-modify-write. `f` sees the current record (or `None`)
    /// and returns the record to write, or `None` to leave the key untouched.
    /// Retries when another writer got there first.
    pub async fn update<F>(&self, key: &str, mut f: F) -> Result<Option<T>, StoreError>
    where
        F: FnMut(Option<T>) -> Option<T> + Send,
    {
        for _ in 0..MAX_CAS_ATTEMPTS {
            let current = self.store.get(self.collection, key).await?;
            let decoded = current.clone().map(|v| self.decode(v)).transpose()?;
            let Some(next) = f(decoded) else {
                return Ok(None);
            };
            let encoded = self.encode(&next)?;
            if self
                .store
                .compare_and_swap(self.collection, key, current.as_ref(), encoded)
                .await?
            {
                return Ok(Some(next));
            }
            tracing::debug!("CAS lost on {}/{key}, retrying", self.collection);
        }
        Err(StoreError::Conflict {
            collection: self.collection.to_string(),
            key: key.to_string(),
        })
    }

    pub async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        self.store.remove(self.collection, key).await
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.clear(self.collection).await
    }

    pub async fn load_all(&self) -> Result<BTreeMap<String, T>, StoreError> {
        self.store
            .load_all(self.collection)
            .await?
            .into_iter()
            .map(|(k, v)| Ok((k, self.decode(v)?)))
            .collect()
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        self.store.count(self.collection).await
    }

    fn decode(&self, value: Value) -> Result<T, StoreError> {
        serde_json::from_value(value).map_err(|source| StoreError::Corrupt {
            collection: self.collection.to_string(),
            source,
        })
    }

    fn encode(&self, record: &T) -> Result<Value, StoreError> {
        serde_json::to_value(record).map_err(|source| StoreError::Corrupt {
            collection: self.collection.to_string(),
            source,
        })
    }
}

/// The persisted collections, typed.
#[derive(Clone)]
pub struct Tables {
    pub users: Table<UserAccount>,
    pub companies: Table<CompanyAccount>,
    pub schedules: Table<UserSchedule>,
    /// Reservation of every registered email.
    pub accounts: Table<Role>,
}

impl Tables {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            users: Table::new(store.clone(), Collection::Users),
            companies: Table::new(store.clone(), Collection::Companies),
            schedules: Table::new(store.clone(), Collection::Schedules),
            accounts: Table::new(store, Collection::Accounts),
        }
    }
}
