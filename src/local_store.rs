//! On-device key-value persistence.
//!
//! The repository only needs get/put of serialized collections by logical
//! key. [`LmdbStore`] is the production adapter; [`MemoryStore`] keeps the
//! same contract inside the process for ephemeral sessions.
//!
//! A single `put` is only as atomic as the backing store makes it. LMDB
//! commits each transaction atomically, and [`LocalStore::put_many`] writes
//! every collection of a snapshot in one transaction.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use lmdb::{Database, Environment, Transaction, WriteFlags};
use log::{debug, info};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("LMDB error: {0}")]
    Lmdb(#[from] lmdb::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Get/put of opaque values by key.
///
/// Implementations must at least provide read-after-write consistency within
/// the same process.
pub trait LocalStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Writes several keys. The default writes them one by one; stores that
    /// support transactions should override it to write all or nothing.
    fn put_many(&self, entries: &[(&str, Vec<u8>)]) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.put(key, value)?;
        }
        Ok(())
    }
}

impl<S: LocalStore + ?Sized> LocalStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        (**self).put(key, value)
    }

    fn put_many(&self, entries: &[(&str, Vec<u8>)]) -> Result<(), StoreError> {
        (**self).put_many(entries)
    }
}

/// Default LMDB map size (10 MiB).
pub const DEFAULT_MAP_SIZE: usize = 10 * 1024 * 1024;

/// LMDB-backed store. The environment lives in a `<name>.lmdb` directory.
pub struct LmdbStore {
    env: Environment,
    db: Database,
    path: PathBuf,
}

impl LmdbStore {
    /// Opens (or creates) the environment for `name`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use grocery_core::local_store::{LmdbStore, LocalStore, DEFAULT_MAP_SIZE};
    ///
    /// let store = LmdbStore::open("groceries", DEFAULT_MAP_SIZE)?;
    /// store.put("categories", b"[]")?;
    /// assert_eq!(store.get("categories")?, Some(b"[]".to_vec()));
    /// # Ok::<(), grocery_core::local_store::StoreError>(())
    /// ```
    pub fn open(name: impl AsRef<Path>, map_size: usize) -> Result<Self, StoreError> {
        let path = lmdb_dir(name.as_ref());

        if path.exists() {
            info!("Opening existing LMDB environment at {}", path.display());
        } else {
            info!("Creating LMDB environment at {}", path.display());
            std::fs::create_dir_all(&path)?;
        }

        let env = Environment::new().set_map_size(map_size).open(&path)?;
        let db = env.open_db(None)?;

        Ok(Self { env, db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn lmdb_dir(name: &Path) -> PathBuf {
    let mut dir = name.as_os_str().to_owned();
    dir.push(".lmdb");
    PathBuf::from(dir)
}

impl LocalStore for LmdbStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let txn = self.env.begin_ro_txn()?;
        let value = match txn.get(self.db, &key) {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(lmdb::Error::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        txn.commit()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut txn = self.env.begin_rw_txn()?;
        txn.put(self.db, &key, &value, WriteFlags::empty())?;
        txn.commit()?;
        debug!("Stored {} bytes under '{key}'", value.len());
        Ok(())
    }

    fn put_many(&self, entries: &[(&str, Vec<u8>)]) -> Result<(), StoreError> {
        let mut txn = self.env.begin_rw_txn()?;
        for (key, value) in entries {
            txn.put(self.db, key, value, WriteFlags::empty())?;
        }
        txn.commit()?;
        debug!("Stored {} keys in one transaction", entries.len());
        Ok(())
    }
}

/// In-process store with the same contract as [`LmdbStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn put_many(&self, batch: &[(&str, Vec<u8>)]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        for (key, value) in batch {
            entries.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }
}
