//! Storage backends: where a `MemoryStore` lives between operations.
//!
//! A backend offers two primitives. `read` runs a closure against a
//! consistent snapshot. `transact` runs a read-modify-write closure as one
//! atomic unit: either every change it makes becomes visible, or (when the
//! closure fails) none does.

use crate::atomic_store::{
    AtomicStoreMutationError, LockPolicy, StoreLockError, mutate_store_jsonl,
};
use crate::memory::{MemoryStore, MemoryStoreError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Infrastructure failures of a backend, independent of the operation.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("in-memory store lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Lock(#[from] StoreLockError),

    #[error(transparent)]
    Store(#[from] MemoryStoreError),
}

pub trait PermutationBackend: Send + Sync {
    /// Run `reader` against a consistent snapshot of the store.
    fn read<T, E, F>(&self, reader: F) -> Result<T, E>
    where
        F: FnOnce(&MemoryStore) -> Result<T, E>,
        E: From<BackendError>;

    /// Run `mutator` as one atomic unit.
    ///
    /// The mutator returns `(value, changed)`; `changed=false` lets a
    /// backend skip the write-back.
    fn transact<T, E, F>(&self, mutator: F) -> Result<T, E>
    where
        F: FnOnce(&mut MemoryStore) -> Result<(T, bool), E>,
        E: From<BackendError>;
}

impl<T: PermutationBackend> PermutationBackend for Arc<T> {
    fn read<R, E, F>(&self, reader: F) -> Result<R, E>
    where
        F: FnOnce(&MemoryStore) -> Result<R, E>,
        E: From<BackendError>,
    {
        (**self).read(reader)
    }

    fn transact<R, E, F>(&self, mutator: F) -> Result<R, E>
    where
        F: FnOnce(&mut MemoryStore) -> Result<(R, bool), E>,
        E: From<BackendError>,
    {
        (**self).transact(mutator)
    }
}

/// Process-local backend.
///
/// Transactions run on a working copy that replaces the live store only
/// when the closure succeeds.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    store: RwLock<MemoryStore>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: MemoryStore) -> Self {
        Self {
            store: RwLock::new(store),
        }
    }
}

impl PermutationBackend for InMemoryBackend {
    fn read<T, E, F>(&self, reader: F) -> Result<T, E>
    where
        F: FnOnce(&MemoryStore) -> Result<T, E>,
        E: From<BackendError>,
    {
        let guard = self.store.read().map_err(|_| BackendError::Poisoned)?;
        reader(&guard)
    }

    fn transact<T, E, F>(&self, mutator: F) -> Result<T, E>
    where
        F: FnOnce(&mut MemoryStore) -> Result<(T, bool), E>,
        E: From<BackendError>,
    {
        let mut guard = self.store.write().map_err(|_| BackendError::Poisoned)?;
        let mut working = guard.clone();
        let (value, changed) = mutator(&mut working)?;
        if changed {
            *guard = working;
        }
        Ok(value)
    }
}

/// Backend persisting to one JSONL file guarded by a lock file.
///
/// Every transaction reloads the file under the lock, so several processes
/// can share one store.
#[derive(Debug, Clone)]
pub struct JsonlBackend {
    path: PathBuf,
    lock_policy: LockPolicy,
}

impl JsonlBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_policy: LockPolicy::default(),
        }
    }

    pub fn with_lock_policy(mut self, lock_policy: LockPolicy) -> Self {
        self.lock_policy = lock_policy;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PermutationBackend for JsonlBackend {
    fn read<T, E, F>(&self, reader: F) -> Result<T, E>
    where
        F: FnOnce(&MemoryStore) -> Result<T, E>,
        E: From<BackendError>,
    {
        // Writers replace the file by rename, so an unlocked read sees one
        // complete generation.
        let store = MemoryStore::load_jsonl_or_empty(&self.path).map_err(BackendError::Store)?;
        reader(&store)
    }

    fn transact<T, E, F>(&self, mutator: F) -> Result<T, E>
    where
        F: FnOnce(&mut MemoryStore) -> Result<(T, bool), E>,
        E: From<BackendError>,
    {
        mutate_store_jsonl(&self.path, self.lock_policy, mutator).map_err(|err| match err {
            AtomicStoreMutationError::Lock(lock) => BackendError::Lock(lock).into(),
            AtomicStoreMutationError::Store(store) => BackendError::Store(store).into(),
            AtomicStoreMutationError::Mutation(err) => err,
        })
    }
}
