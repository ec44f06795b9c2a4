//! Lock-scoped read-modify-write of a JSONL permutation store.
//!
//! ```text
//! process gate (per lock path) ─▶ <store>.lock  (create_new, removed on drop)
//!     load <store> ──▶ mutator(&mut MemoryStore) ──▶ save <store> if changed
//! ```
//!
//! Threads of one process queue on an in-process gate; processes meet at
//! the lock file. Under the default policy a writer waits until the lock
//! is free, so contention costs time and never surfaces as an error.

use crate::{MemoryStore, MemoryStoreError};
use chrono::Utc;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, TryLockError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const DEFAULT_LOCK_RETRY_DELAY_MS: u64 = 20;

/// Waiting longer than this logs a warning (the lock may be stale).
const SLOW_LOCK_WARNING: Duration = Duration::from_secs(10);

/// `<store>.lock` next to the store file.
pub fn store_lock_path(store_path: &Path) -> PathBuf {
    let mut name = OsString::from(store_path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

/// How a writer waits for a busy store lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockPolicy {
    /// Extra attempts after the first one. `None` waits until the lock is
    /// free; `Some(0)` fails fast.
    pub retry_attempts: Option<u32>,
    pub retry_delay: Duration,
}

impl LockPolicy {
    /// Wait for the lock however long it is held.
    pub const fn wait() -> Self {
        Self {
            retry_attempts: None,
            retry_delay: Duration::from_millis(DEFAULT_LOCK_RETRY_DELAY_MS),
        }
    }

    pub const fn bounded(retry_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            retry_attempts: Some(retry_attempts),
            retry_delay,
        }
    }

    pub const fn fail_fast() -> Self {
        Self::bounded(0, Duration::ZERO)
    }
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self::wait()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreLockError {
    #[error("permutation store lock busy: {lock_path}")]
    Busy { lock_path: String },

    #[error("failed to acquire permutation store lock {lock_path}: {source}")]
    Io {
        lock_path: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum AtomicStoreMutationError<E> {
    #[error(transparent)]
    Lock(#[from] StoreLockError),

    #[error(transparent)]
    Store(MemoryStoreError),

    #[error("{0}")]
    Mutation(E),
}

/// Run one mutation against the store at `path` while holding its lock.
///
/// The mutator returns `(value, changed)`. The store is written back only
/// when `changed` is true and the mutator succeeded. A missing store file
/// loads as an empty store.
pub fn mutate_store_jsonl<T, E, F>(
    path: impl AsRef<Path>,
    policy: LockPolicy,
    mutator: F,
) -> Result<T, AtomicStoreMutationError<E>>
where
    F: FnOnce(&mut MemoryStore) -> Result<(T, bool), E>,
{
    let path = path.as_ref();
    let lock_path = store_lock_path(path);

    let gate = process_gate(&lock_path);
    let _turn = match policy.retry_attempts {
        Some(0) => match gate.try_lock() {
            Ok(turn) => turn,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                return Err(StoreLockError::Busy {
                    lock_path: lock_path.display().to_string(),
                }
                .into());
            }
        },
        _ => gate.lock().unwrap_or_else(PoisonError::into_inner),
    };
    let _lock = StoreLock::acquire(lock_path, policy)?;

    let mut store =
        MemoryStore::load_jsonl_or_empty(path).map_err(AtomicStoreMutationError::Store)?;
    let (value, changed) = mutator(&mut store).map_err(AtomicStoreMutationError::Mutation)?;
    if changed {
        store
            .save_jsonl(path)
            .map_err(AtomicStoreMutationError::Store)?;
    }
    Ok(value)
}

/// In-process gate for one lock path, shared by every thread.
fn process_gate(lock_path: &Path) -> Arc<Mutex<()>> {
    static GATES: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    let mut gates = GATES
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    Arc::clone(gates.entry(lock_path.to_path_buf()).or_default())
}

/// Held store lock; the lock file is removed on drop.
struct StoreLock {
    lock_path: PathBuf,
}

impl StoreLock {
    fn acquire(lock_path: PathBuf, policy: LockPolicy) -> Result<Self, StoreLockError> {
        let io_error = |source| StoreLockError::Io {
            lock_path: lock_path.display().to_string(),
            source,
        };
        if let Some(dir) = lock_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_error)?;
        }

        let started = Instant::now();
        let mut warned = false;
        let mut retries_left = policy.retry_attempts;
        let file = loop {
            match Self::create(&lock_path).map_err(io_error)? {
                Some(file) => break file,
                None if retries_left == Some(0) => {
                    debug!(lock_path = %lock_path.display(), "store lock busy; giving up");
                    return Err(StoreLockError::Busy {
                        lock_path: lock_path.display().to_string(),
                    });
                }
                None => {
                    retries_left = retries_left.map(|left| left - 1);
                    if !warned && started.elapsed() >= SLOW_LOCK_WARNING {
                        warn!(
                            lock_path = %lock_path.display(),
                            waited_ms = started.elapsed().as_millis() as u64,
                            "still waiting for store lock"
                        );
                        warned = true;
                    }
                    thread::sleep(policy.retry_delay);
                }
            }
        };
        drop(file);
        Ok(Self { lock_path })
    }

    /// `Ok(None)` when another holder owns the lock.
    fn create(lock_path: &Path) -> io::Result<Option<File>> {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(lock_path)
        {
            Ok(mut file) => {
                // Holder details for whoever finds a stale lock.
                let _ = writeln!(file, "{} {}", std::process::id(), Utc::now().to_rfc3339());
                Ok(Some(file))
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}
