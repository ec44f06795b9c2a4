//! # decklineage-store
//!
//! Versioned storage for deck permutations.
//!
//! This crate provides:
//! - `Permutation` and its performance counters (the stored rows)
//! - JSONL read/write (portable persistence)
//! - `MemoryStore` (canonical in-memory state and its constraints)
//! - backends that run reads and atomic transactions over a store
//! - `PermutationRepository`, the service that snapshots live decks,
//!   maintains current pointers, diffs versions and tracks results
//!
//! Live deck contents are not owned here. They are read through a
//! `DeckSource` supplied by the caller.
//!
//! ## Data model
//!
//! ```text
//! JSONL (on disk, one record per line)
//!     ↕  load / save under a lock file
//! MemoryStore (deterministic in-memory projection)
//!     ↕  read / transact
//! PermutationRepository ◀── DeckSource, Clock
//! ```

pub mod atomic_store;
pub mod backend;
pub mod clock;
pub mod deck;
pub mod error;
pub mod jsonl;
pub mod memory;
pub mod performance;
pub mod permutation;
pub mod repository;
pub mod source;

pub use atomic_store::{
    AtomicStoreMutationError, DEFAULT_LOCK_RETRY_DELAY_MS, LockPolicy, StoreLockError,
    mutate_store_jsonl, store_lock_path,
};
pub use backend::{BackendError, InMemoryBackend, JsonlBackend, PermutationBackend};
pub use clock::{Clock, ManualClock, SystemClock};
pub use deck::DeckRecord;
pub use error::LineageError;
pub use jsonl::{
    JsonlError, StoreRecord, read_records, read_records_from_path, write_records,
    write_records_to_path,
};
pub use memory::{MemoryStore, MemoryStoreError, RemovedPermutation};
pub use performance::{PerformanceCounters, PermutationPerformance};
pub use permutation::{NewPermutation, Permutation, PermutationDiff, PermutationId};
pub use repository::{PermutationRepository, Snapshot, SnapshotOutcome};
pub use source::{DeckSource, InMemoryDeckSource, JsonDeckSource, SourceError};
