//! Error taxonomy surfaced by `PermutationRepository`.
//!
//! Uniqueness races on `(deck_id, content_hash)` during
//! `create_from_current_state` never appear here; the repository resolves
//! them by adopting the winning row.

use crate::backend::BackendError;
use crate::memory::MemoryStoreError;
use crate::permutation::PermutationId;
use crate::source::SourceError;
use decklineage_kernel::{ContentHash, ItemError};

#[derive(Debug, thiserror::Error)]
pub enum LineageError {
    // ── Not found ──
    #[error("permutation not found: {0}")]
    PermutationNotFound(PermutationId),

    #[error("deck not found: {0}")]
    DeckNotFound(String),

    // ── Ownership ──
    #[error("permutation {permutation_id} belongs to deck {owner_deck_id}, not {deck_id}")]
    OwnershipViolation {
        deck_id: String,
        permutation_id: PermutationId,
        owner_deck_id: String,
    },

    // ── Validation ──
    #[error("invalid deck items: {0}")]
    InvalidItems(#[from] ItemError),

    #[error("content hash mismatch: supplied {supplied}, computed {computed}")]
    ContentHashMismatch {
        supplied: ContentHash,
        computed: ContentHash,
    },

    /// An explicit create for content the deck already records.
    #[error("deck {deck_id} already records this content as permutation {existing}")]
    DuplicateContent {
        deck_id: String,
        existing: PermutationId,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    // ── Pass-through ──
    #[error("deck source error: {0}")]
    Source(String),

    #[error("storage error: {0}")]
    Storage(#[from] BackendError),
}

impl LineageError {
    /// Whether this error belongs to the not-found class.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PermutationNotFound(_) | Self::DeckNotFound(_)
        )
    }

    /// Whether this error belongs to the validation class.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidItems(_)
                | Self::ContentHashMismatch { .. }
                | Self::DuplicateContent { .. }
                | Self::Validation(_)
        )
    }
}

impl From<MemoryStoreError> for LineageError {
    fn from(err: MemoryStoreError) -> Self {
        match err {
            MemoryStoreError::PermutationNotFound(id) => Self::PermutationNotFound(id),
            MemoryStoreError::OwnershipViolation {
                deck_id,
                permutation_id,
                owner_deck_id,
            } => Self::OwnershipViolation {
                deck_id,
                permutation_id,
                owner_deck_id,
            },
            MemoryStoreError::DuplicateContent {
                deck_id, existing, ..
            } => Self::DuplicateContent { deck_id, existing },
            err @ (MemoryStoreError::VersionNotIncreasing { .. }
            | MemoryStoreError::VersionsExhausted { .. }
            | MemoryStoreError::ForeignParent { .. }) => Self::Validation(err.to_string()),
            err @ (MemoryStoreError::Jsonl(_)
            | MemoryStoreError::DuplicateId(_)
            | MemoryStoreError::DuplicateVersion { .. }
            | MemoryStoreError::StaleContentHash { .. }) => Self::Storage(BackendError::Store(err)),
        }
    }
}

impl From<SourceError> for LineageError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::DeckNotFound(deck_id) => Self::DeckNotFound(deck_id),
            SourceError::Malformed(message) => Self::Validation(message),
            SourceError::Unavailable(message) => Self::Source(message),
        }
    }
}
