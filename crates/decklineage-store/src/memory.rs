//! Canonical in-memory representation of permutation state.
//!
//! This is the memory boundary for `decklineage-store`:
//! - load/store JSONL
//! - enforce the store-level constraints (unique `(deck_id, content_hash)`,
//!   strictly increasing version numbers, same-deck parents and pointers)
//! - expose deterministic permutation queries
//!
//! It knows nothing about live decks or clocks; callers pass in fully
//! formed rows and timestamps.

use crate::deck::DeckRecord;
use crate::jsonl::{JsonlError, StoreRecord, read_records_from_path, write_records_to_path};
use crate::permutation::{Permutation, PermutationId};
use chrono::{DateTime, Utc};
use decklineage_kernel::ContentHash;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Errors raised while loading, querying or mutating the memory store.
#[derive(Debug, thiserror::Error)]
pub enum MemoryStoreError {
    #[error(transparent)]
    Jsonl(#[from] JsonlError),

    #[error("permutation not found: {0}")]
    PermutationNotFound(PermutationId),

    #[error("duplicate permutation id in store: {0}")]
    DuplicateId(PermutationId),

    /// Uniqueness violation on `(deck_id, content_hash)`.
    #[error("deck {deck_id} already records content {content_hash} as permutation {existing}")]
    DuplicateContent {
        deck_id: String,
        content_hash: ContentHash,
        existing: PermutationId,
    },

    #[error(
        "version {version_number} for deck {deck_id} must be greater than {high_water}"
    )]
    VersionNotIncreasing {
        deck_id: String,
        version_number: u32,
        high_water: u32,
    },

    #[error("deck {deck_id} has used every version number up to {high_water}")]
    VersionsExhausted { deck_id: String, high_water: u32 },

    #[error("permutation {permutation_id} repeats version {version_number} of deck {deck_id}")]
    DuplicateVersion {
        deck_id: String,
        permutation_id: PermutationId,
        version_number: u32,
    },

    #[error("permutation {permutation_id} stores hash {stored} but its cards hash to {computed}")]
    StaleContentHash {
        permutation_id: PermutationId,
        stored: ContentHash,
        computed: ContentHash,
    },

    #[error("parent permutation {parent} is not a permutation of deck {deck_id}")]
    ForeignParent {
        deck_id: String,
        parent: PermutationId,
    },

    #[error("permutation {permutation_id} belongs to deck {owner_deck_id}, not {deck_id}")]
    OwnershipViolation {
        deck_id: String,
        permutation_id: PermutationId,
        owner_deck_id: String,
    },
}

/// What a single permutation deletion touched.
#[derive(Debug, Clone)]
pub struct RemovedPermutation {
    pub permutation: Permutation,
    /// Children whose parent link was cleared.
    pub orphaned: Vec<PermutationId>,
    /// Whether the deck's current pointer referenced the removed row.
    pub cleared_current: bool,
}

/// Canonical in-memory state for permutations and deck pointers.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    permutations: BTreeMap<PermutationId, Permutation>,
    by_content: BTreeMap<(String, ContentHash), PermutationId>,
    decks: BTreeMap<String, DeckRecord>,
    last_permutation_id: u64,
}

impl MemoryStore {
    /// Build a store from persisted records.
    ///
    /// Every constraint is re-checked and content hashes are recomputed,
    /// so a hand-edited file that violates uniqueness, repeats a version
    /// number, carries a stale hash or breaks same-deck parentage is
    /// rejected rather than loaded.
    pub fn from_records(records: Vec<StoreRecord>) -> Result<Self, MemoryStoreError> {
        let mut store = Self::default();
        let mut permutations = Vec::new();

        for record in records {
            match record {
                StoreRecord::Sequence {
                    last_permutation_id,
                } => {
                    store.last_permutation_id = store.last_permutation_id.max(last_permutation_id);
                }
                StoreRecord::Deck(deck) => {
                    store.decks.insert(deck.deck_id.clone(), deck);
                }
                StoreRecord::Permutation(permutation) => permutations.push(permutation),
            }
        }

        permutations.sort_by_key(|permutation| permutation.id);
        for permutation in permutations {
            store.restore(permutation)?;
        }

        let pointers: Vec<(String, PermutationId)> = store
            .decks
            .values()
            .filter_map(|deck| {
                deck.current_permutation_id
                    .map(|id| (deck.deck_id.clone(), id))
            })
            .collect();
        for (deck_id, id) in pointers {
            store.check_owned(&deck_id, id)?;
        }

        Ok(store)
    }

    /// Serialize store state into records, in a deterministic order.
    pub fn records(&self) -> Vec<StoreRecord> {
        let mut records = Vec::with_capacity(1 + self.decks.len() + self.permutations.len());
        records.push(StoreRecord::Sequence {
            last_permutation_id: self.last_permutation_id,
        });
        records.extend(self.decks.values().cloned().map(StoreRecord::Deck));
        records.extend(
            self.permutations
                .values()
                .cloned()
                .map(StoreRecord::Permutation),
        );
        records
    }

    /// Load store state from a JSONL file.
    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Self, MemoryStoreError> {
        let records = read_records_from_path(path)?;
        Self::from_records(records)
    }

    /// Load store state, treating a missing file as an empty store.
    pub fn load_jsonl_or_empty(path: impl AsRef<Path>) -> Result<Self, MemoryStoreError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_jsonl(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Persist store state to a JSONL file.
    pub fn save_jsonl(&self, path: impl AsRef<Path>) -> Result<(), MemoryStoreError> {
        write_records_to_path(path, &self.records())?;
        Ok(())
    }

    /// Total number of permutations in memory.
    pub fn len(&self) -> usize {
        self.permutations.len()
    }

    /// Whether the store has zero permutations.
    pub fn is_empty(&self) -> bool {
        self.permutations.is_empty()
    }

    /// Lookup one permutation by ID.
    pub fn permutation(&self, id: PermutationId) -> Option<&Permutation> {
        self.permutations.get(&id)
    }

    /// Iterate all permutations in ID order.
    pub fn permutations(&self) -> impl Iterator<Item = &Permutation> {
        self.permutations.values()
    }

    /// All permutations of a deck, by ascending version number.
    pub fn permutations_of(&self, deck_id: &str) -> Vec<&Permutation> {
        let mut out: Vec<&Permutation> = self
            .permutations
            .values()
            .filter(|permutation| permutation.deck_id == deck_id)
            .collect();
        out.sort_by_key(|permutation| permutation.version_number);
        out
    }

    /// The deck's permutation with the given content hash, if recorded.
    pub fn by_content(&self, deck_id: &str, content_hash: &ContentHash) -> Option<&Permutation> {
        self.by_content
            .get(&(deck_id.to_string(), content_hash.clone()))
            .and_then(|id| self.permutations.get(id))
    }

    /// Most recently created permutation of a deck.
    ///
    /// Ties on `created_at` go to the higher (later assigned) id.
    pub fn latest_of(&self, deck_id: &str) -> Option<&Permutation> {
        self.permutations
            .values()
            .filter(|permutation| permutation.deck_id == deck_id)
            .max_by_key(|permutation| (permutation.created_at, permutation.id))
    }

    pub fn deck(&self, deck_id: &str) -> Option<&DeckRecord> {
        self.decks.get(deck_id)
    }

    /// The deck's explicit current pointer, without fallback.
    pub fn current_pointer(&self, deck_id: &str) -> Option<PermutationId> {
        self.decks
            .get(deck_id)
            .and_then(|deck| deck.current_permutation_id)
    }

    /// The deck's current permutation, falling back to its latest one.
    pub fn current_of(&self, deck_id: &str) -> Option<&Permutation> {
        match self
            .current_pointer(deck_id)
            .and_then(|id| self.permutations.get(&id))
        {
            Some(current) => Some(current),
            None => self.latest_of(deck_id),
        }
    }

    /// `max(high-water, max existing version) + 1` for the deck.
    ///
    /// Fails once the deck has used `u32::MAX`; numbers are never reused.
    pub fn next_version_number(&self, deck_id: &str) -> Result<u32, MemoryStoreError> {
        let existing = self
            .permutations
            .values()
            .filter(|permutation| permutation.deck_id == deck_id)
            .map(|permutation| permutation.version_number)
            .max()
            .unwrap_or(0);
        let high_water = self
            .decks
            .get(deck_id)
            .map(|deck| deck.version_high_water)
            .unwrap_or(0);
        let high_water = existing.max(high_water);
        high_water
            .checked_add(1)
            .ok_or_else(|| MemoryStoreError::VersionsExhausted {
                deck_id: deck_id.to_string(),
                high_water,
            })
    }

    /// Insert a new permutation, assigning its id.
    ///
    /// The incoming `id` is ignored. Fails without side effects when the
    /// deck already records the same content, when the version number does
    /// not exceed every number previously assigned to the deck, or when the
    /// parent is missing or belongs to another deck.
    pub fn insert_permutation(
        &mut self,
        mut permutation: Permutation,
    ) -> Result<PermutationId, MemoryStoreError> {
        let deck_id = permutation.deck_id.clone();

        if let Some(existing) = self.by_content(&deck_id, &permutation.content_hash) {
            return Err(MemoryStoreError::DuplicateContent {
                deck_id,
                content_hash: permutation.content_hash.clone(),
                existing: existing.id,
            });
        }

        let next = self.next_version_number(&deck_id)?;
        if permutation.version_number < next {
            return Err(MemoryStoreError::VersionNotIncreasing {
                deck_id,
                version_number: permutation.version_number,
                high_water: next - 1,
            });
        }

        if let Some(parent) = permutation.parent_permutation_id {
            match self.permutations.get(&parent) {
                Some(row) if row.deck_id == deck_id => {}
                _ => return Err(MemoryStoreError::ForeignParent { deck_id, parent }),
            }
        }

        self.last_permutation_id += 1;
        let id = PermutationId(self.last_permutation_id);
        permutation.id = id;
        self.index(permutation);
        Ok(id)
    }

    /// Point a deck at one of its own permutations.
    ///
    /// The ownership check and the pointer write happen together; on
    /// failure the pointer is left untouched.
    pub fn set_current(
        &mut self,
        deck_id: &str,
        permutation_id: PermutationId,
    ) -> Result<Option<PermutationId>, MemoryStoreError> {
        self.check_owned(deck_id, permutation_id)?;
        let deck = self.deck_entry(deck_id);
        Ok(deck.current_permutation_id.replace(permutation_id))
    }

    /// Clear a deck's current pointer. Returns the previous value.
    pub fn clear_current(&mut self, deck_id: &str) -> Option<PermutationId> {
        self.decks
            .get_mut(deck_id)
            .and_then(|deck| deck.current_permutation_id.take())
    }

    /// Fold one match result into a permutation's counters.
    pub fn record_match(
        &mut self,
        permutation_id: PermutationId,
        match_won: bool,
        games_won: u32,
        games_lost: u32,
        at: DateTime<Utc>,
    ) -> Result<&Permutation, MemoryStoreError> {
        let permutation = self
            .permutations
            .get_mut(&permutation_id)
            .ok_or(MemoryStoreError::PermutationNotFound(permutation_id))?;
        permutation
            .performance
            .record_match(match_won, games_won, games_lost, at);
        Ok(permutation)
    }

    /// Remove one permutation.
    ///
    /// Children keep existing with their parent link cleared. A current
    /// pointer at the removed row is cleared as well. Version numbers stay
    /// reserved through the deck's high-water mark.
    pub fn remove_permutation(
        &mut self,
        permutation_id: PermutationId,
    ) -> Result<RemovedPermutation, MemoryStoreError> {
        let permutation = self
            .permutations
            .remove(&permutation_id)
            .ok_or(MemoryStoreError::PermutationNotFound(permutation_id))?;
        self.by_content.remove(&(
            permutation.deck_id.clone(),
            permutation.content_hash.clone(),
        ));

        let mut orphaned = Vec::new();
        for child in self.permutations.values_mut() {
            if child.parent_permutation_id == Some(permutation_id) {
                child.parent_permutation_id = None;
                orphaned.push(child.id);
            }
        }

        let cleared_current = self.current_pointer(&permutation.deck_id) == Some(permutation_id);
        if cleared_current {
            self.clear_current(&permutation.deck_id);
        }

        Ok(RemovedPermutation {
            permutation,
            orphaned,
            cleared_current,
        })
    }

    /// Remove every permutation of a deck and clear its pointer.
    ///
    /// The deck record itself stays, carrying the version high-water mark,
    /// so a deck that is snapshotted again continues its numbering.
    /// Returns the number of permutations removed.
    pub fn remove_deck(&mut self, deck_id: &str) -> usize {
        let ids: Vec<PermutationId> = self
            .permutations
            .values()
            .filter(|permutation| permutation.deck_id == deck_id)
            .map(|permutation| permutation.id)
            .collect();
        for id in &ids {
            if let Some(permutation) = self.permutations.remove(id) {
                self.by_content
                    .remove(&(permutation.deck_id, permutation.content_hash));
            }
        }
        self.clear_current(deck_id);
        ids.len()
    }

    /// Parent chain from `permutation_id` back to its root, newest first.
    pub fn lineage(
        &self,
        permutation_id: PermutationId,
    ) -> Result<Vec<&Permutation>, MemoryStoreError> {
        let mut chain = Vec::new();
        let mut visited = BTreeSet::new();
        let mut cursor = Some(permutation_id);

        while let Some(id) = cursor {
            if !visited.insert(id) {
                break;
            }
            let permutation = match self.permutations.get(&id) {
                Some(permutation) => permutation,
                None if id == permutation_id => {
                    return Err(MemoryStoreError::PermutationNotFound(id));
                }
                None => break,
            };
            chain.push(permutation);
            cursor = permutation.parent_permutation_id;
        }

        Ok(chain)
    }

    fn check_owned(
        &self,
        deck_id: &str,
        permutation_id: PermutationId,
    ) -> Result<(), MemoryStoreError> {
        let permutation = self
            .permutations
            .get(&permutation_id)
            .ok_or(MemoryStoreError::PermutationNotFound(permutation_id))?;
        if permutation.deck_id != deck_id {
            return Err(MemoryStoreError::OwnershipViolation {
                deck_id: deck_id.to_string(),
                permutation_id,
                owner_deck_id: permutation.deck_id.clone(),
            });
        }
        Ok(())
    }

    fn deck_entry(&mut self, deck_id: &str) -> &mut DeckRecord {
        self.decks
            .entry(deck_id.to_string())
            .or_insert_with(|| DeckRecord::new(deck_id))
    }

    /// Re-insert a persisted row, keeping its id.
    fn restore(&mut self, permutation: Permutation) -> Result<(), MemoryStoreError> {
        if self.permutations.contains_key(&permutation.id) {
            return Err(MemoryStoreError::DuplicateId(permutation.id));
        }
        let computed = ContentHash::of_items(&permutation.cards);
        if computed != permutation.content_hash {
            return Err(MemoryStoreError::StaleContentHash {
                permutation_id: permutation.id,
                stored: permutation.content_hash.clone(),
                computed,
            });
        }
        if self.permutations.values().any(|row| {
            row.deck_id == permutation.deck_id && row.version_number == permutation.version_number
        }) {
            return Err(MemoryStoreError::DuplicateVersion {
                deck_id: permutation.deck_id.clone(),
                permutation_id: permutation.id,
                version_number: permutation.version_number,
            });
        }
        if let Some(existing) = self.by_content(&permutation.deck_id, &permutation.content_hash) {
            return Err(MemoryStoreError::DuplicateContent {
                deck_id: permutation.deck_id.clone(),
                content_hash: permutation.content_hash.clone(),
                existing: existing.id,
            });
        }
        if let Some(parent) = permutation.parent_permutation_id {
            match self.permutations.get(&parent) {
                Some(row) if row.deck_id == permutation.deck_id => {}
                _ => {
                    return Err(MemoryStoreError::ForeignParent {
                        deck_id: permutation.deck_id.clone(),
                        parent,
                    });
                }
            }
        }
        self.last_permutation_id = self.last_permutation_id.max(permutation.id.0);
        self.index(permutation);
        Ok(())
    }

    fn index(&mut self, permutation: Permutation) {
        let deck = self.deck_entry(&permutation.deck_id);
        deck.version_high_water = deck.version_high_water.max(permutation.version_number);
        self.by_content.insert(
            (permutation.deck_id.clone(), permutation.content_hash.clone()),
            permutation.id,
        );
        self.permutations.insert(permutation.id, permutation);
    }
}
