//! `PermutationRepository`: the versioning service over a backend.
//!
//! Ties together the live deck source, the canonical hasher, the memory
//! store constraints and the injected clock:
//!
//! ```text
//! DeckSource ──read──▶ canonicalize + hash ──▶ backend.transact {
//!                                                insert-if-absent (deck_id, content_hash)
//!                                                repoint current
//!                                              }
//! ```

use crate::backend::PermutationBackend;
use crate::clock::{Clock, SystemClock};
use crate::error::LineageError;
use crate::memory::{MemoryStore, MemoryStoreError, RemovedPermutation};
use crate::performance::{PerformanceCounters, PermutationPerformance};
use crate::permutation::{NewPermutation, Permutation, PermutationDiff, PermutationId};
use crate::source::DeckSource;
use decklineage_kernel::{ContentHash, canonicalize_items, diff_items};
use tracing::{debug, info};

/// How `snapshot_current_state` resolved the deck's live contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// A new permutation was recorded.
    Created,
    /// The deck already recorded this content; that row was reused.
    Reused,
}

impl SnapshotOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Reused => "reused",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub permutation: Permutation,
    pub outcome: SnapshotOutcome,
}

pub struct PermutationRepository<B, S, C = SystemClock> {
    backend: B,
    source: S,
    clock: C,
}

impl<B, S> PermutationRepository<B, S, SystemClock>
where
    B: PermutationBackend,
    S: DeckSource,
{
    pub fn new(backend: B, source: S) -> Self {
        Self::with_clock(backend, source, SystemClock)
    }
}

impl<B, S, C> PermutationRepository<B, S, C>
where
    B: PermutationBackend,
    S: DeckSource,
    C: Clock,
{
    pub fn with_clock(backend: B, source: S, clock: C) -> Self {
        Self {
            backend,
            source,
            clock,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn require_deck(&self, deck_id: &str) -> Result<(), LineageError> {
        if self.source.deck_exists(deck_id)? {
            Ok(())
        } else {
            Err(LineageError::DeckNotFound(deck_id.to_string()))
        }
    }

    // ── Version store ──

    /// Insert an explicit permutation, e.g. when importing history.
    ///
    /// The supplied hash, when present, must equal the hash recomputed from
    /// `cards`. The deck's current pointer is not moved.
    pub fn create(&self, new: NewPermutation) -> Result<Permutation, LineageError> {
        let NewPermutation {
            deck_id,
            parent_permutation_id,
            cards,
            content_hash,
            version_number,
            version_name,
            change_summary,
            performance,
            created_at,
        } = new;

        self.require_deck(&deck_id)?;
        let cards = canonicalize_items(&cards)?;
        let computed = ContentHash::of_items(&cards);
        if let Some(supplied) = content_hash
            && supplied != computed
        {
            return Err(LineageError::ContentHashMismatch { supplied, computed });
        }
        let created_at = created_at.unwrap_or_else(|| self.clock.now());

        let permutation = self.backend.transact(|store| -> Result<_, LineageError> {
            let version_number = match version_number {
                Some(version_number) => version_number,
                None => store.next_version_number(&deck_id)?,
            };
            let id = store.insert_permutation(Permutation {
                id: PermutationId::default(),
                deck_id: deck_id.clone(),
                parent_permutation_id,
                cards,
                content_hash: computed,
                version_number,
                version_name,
                change_summary,
                performance,
                created_at,
            })?;
            Ok((fetch(store, id)?, true))
        })?;

        info!(
            deck_id = %permutation.deck_id,
            permutation_id = %permutation.id,
            version_number = permutation.version_number,
            content_hash = permutation.content_hash.short(),
            "imported permutation"
        );
        Ok(permutation)
    }

    pub fn get_by_id(&self, id: PermutationId) -> Result<Option<Permutation>, LineageError> {
        self.backend
            .read(|store| Ok(store.permutation(id).cloned()))
    }

    /// All permutations of a deck, by ascending version number.
    pub fn get_by_deck(&self, deck_id: &str) -> Result<Vec<Permutation>, LineageError> {
        self.backend.read(|store| {
            Ok(store
                .permutations_of(deck_id)
                .into_iter()
                .cloned()
                .collect())
        })
    }

    pub fn get_by_hash(
        &self,
        deck_id: &str,
        content_hash: &ContentHash,
    ) -> Result<Option<Permutation>, LineageError> {
        self.backend
            .read(|store| Ok(store.by_content(deck_id, content_hash).cloned()))
    }

    /// Most recently created permutation of a deck.
    pub fn get_latest(&self, deck_id: &str) -> Result<Option<Permutation>, LineageError> {
        self.backend
            .read(|store| Ok(store.latest_of(deck_id).cloned()))
    }

    pub fn get_next_version_number(&self, deck_id: &str) -> Result<u32, LineageError> {
        self.backend.read(|store| -> Result<_, LineageError> {
            Ok(store.next_version_number(deck_id)?)
        })
    }

    /// Record the deck's live contents as a permutation and make it current.
    ///
    /// Identical contents map to one permutation per deck: when the content
    /// is already recorded (including by a concurrent caller that won the
    /// race), that row is made current and returned with its original
    /// labels.
    pub fn create_from_current_state(
        &self,
        deck_id: &str,
        version_name: Option<String>,
        change_summary: Option<String>,
    ) -> Result<Permutation, LineageError> {
        self.snapshot_current_state(deck_id, version_name, change_summary)
            .map(|snapshot| snapshot.permutation)
    }

    /// Like [`Self::create_from_current_state`], also reporting whether a
    /// row was created or reused.
    pub fn snapshot_current_state(
        &self,
        deck_id: &str,
        version_name: Option<String>,
        change_summary: Option<String>,
    ) -> Result<Snapshot, LineageError> {
        self.require_deck(deck_id)?;
        let live = self.source.read_live_items(deck_id)?;
        let cards = canonicalize_items(&live)?;
        let content_hash = ContentHash::of_items(&cards);
        let created_at = self.clock.now();

        let snapshot = self.backend.transact(|store| -> Result<_, LineageError> {
            // Exhausted numbering still adopts already-recorded content; the
            // insert rejects anything new.
            let version_number = store.next_version_number(deck_id).unwrap_or(u32::MAX);
            let candidate = Permutation {
                id: PermutationId::default(),
                deck_id: deck_id.to_string(),
                parent_permutation_id: store.current_of(deck_id).map(|current| current.id),
                cards,
                content_hash,
                version_number,
                version_name,
                change_summary,
                performance: PerformanceCounters::default(),
                created_at,
            };
            let (permutation, outcome) = insert_or_adopt(store, candidate)?;
            let previous = store.set_current(deck_id, permutation.id)?;
            let changed = outcome == SnapshotOutcome::Created || previous != Some(permutation.id);
            Ok((
                Snapshot {
                    permutation,
                    outcome,
                },
                changed,
            ))
        })?;

        let permutation = &snapshot.permutation;
        match snapshot.outcome {
            SnapshotOutcome::Created => info!(
                deck_id,
                permutation_id = %permutation.id,
                version_number = permutation.version_number,
                parent_permutation_id = ?permutation.parent_permutation_id,
                content_hash = permutation.content_hash.short(),
                "recorded new permutation"
            ),
            SnapshotOutcome::Reused => debug!(
                deck_id,
                permutation_id = %permutation.id,
                version_number = permutation.version_number,
                content_hash = permutation.content_hash.short(),
                "deck content already recorded; reusing permutation"
            ),
        }
        Ok(snapshot)
    }

    /// Delete one permutation.
    ///
    /// Children are kept with their parent link cleared; a current pointer
    /// at the deleted row is cleared so reads fall back to the latest.
    pub fn delete(&self, id: PermutationId) -> Result<RemovedPermutation, LineageError> {
        let removed = self
            .backend
            .transact(|store| -> Result<_, LineageError> {
                Ok((store.remove_permutation(id)?, true))
            })?;
        info!(
            deck_id = %removed.permutation.deck_id,
            permutation_id = %id,
            orphaned = removed.orphaned.len(),
            cleared_current = removed.cleared_current,
            "deleted permutation"
        );
        Ok(removed)
    }

    /// Delete every permutation of a deck and clear its pointer.
    ///
    /// Version numbers already used by the deck stay reserved.
    pub fn delete_deck(&self, deck_id: &str) -> Result<usize, LineageError> {
        let removed = self.backend.transact(|store| -> Result<_, LineageError> {
            let had_pointer = store.current_pointer(deck_id).is_some();
            let removed = store.remove_deck(deck_id);
            Ok((removed, removed > 0 || had_pointer))
        })?;
        info!(deck_id, removed, "deleted deck history");
        Ok(removed)
    }

    /// Parent chain from `id` back to its root, newest first.
    pub fn lineage(&self, id: PermutationId) -> Result<Vec<Permutation>, LineageError> {
        self.backend.read(|store| -> Result<_, LineageError> {
            Ok(store
                .lineage(id)?
                .into_iter()
                .cloned()
                .collect())
        })
    }

    // ── Current pointer ──

    /// Point `deck_id` at `id`, which must be one of the deck's own
    /// permutations. On any failure the pointer is left as it was.
    pub fn set_current(&self, deck_id: &str, id: PermutationId) -> Result<(), LineageError> {
        self.require_deck(deck_id)?;
        let previous = self.backend.transact(|store| -> Result<_, LineageError> {
            let previous = store.set_current(deck_id, id)?;
            Ok((previous, previous != Some(id)))
        })?;
        info!(
            deck_id,
            permutation_id = %id,
            previous = ?previous,
            "set current permutation"
        );
        Ok(())
    }

    /// The deck's current permutation, or its latest when no pointer is set.
    pub fn get_current(&self, deck_id: &str) -> Result<Option<Permutation>, LineageError> {
        self.backend
            .read(|store| Ok(store.current_of(deck_id).cloned()))
    }

    // ── Diff ──

    pub fn get_diff(
        &self,
        from: PermutationId,
        to: PermutationId,
    ) -> Result<PermutationDiff, LineageError> {
        self.backend.read(|store| -> Result<_, LineageError> {
            let from_row = store
                .permutation(from)
                .ok_or(LineageError::PermutationNotFound(from))?;
            let to_row = store
                .permutation(to)
                .ok_or(LineageError::PermutationNotFound(to))?;
            Ok(PermutationDiff::from_items(
                from,
                to,
                diff_items(&from_row.cards, &to_row.cards),
            ))
        })
    }

    // ── Performance ──

    /// Attribute one match result to a permutation.
    pub fn update_performance(
        &self,
        id: PermutationId,
        match_won: bool,
        games_won: u32,
        games_lost: u32,
    ) -> Result<PermutationPerformance, LineageError> {
        let at = self.clock.now();
        let performance = self.backend.transact(|store| -> Result<_, LineageError> {
            let permutation = store.record_match(id, match_won, games_won, games_lost, at)?;
            Ok((PermutationPerformance::from(permutation), true))
        })?;
        debug!(
            permutation_id = %id,
            match_won,
            games_won,
            games_lost,
            matches_played = performance.matches_played,
            "recorded match result"
        );
        Ok(performance)
    }

    pub fn get_performance(
        &self,
        id: PermutationId,
    ) -> Result<Option<PermutationPerformance>, LineageError> {
        self.backend
            .read(|store| Ok(store.permutation(id).map(PermutationPerformance::from)))
    }

    /// Performance of every permutation of a deck, by version number.
    pub fn get_all_performance(
        &self,
        deck_id: &str,
    ) -> Result<Vec<PermutationPerformance>, LineageError> {
        self.backend.read(|store| {
            Ok(store
                .permutations_of(deck_id)
                .into_iter()
                .map(PermutationPerformance::from)
                .collect())
        })
    }
}

fn fetch(store: &MemoryStore, id: PermutationId) -> Result<Permutation, LineageError> {
    store
        .permutation(id)
        .cloned()
        .ok_or(LineageError::PermutationNotFound(id))
}

/// Insert `candidate` unless its deck already records the same content.
///
/// The `(deck_id, content_hash)` constraint decides: on a violation the
/// existing row is adopted unchanged, so the first writer's labels win.
fn insert_or_adopt(
    store: &mut MemoryStore,
    candidate: Permutation,
) -> Result<(Permutation, SnapshotOutcome), LineageError> {
    match store.insert_permutation(candidate) {
        Ok(id) => Ok((fetch(store, id)?, SnapshotOutcome::Created)),
        Err(MemoryStoreError::DuplicateContent {
            deck_id, existing, ..
        }) => {
            debug!(%deck_id, permutation_id = %existing, "content constraint hit; adopting existing row");
            Ok((fetch(store, existing)?, SnapshotOutcome::Reused))
        }
        Err(err) => Err(err.into()),
    }
}
