//! Permutation type: one recorded state of a deck.
//!
//! Everything on a permutation is write-once except its performance
//! counters, which the performance tracker increments after each match.

use chrono::{DateTime, Utc};
use decklineage_kernel::{CardChange, ContentHash, DeckItem, ItemDiff};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::performance::PerformanceCounters;

/// Store-assigned surrogate identifier. Never reused after deletion.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PermutationId(pub u64);

impl fmt::Display for PermutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PermutationId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().trim_start_matches('#').parse().map(Self)
    }
}

/// A recorded version of a deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permutation {
    // ── Identity ──
    pub id: PermutationId,
    pub deck_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_permutation_id: Option<PermutationId>,

    // ── Content (canonical order) ──
    pub cards: Vec<DeckItem>,
    pub content_hash: ContentHash,

    // ── Labels ──
    pub version_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_summary: Option<String>,

    // ── Mutable counters ──
    #[serde(default)]
    pub performance: PerformanceCounters,

    pub created_at: DateTime<Utc>,
}

impl Permutation {
    /// Display label: the version name when set, otherwise `v<number>`.
    pub fn label(&self) -> String {
        match &self.version_name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("v{}", self.version_number),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_permutation_id.is_none()
    }
}

/// An explicit permutation supplied by a caller, typically when importing
/// history recorded elsewhere.
///
/// Optional fields are filled by the store: `content_hash` is recomputed
/// and checked when given, `version_number` defaults to the deck's next
/// number, and `created_at` defaults to the injected clock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPermutation {
    pub deck_id: String,
    #[serde(default)]
    pub parent_permutation_id: Option<PermutationId>,
    pub cards: Vec<DeckItem>,
    #[serde(default)]
    pub content_hash: Option<ContentHash>,
    #[serde(default)]
    pub version_number: Option<u32>,
    #[serde(default)]
    pub version_name: Option<String>,
    #[serde(default)]
    pub change_summary: Option<String>,
    #[serde(default)]
    pub performance: PerformanceCounters,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewPermutation {
    pub fn new(deck_id: impl Into<String>, cards: Vec<DeckItem>) -> Self {
        Self {
            deck_id: deck_id.into(),
            cards,
            ..Self::default()
        }
    }
}

/// Differences between two stored permutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermutationDiff {
    pub from_permutation_id: PermutationId,
    pub to_permutation_id: PermutationId,
    pub added_cards: Vec<DeckItem>,
    pub removed_cards: Vec<DeckItem>,
    pub changed_cards: Vec<CardChange>,
}

impl PermutationDiff {
    pub fn from_items(from: PermutationId, to: PermutationId, diff: ItemDiff) -> Self {
        Self {
            from_permutation_id: from,
            to_permutation_id: to,
            added_cards: diff.added,
            removed_cards: diff.removed,
            changed_cards: diff.changed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added_cards.is_empty() && self.removed_cards.is_empty() && self.changed_cards.is_empty()
    }
}
