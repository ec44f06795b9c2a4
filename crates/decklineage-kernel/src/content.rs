//! Canonical content identity for deck states.
//!
//! A deck state is identified by what it contains, not by the order its
//! lines were read in. The canonical form sorts lines by
//! `(card_id, board)` and joins `card_id:quantity:board` entries with `|`;
//! the content hash is the SHA-256 of that form.
//!
//! Two deck states with the same `ContentHash` are the same permutation.

use crate::item::{DeckItem, FIELD_SEPARATOR, ITEM_SEPARATOR};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A content-addressed digest of a deck state (lowercase hex SHA-256).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Compute a content hash from raw bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{hash:x}"))
    }

    /// Hash a deck's item list, independent of input order.
    pub fn of_items(items: &[DeckItem]) -> Self {
        Self::from_bytes(canonical_form(items).as_bytes())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines and terse output.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Build the canonical string form of an item list.
///
/// Lines are ordered by `(card_id, board)`; quantity only breaks ties so
/// that even a malformed list with repeated keys hashes the same in every
/// order. The empty list yields the empty string.
pub fn canonical_form(items: &[DeckItem]) -> String {
    let mut sorted: Vec<&DeckItem> = items.iter().collect();
    sorted.sort_by(|a, b| {
        a.card_id
            .cmp(&b.card_id)
            .then_with(|| a.board.cmp(&b.board))
            .then_with(|| a.quantity.cmp(&b.quantity))
    });

    let mut out = String::new();
    for (index, item) in sorted.into_iter().enumerate() {
        if index > 0 {
            out.push(ITEM_SEPARATOR);
        }
        out.push_str(&item.card_id.to_string());
        out.push(FIELD_SEPARATOR);
        out.push_str(&item.quantity.to_string());
        out.push(FIELD_SEPARATOR);
        out.push_str(&item.board);
    }
    out
}

/// Convenience alias for [`ContentHash::of_items`].
pub fn content_hash(items: &[DeckItem]) -> ContentHash {
    ContentHash::of_items(items)
}
