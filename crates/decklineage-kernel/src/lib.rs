//! # Deck Lineage Kernel
//!
//! The storage-free core of deck versioning: what a deck state *is* and how
//! two states compare.
//!
//! ## Architecture
//!
//! ```text
//! DeckItem        ← one (card_id, quantity, board) line
//!     │
//! ContentHash     ← order-independent identity of a full item list
//!     │
//! ItemDiff        ← added / removed / changed lines between two lists
//! ```
//!
//! Persistence, current-version pointers and performance counters live in
//! `decklineage-store`.

pub mod content;
pub mod diff;
pub mod error;
pub mod item;

pub use content::{ContentHash, canonical_form, content_hash};
pub use diff::{CardChange, ItemDiff, diff_items};
pub use error::ItemError;
pub use item::{
    BOARD_MAIN, BOARD_SIDEBOARD, DeckItem, ItemKey, canonicalize_items, sort_canonical,
    total_quantity, validate_items,
};
