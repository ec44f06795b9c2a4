//! Card line items: the unit of deck content.
//!
//! A deck's state is an unordered set of `(card_id, board) -> quantity`
//! entries. Absence means quantity zero, so a stored line never carries a
//! zero quantity.

use crate::error::ItemError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub const BOARD_MAIN: &str = "main";
pub const BOARD_SIDEBOARD: &str = "sideboard";

/// Characters reserved by the canonical hash form.
pub(crate) const FIELD_SEPARATOR: char = ':';
pub(crate) const ITEM_SEPARATOR: char = '|';

/// One card line inside a deck snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeckItem {
    pub card_id: i64,
    pub quantity: u32,
    pub board: String,
}

impl DeckItem {
    pub fn new(card_id: i64, quantity: u32, board: impl Into<String>) -> Self {
        Self {
            card_id,
            quantity,
            board: board.into(),
        }
    }

    /// Shorthand for a main-board line.
    pub fn main(card_id: i64, quantity: u32) -> Self {
        Self::new(card_id, quantity, BOARD_MAIN)
    }

    /// Shorthand for a sideboard line.
    pub fn sideboard(card_id: i64, quantity: u32) -> Self {
        Self::new(card_id, quantity, BOARD_SIDEBOARD)
    }

    pub fn key(&self) -> ItemKey {
        ItemKey {
            card_id: self.card_id,
            board: self.board.clone(),
        }
    }
}

/// Identity of a line: the same card on two boards is two lines.
///
/// Ordering is `(card_id, board)` ascending, which is the canonical order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    pub card_id: i64,
    pub board: String,
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.card_id, self.board)
    }
}

/// Check a raw item list against the line-item rules.
///
/// Rejects zero quantities, empty boards, boards containing a reserved
/// separator, and repeated `(card_id, board)` keys.
pub fn validate_items(items: &[DeckItem]) -> Result<(), ItemError> {
    let mut seen = BTreeSet::new();
    for item in items {
        if item.quantity == 0 {
            return Err(ItemError::ZeroQuantity {
                card_id: item.card_id,
                board: item.board.clone(),
            });
        }
        if item.board.is_empty() {
            return Err(ItemError::EmptyBoard {
                card_id: item.card_id,
            });
        }
        if item.board.contains(&[FIELD_SEPARATOR, ITEM_SEPARATOR][..]) {
            return Err(ItemError::ReservedCharacter {
                card_id: item.card_id,
                board: item.board.clone(),
            });
        }
        if !seen.insert(item.key()) {
            return Err(ItemError::DuplicateLine {
                card_id: item.card_id,
                board: item.board.clone(),
            });
        }
    }
    Ok(())
}

/// Sort items into canonical `(card_id, board)` order.
pub fn sort_canonical(items: &mut [DeckItem]) {
    items.sort_by(|a, b| {
        a.card_id
            .cmp(&b.card_id)
            .then_with(|| a.board.cmp(&b.board))
    });
}

/// Validate and return a canonically ordered copy of `items`.
pub fn canonicalize_items(items: &[DeckItem]) -> Result<Vec<DeckItem>, ItemError> {
    validate_items(items)?;
    let mut sorted = items.to_vec();
    sort_canonical(&mut sorted);
    Ok(sorted)
}

/// Total card count across all boards.
pub fn total_quantity(items: &[DeckItem]) -> u64 {
    items.iter().map(|item| u64::from(item.quantity)).sum()
}
