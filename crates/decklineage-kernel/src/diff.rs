//! Line-level differences between two deck states.
//!
//! Both sides are indexed by `(card_id, board)`. A key only in `to` is an
//! addition, a key only in `from` is a removal, and a key on both sides
//! with different quantities is a change. Equal lines are omitted.
//!
//! Output lists are ordered by key so diffs are stable across runs.

use crate::item::{DeckItem, ItemKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A quantity change for one card line between two states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardChange {
    pub card_id: i64,
    pub board: String,
    pub old_quantity: u32,
    pub new_quantity: u32,
}

impl CardChange {
    /// Signed quantity delta (`new - old`).
    pub fn delta(&self) -> i64 {
        i64::from(self.new_quantity) - i64::from(self.old_quantity)
    }
}

/// Classified differences from one item list to another.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDiff {
    pub added: Vec<DeckItem>,
    pub removed: Vec<DeckItem>,
    pub changed: Vec<CardChange>,
}

impl ItemDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// The diff in the opposite direction.
    ///
    /// `diff_items(b, a) == diff_items(a, b).reversed()`.
    pub fn reversed(&self) -> Self {
        Self {
            added: self.removed.clone(),
            removed: self.added.clone(),
            changed: self
                .changed
                .iter()
                .map(|change| CardChange {
                    card_id: change.card_id,
                    board: change.board.clone(),
                    old_quantity: change.new_quantity,
                    new_quantity: change.old_quantity,
                })
                .collect(),
        }
    }
}

fn index(items: &[DeckItem]) -> BTreeMap<ItemKey, &DeckItem> {
    items.iter().map(|item| (item.key(), item)).collect()
}

/// Compute the diff from `from` to `to`.
pub fn diff_items(from: &[DeckItem], to: &[DeckItem]) -> ItemDiff {
    let from_index = index(from);
    let to_index = index(to);
    let mut diff = ItemDiff::default();

    for (key, to_item) in &to_index {
        match from_index.get(key) {
            Some(from_item) if from_item.quantity != to_item.quantity => {
                diff.changed.push(CardChange {
                    card_id: key.card_id,
                    board: key.board.clone(),
                    old_quantity: from_item.quantity,
                    new_quantity: to_item.quantity,
                });
            }
            Some(_) => {}
            None => diff.added.push((*to_item).clone()),
        }
    }

    for (key, from_item) in &from_index {
        if !to_index.contains_key(key) {
            diff.removed.push((*from_item).clone());
        }
    }

    diff
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_added_removed_and_changed() {
        let from = vec![
            DeckItem::main(100, 4),
            DeckItem::main(101, 4),
            DeckItem::main(102, 3),
        ];
        let to = vec![
            DeckItem::main(100, 4),
            DeckItem::main(101, 2),
            DeckItem::main(103, 3),
        ];

        let diff = diff_items(&from, &to);
        assert_eq!(diff.added, vec![DeckItem::main(103, 3)]);
        assert_eq!(diff.removed, vec![DeckItem::main(102, 3)]);
        assert_eq!(
            diff.changed,
            vec![CardChange {
                card_id: 101,
                board: "main".to_string(),
                old_quantity: 4,
                new_quantity: 2,
            }]
        );
        assert_eq!(diff.changed[0].delta(), -2);
    }

    #[test]
    fn board_move_is_a_removal_plus_an_addition() {
        let diff = diff_items(&[DeckItem::main(7, 1)], &[DeckItem::sideboard(7, 1)]);
        assert_eq!(diff.added, vec![DeckItem::sideboard(7, 1)]);
        assert_eq!(diff.removed, vec![DeckItem::main(7, 1)]);
        assert!(diff.changed.is_empty());
    }

    #[test]
    fn identical_states_produce_empty_diff() {
        let items = vec![DeckItem::main(1, 1), DeckItem::sideboard(2, 3)];
        let mut shuffled = items.clone();
        shuffled.reverse();
        assert!(diff_items(&items, &shuffled).is_empty());
    }

    #[test]
    fn reversed_matches_swapped_arguments() {
        let a = vec![DeckItem::main(1, 4), DeckItem::main(2, 1)];
        let b = vec![DeckItem::main(1, 2), DeckItem::sideboard(3, 2)];
        assert_eq!(diff_items(&a, &b).reversed(), diff_items(&b, &a));
    }
}
