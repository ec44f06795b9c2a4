//! Error types for line-item intake.

/// A deck item list that cannot be recorded as a permutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ItemError {
    /// Absent cards are represented by omission, never by a zero line.
    #[error("card {card_id} on board {board:?} has quantity 0")]
    ZeroQuantity { card_id: i64, board: String },

    #[error("card {card_id} has an empty board name")]
    EmptyBoard { card_id: i64 },

    /// The board name collides with the canonical hash separators.
    #[error("card {card_id} board {board:?} contains a reserved character (':' or '|')")]
    ReservedCharacter { card_id: i64, board: String },

    #[error("card {card_id} appears more than once on board {board:?}")]
    DuplicateLine { card_id: i64, board: String },
}
