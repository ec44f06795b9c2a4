//! Per-deck bookkeeping kept alongside permutations.

use serde::{Deserialize, Serialize};

use crate::permutation::PermutationId;

/// The store's view of one deck: its current pointer and the highest
/// version number ever assigned to it.
///
/// `version_high_water` survives permutation deletion, so version numbers
/// are never handed out twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckRecord {
    pub deck_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_permutation_id: Option<PermutationId>,
    #[serde(default)]
    pub version_high_water: u32,
}

impl DeckRecord {
    pub fn new(deck_id: impl Into<String>) -> Self {
        Self {
            deck_id: deck_id.into(),
            current_permutation_id: None,
            version_high_water: 0,
        }
    }
}
