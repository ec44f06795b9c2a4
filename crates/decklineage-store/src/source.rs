//! Live deck contents, as owned by the surrounding application.
//!
//! The permutation store never edits decks. It only asks whether a deck
//! exists and what it contains right now.

use decklineage_kernel::DeckItem;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("deck not found: {0}")]
    DeckNotFound(String),

    /// Deck contents exist but cannot be parsed into line items.
    #[error("malformed deck data: {0}")]
    Malformed(String),

    #[error("deck source unavailable: {0}")]
    Unavailable(String),
}

/// Read access to live decks.
pub trait DeckSource: Send + Sync {
    /// Current contents of a deck, in any order.
    fn read_live_items(&self, deck_id: &str) -> Result<Vec<DeckItem>, SourceError>;

    fn deck_exists(&self, deck_id: &str) -> Result<bool, SourceError>;
}

impl<T: DeckSource + ?Sized> DeckSource for Arc<T> {
    fn read_live_items(&self, deck_id: &str) -> Result<Vec<DeckItem>, SourceError> {
        (**self).read_live_items(deck_id)
    }

    fn deck_exists(&self, deck_id: &str) -> Result<bool, SourceError> {
        (**self).deck_exists(deck_id)
    }
}

impl<T: DeckSource + ?Sized> DeckSource for &T {
    fn read_live_items(&self, deck_id: &str) -> Result<Vec<DeckItem>, SourceError> {
        (**self).read_live_items(deck_id)
    }

    fn deck_exists(&self, deck_id: &str) -> Result<bool, SourceError> {
        (**self).deck_exists(deck_id)
    }
}

/// Deck contents held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryDeckSource {
    decks: RwLock<BTreeMap<String, Vec<DeckItem>>>,
}

impl InMemoryDeckSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a deck's contents, creating the deck if needed.
    pub fn set_deck(&self, deck_id: impl Into<String>, items: Vec<DeckItem>) {
        let mut decks = match self.decks.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        decks.insert(deck_id.into(), items);
    }

    pub fn remove_deck(&self, deck_id: &str) -> Option<Vec<DeckItem>> {
        let mut decks = match self.decks.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        decks.remove(deck_id)
    }
}

impl DeckSource for InMemoryDeckSource {
    fn read_live_items(&self, deck_id: &str) -> Result<Vec<DeckItem>, SourceError> {
        let decks = self
            .decks
            .read()
            .map_err(|_| SourceError::Unavailable("deck map lock poisoned".to_string()))?;
        decks
            .get(deck_id)
            .cloned()
            .ok_or_else(|| SourceError::DeckNotFound(deck_id.to_string()))
    }

    fn deck_exists(&self, deck_id: &str) -> Result<bool, SourceError> {
        let decks = self
            .decks
            .read()
            .map_err(|_| SourceError::Unavailable("deck map lock poisoned".to_string()))?;
        Ok(decks.contains_key(deck_id))
    }
}

/// Deck contents read from a JSON file on every call.
///
/// Layout: `{ "<deck_id>": [ {"card_id": 1, "quantity": 4, "board": "main"} ] }`.
#[derive(Debug, Clone)]
pub struct JsonDeckSource {
    path: PathBuf,
}

impl JsonDeckSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, Vec<DeckItem>>, SourceError> {
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| SourceError::Unavailable(format!("{}: {e}", self.path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| SourceError::Malformed(format!("{}: {e}", self.path.display())))
    }
}

impl DeckSource for JsonDeckSource {
    fn read_live_items(&self, deck_id: &str) -> Result<Vec<DeckItem>, SourceError> {
        self.load()?
            .remove(deck_id)
            .ok_or_else(|| SourceError::DeckNotFound(deck_id.to_string()))
    }

    fn deck_exists(&self, deck_id: &str) -> Result<bool, SourceError> {
        Ok(self.load()?.contains_key(deck_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_decks_path(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "decklineage-decks-{prefix}-{}-{unique}.json",
            std::process::id()
        ))
    }

    #[test]
    fn in_memory_source_reports_missing_decks() {
        let source = InMemoryDeckSource::new();
        source.set_deck("deck-a", vec![DeckItem::main(1, 4)]);

        assert!(source.deck_exists("deck-a").expect("exists"));
        assert!(!source.deck_exists("deck-b").expect("exists"));
        assert!(matches!(
            source.read_live_items("deck-b"),
            Err(SourceError::DeckNotFound(id)) if id == "deck-b"
        ));

        source.remove_deck("deck-a");
        assert!(!source.deck_exists("deck-a").expect("exists"));
    }

    #[test]
    fn json_source_reads_decks_and_flags_malformed_content() {
        let path = temp_decks_path("json");
        std::fs::write(
            &path,
            r#"{"deck-a":[{"card_id":100,"quantity":4,"board":"main"}]}"#,
        )
        .expect("fixture should write");

        let source = JsonDeckSource::new(&path);
        assert_eq!(
            source.read_live_items("deck-a").expect("deck-a"),
            vec![DeckItem::main(100, 4)]
        );

        std::fs::write(&path, r#"{"deck-a":[{"card_id":"x"}]}"#).expect("fixture should write");
        assert!(matches!(
            source.read_live_items("deck-a"),
            Err(SourceError::Malformed(_))
        ));

        let _ = std::fs::remove_file(path);
    }
}
