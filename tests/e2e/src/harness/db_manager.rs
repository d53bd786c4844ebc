//! Test Database Manager
//!
//! Provides isolated database instances for testing:
//! - Temporary databases that are automatically cleaned up
//! - Pre-seeded decks with realistic sentence cards
//! - Concurrent test isolation

use retell_core::{Card, CardInput, Deck, ReferenceText, SqliteStore};
use std::path::PathBuf;
use tempfile::TempDir;

/// Sentence prompts with one reference translation each, used for seeding
const SEED_SENTENCES: &[(&str, &str)] = &[
    ("他说得很委婉", "He put it very tactfully."),
    ("这件事不能一概而论", "You can't generalize about this."),
    ("她的话里有话", "There was a hidden meaning in her words."),
    ("我对这个领域一窍不通", "I know nothing about this field."),
    ("事情没有想象中那么简单", "Things aren't as simple as imagined."),
    ("他总是半途而废", "He always gives up halfway."),
    ("这个方案有待改进", "This plan needs improvement."),
    ("你别拐弯抹角了", "Stop beating around the bush."),
];

/// Manager for test databases
///
/// Creates an isolated database instance for each test to prevent
/// interference. The temporary directory is deleted when the manager drops.
///
/// # Example
///
/// ```rust,ignore
/// let db = TestDatabaseManager::new_temp();
/// let (deck, cards) = db.seed_deck("HSK 5", "user-1", 5);
/// ```
pub struct TestDatabaseManager {
    /// The store instance
    pub store: SqliteStore,
    /// Temporary directory (kept alive to prevent premature deletion)
    _temp_dir: Option<TempDir>,
    /// Path to the database file
    db_path: PathBuf,
}

impl TestDatabaseManager {
    /// Create a new test database in a temporary directory
    pub fn new_temp() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test_retell.db");

        let store = SqliteStore::new(Some(db_path.clone())).expect("Failed to create test store");

        Self {
            store,
            _temp_dir: Some(temp_dir),
            db_path,
        }
    }

    /// Get the database path
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Create a deck seeded with `count` sentence cards.
    ///
    /// Card prompts cycle through a fixed pool of realistic sentences, so
    /// counts above the pool size repeat prompts with distinct card ids.
    pub fn seed_deck(&self, title: &str, owner_id: &str, count: usize) -> (Deck, Vec<Card>) {
        let deck = self
            .store
            .create_deck(title, owner_id)
            .expect("Failed to create deck");

        let cards = (0..count)
            .map(|i| {
                let (concept, reference) = SEED_SENTENCES[i % SEED_SENTENCES.len()];
                self.store
                    .add_card(
                        &deck.id,
                        CardInput {
                            concept_text: concept.to_string(),
                            context_hint: Some("neutral".to_string()),
                            reference_texts: vec![
                                ReferenceText::new(reference, "colloquial"),
                            ],
                        },
                    )
                    .expect("Failed to add card")
            })
            .collect();

        (deck, cards)
    }

    /// Recreate the database (useful for testing migrations)
    pub fn recreate(&mut self) {
        let _ = std::fs::remove_file(&self.db_path);
        self.store =
            SqliteStore::new(Some(self.db_path.clone())).expect("Failed to recreate store");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_database_creation() {
        let db = TestDatabaseManager::new_temp();
        assert!(db.path().exists());
    }

    #[test]
    fn test_seed_deck() {
        let db = TestDatabaseManager::new_temp();
        let (deck, cards) = db.seed_deck("seeded", "u1", 10);

        assert_eq!(cards.len(), 10);
        assert_eq!(db.store.deck_cards(&deck.id).unwrap().len(), 10);
        // prompts cycle but ids stay unique
        let mut ids: Vec<_> = cards.iter().map(|c| c.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn test_recreate_resets_data() {
        let mut db = TestDatabaseManager::new_temp();
        db.seed_deck("gone", "u1", 3);
        db.recreate();
        assert!(db.store.list_decks("u1").unwrap().is_empty());
    }
}
