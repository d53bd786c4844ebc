//! SQLite Storage Implementation
//!
//! Deck, card, and review persistence behind the engine's store traits.
//!
//! Uses separate reader/writer connections for interior mutability. All
//! methods take `&self` (not `&mut self`), making [`SqliteStore`]
//! `Send + Sync` so callers can share it as `Arc<SqliteStore>`.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::card::{Card, CardInput, Deck, ReferenceText};
use crate::mastery::MasteryLevel;
use crate::review::{CardSource, Feedback, ReviewRecord, ReviewStore, StoreError};
use crate::scheduler::ReviewState;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Storage error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Deck or card not found
    #[error("Not found: {0}")]
    NotFound(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

// ============================================================================
// DECK STATS
// ============================================================================

/// Per-deck mastery breakdown for one user
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckStats {
    /// Cards in the deck
    pub total_cards: usize,
    /// Cards never evaluated by this user
    pub new: usize,
    /// Cards whose last score fell in the fail band
    pub red: usize,
    /// Cards whose last score fell in the partial band
    pub yellow: usize,
    /// Cards whose last score fell in the pass band
    pub green: usize,
}

// ============================================================================
// STORE
// ============================================================================

/// SQLite-backed deck, card, and review store
pub struct SqliteStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

impl SqliteStore {
    /// Apply PRAGMAs to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        Ok(())
    }

    /// Create a new store instance
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => {
                let proj_dirs = ProjectDirs::from("com", "retell", "core").ok_or_else(|| {
                    StorageError::Init("Could not determine project directories".to_string())
                })?;

                let data_dir = proj_dirs.data_dir();
                std::fs::create_dir_all(data_dir)?;
                // Restrict directory permissions to owner-only on Unix
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let perms = std::fs::Permissions::from_mode(0o700);
                    let _ = std::fs::set_permissions(data_dir, perms);
                }
                data_dir.join("retell.db")
            }
        };

        let writer_conn = Connection::open(&path)?;

        // Restrict database file permissions to owner-only on Unix
        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        Self::configure_connection(&writer_conn)?;

        // Apply migrations on writer only
        super::migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
        })
    }

    // ========================================================================
    // DECKS
    // ========================================================================

    /// Create a new, empty deck
    pub fn create_deck(&self, title: &str, owner_id: &str) -> Result<Deck> {
        let deck = Deck::new(title, owner_id);
        let writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        writer.execute(
            "INSERT INTO decks (id, title, owner_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                deck.id,
                deck.title,
                deck.owner_id,
                deck.created_at.to_rfc3339()
            ],
        )?;
        Ok(deck)
    }

    /// Get a deck by ID
    pub fn get_deck(&self, id: &str) -> Result<Option<Deck>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let mut stmt =
            reader.prepare("SELECT id, title, owner_id, created_at FROM decks WHERE id = ?1")?;
        let deck = stmt
            .query_row(params![id], |row| Self::row_to_deck(row))
            .optional()?;
        Ok(deck)
    }

    /// List a user's decks, newest first
    pub fn list_decks(&self, owner_id: &str) -> Result<Vec<Deck>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(
            "SELECT id, title, owner_id, created_at FROM decks
             WHERE owner_id = ?1 ORDER BY created_at DESC",
        )?;
        let decks = stmt.query_map(params![owner_id], |row| Self::row_to_deck(row))?;
        Ok(decks.filter_map(|d| d.ok()).collect())
    }

    /// Rename a deck
    pub fn rename_deck(&self, id: &str, title: &str) -> Result<()> {
        let writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        let changed = writer.execute("UPDATE decks SET title = ?2 WHERE id = ?1", params![id, title])?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("deck {id}")));
        }
        Ok(())
    }

    /// Delete a deck and, via cascade, its cards and their review records
    pub fn delete_deck(&self, id: &str) -> Result<()> {
        let writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        let changed = writer.execute("DELETE FROM decks WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("deck {id}")));
        }
        tracing::info!(deck_id = id, "deck deleted");
        Ok(())
    }

    /// Move every card from `source_id` into `target_id`, then delete the
    /// now-empty source deck. Review records follow their cards untouched.
    /// Returns the number of cards moved.
    pub fn merge_decks(&self, source_id: &str, target_id: &str) -> Result<usize> {
        if self.get_deck(target_id)?.is_none() {
            return Err(StorageError::NotFound(format!("deck {target_id}")));
        }

        let writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        let moved = writer.execute(
            "UPDATE cards SET deck_id = ?2 WHERE deck_id = ?1",
            params![source_id, target_id],
        )?;
        let deleted = writer.execute("DELETE FROM decks WHERE id = ?1", params![source_id])?;
        if deleted == 0 {
            return Err(StorageError::NotFound(format!("deck {source_id}")));
        }
        tracing::info!(source_id, target_id, moved, "decks merged");
        Ok(moved)
    }

    // ========================================================================
    // CARDS
    // ========================================================================

    /// Add a card to a deck
    pub fn add_card(&self, deck_id: &str, input: CardInput) -> Result<Card> {
        if self.get_deck(deck_id)?.is_none() {
            return Err(StorageError::NotFound(format!("deck {deck_id}")));
        }

        let card = Card::new(deck_id, input);
        let reference_json = serde_json::to_string(&card.reference_texts)
            .unwrap_or_else(|_| "[]".to_string());

        let writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        writer.execute(
            "INSERT INTO cards (id, deck_id, concept_text, context_hint, reference_texts, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                card.id,
                card.deck_id,
                card.concept_text,
                card.context_hint,
                reference_json,
                card.created_at.to_rfc3339()
            ],
        )?;
        Ok(card)
    }

    /// Get a card by ID
    pub fn get_card(&self, id: &str) -> Result<Option<Card>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(
            "SELECT id, deck_id, concept_text, context_hint, reference_texts, created_at
             FROM cards WHERE id = ?1",
        )?;
        let card = stmt
            .query_row(params![id], |row| Self::row_to_card(row))
            .optional()?;
        Ok(card)
    }

    /// Delete a card and, via cascade, its review records
    pub fn delete_card(&self, id: &str) -> Result<()> {
        let writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        let changed = writer.execute("DELETE FROM cards WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("card {id}")));
        }
        Ok(())
    }

    /// Move a single card into another deck. The card's review records stay
    /// attached; scheduling state is deck-independent.
    pub fn transfer_card(&self, card_id: &str, target_deck_id: &str) -> Result<()> {
        if self.get_deck(target_deck_id)?.is_none() {
            return Err(StorageError::NotFound(format!("deck {target_deck_id}")));
        }

        let writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        let changed = writer.execute(
            "UPDATE cards SET deck_id = ?2 WHERE id = ?1",
            params![card_id, target_deck_id],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("card {card_id}")));
        }
        tracing::info!(card_id, target_deck_id, "card transferred");
        Ok(())
    }

    /// All cards in a deck, in creation order
    pub fn deck_cards(&self, deck_id: &str) -> Result<Vec<Card>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(
            "SELECT id, deck_id, concept_text, context_hint, reference_texts, created_at
             FROM cards WHERE deck_id = ?1 ORDER BY created_at ASC",
        )?;
        let cards = stmt.query_map(params![deck_id], |row| Self::row_to_card(row))?;
        Ok(cards.filter_map(|c| c.ok()).collect())
    }

    // ========================================================================
    // REVIEWS
    // ========================================================================

    /// Fetch one user's review record for a card
    pub fn review_record(&self, user_id: &str, card_id: &str) -> Result<Option<ReviewRecord>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(
            "SELECT user_id, card_id, ease_factor, interval_days, next_review_at, state,
                    last_score, last_reviewed_at, last_user_input, last_feedback
             FROM reviews WHERE user_id = ?1 AND card_id = ?2",
        )?;
        let record = stmt
            .query_row(params![user_id, card_id], |row| Self::row_to_record(row))
            .optional()?;
        Ok(record)
    }

    /// Insert or update a review record. The (user, card) pair is the key.
    pub fn upsert_review(&self, record: &ReviewRecord) -> Result<()> {
        let feedback_json = record
            .last_feedback
            .as_ref()
            .and_then(|f| serde_json::to_string(f).ok());

        let writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        writer.execute(
            "INSERT INTO reviews (user_id, card_id, ease_factor, interval_days, next_review_at,
                                  state, last_score, last_reviewed_at, last_user_input, last_feedback)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(user_id, card_id) DO UPDATE SET
                 ease_factor = excluded.ease_factor,
                 interval_days = excluded.interval_days,
                 next_review_at = excluded.next_review_at,
                 state = excluded.state,
                 last_score = excluded.last_score,
                 last_reviewed_at = excluded.last_reviewed_at,
                 last_user_input = excluded.last_user_input,
                 last_feedback = excluded.last_feedback",
            params![
                record.user_id,
                record.card_id,
                record.ease_factor,
                record.interval_days,
                record.next_review_at.to_rfc3339(),
                record.state.as_str(),
                record.last_score,
                record.last_reviewed_at.to_rfc3339(),
                record.last_user_input,
                feedback_json
            ],
        )?;
        Ok(())
    }

    /// Mastery breakdown of a deck for one user
    pub fn deck_stats(&self, user_id: &str, deck_id: &str) -> Result<DeckStats> {
        if self.get_deck(deck_id)?.is_none() {
            return Err(StorageError::NotFound(format!("deck {deck_id}")));
        }

        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(
            "SELECT r.last_score FROM cards c
             LEFT JOIN reviews r ON r.card_id = c.id AND r.user_id = ?2
             WHERE c.deck_id = ?1",
        )?;
        let scores = stmt.query_map(params![deck_id, user_id], |row| {
            row.get::<_, Option<f64>>(0)
        })?;

        let mut stats = DeckStats::default();
        for score in scores.filter_map(|s| s.ok()) {
            stats.total_cards += 1;
            match MasteryLevel::classify(score) {
                MasteryLevel::New => stats.new += 1,
                MasteryLevel::Red => stats.red += 1,
                MasteryLevel::Yellow => stats.yellow += 1,
                MasteryLevel::Green => stats.green += 1,
            }
        }
        Ok(stats)
    }

    /// Mastery breakdown across every deck a user owns
    pub fn user_stats(&self, user_id: &str) -> Result<DeckStats> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(
            "SELECT r.last_score FROM cards c
             JOIN decks d ON d.id = c.deck_id
             LEFT JOIN reviews r ON r.card_id = c.id AND r.user_id = ?1
             WHERE d.owner_id = ?1",
        )?;
        let scores = stmt.query_map(params![user_id], |row| row.get::<_, Option<f64>>(0))?;

        let mut stats = DeckStats::default();
        for score in scores.filter_map(|s| s.ok()) {
            stats.total_cards += 1;
            match MasteryLevel::classify(score) {
                MasteryLevel::New => stats.new += 1,
                MasteryLevel::Red => stats.red += 1,
                MasteryLevel::Yellow => stats.yellow += 1,
                MasteryLevel::Green => stats.green += 1,
            }
        }
        Ok(stats)
    }

    // ========================================================================
    // ROW MAPPING
    // ========================================================================

    /// Parse RFC3339 timestamp
    fn parse_timestamp(value: &str, field_name: &str) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("Invalid {} timestamp '{}': {}", field_name, value, e),
                    )),
                )
            })
    }

    fn row_to_deck(row: &rusqlite::Row) -> rusqlite::Result<Deck> {
        let created_at: String = row.get("created_at")?;
        Ok(Deck {
            id: row.get("id")?,
            title: row.get("title")?,
            owner_id: row.get("owner_id")?,
            created_at: Self::parse_timestamp(&created_at, "created_at")?,
        })
    }

    fn row_to_card(row: &rusqlite::Row) -> rusqlite::Result<Card> {
        let reference_json: String = row.get("reference_texts")?;
        let reference_texts: Vec<ReferenceText> =
            serde_json::from_str(&reference_json).unwrap_or_default();
        let created_at: String = row.get("created_at")?;

        Ok(Card {
            id: row.get("id")?,
            deck_id: row.get("deck_id")?,
            concept_text: row.get("concept_text")?,
            context_hint: row.get("context_hint")?,
            reference_texts,
            created_at: Self::parse_timestamp(&created_at, "created_at")?,
        })
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<ReviewRecord> {
        let next_review_at: String = row.get("next_review_at")?;
        let last_reviewed_at: String = row.get("last_reviewed_at")?;
        let state: String = row.get("state")?;
        let feedback_json: Option<String> = row.get("last_feedback")?;
        let last_feedback: Option<Feedback> =
            feedback_json.and_then(|s| serde_json::from_str(&s).ok());

        Ok(ReviewRecord {
            user_id: row.get("user_id")?,
            card_id: row.get("card_id")?,
            ease_factor: row.get("ease_factor")?,
            interval_days: row.get("interval_days")?,
            next_review_at: Self::parse_timestamp(&next_review_at, "next_review_at")?,
            state: ReviewState::parse_name(&state).unwrap_or(ReviewState::Learning),
            last_score: row.get("last_score")?,
            last_reviewed_at: Self::parse_timestamp(&last_reviewed_at, "last_reviewed_at")?,
            last_user_input: row.get("last_user_input")?,
            last_feedback,
        })
    }
}

// ============================================================================
// ENGINE TRAIT IMPLEMENTATIONS
// ============================================================================

impl ReviewStore for SqliteStore {
    fn get(&self, user_id: &str, card_id: &str) -> std::result::Result<Option<ReviewRecord>, StoreError> {
        self.review_record(user_id, card_id)
            .map_err(|e| StoreError::Lookup(e.to_string()))
    }

    fn put(&self, record: &ReviewRecord) -> std::result::Result<(), StoreError> {
        self.upsert_review(record)
            .map_err(|e| StoreError::Write(e.to_string()))
    }
}

impl CardSource for SqliteStore {
    fn list_cards(&self, deck_id: &str) -> std::result::Result<Vec<Card>, StoreError> {
        match self.get_deck(deck_id) {
            Ok(Some(_)) => {}
            Ok(None) => return Err(StoreError::NotFound(format!("deck {deck_id}"))),
            Err(e) => return Err(StoreError::Lookup(e.to_string())),
        }
        self.deck_cards(deck_id)
            .map_err(|e| StoreError::Lookup(e.to_string()))
    }

    fn list_review_records(
        &self,
        user_id: &str,
        card_ids: &[String],
    ) -> std::result::Result<HashMap<String, ReviewRecord>, StoreError> {
        if card_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let reader = self
            .reader
            .lock()
            .map_err(|_| StoreError::Lookup("Reader lock poisoned".into()))?;

        let placeholders: Vec<String> = (0..card_ids.len()).map(|i| format!("?{}", i + 2)).collect();
        let sql = format!(
            "SELECT user_id, card_id, ease_factor, interval_days, next_review_at, state,
                    last_score, last_reviewed_at, last_user_input, last_feedback
             FROM reviews WHERE user_id = ?1 AND card_id IN ({})",
            placeholders.join(", ")
        );
        let mut stmt = reader
            .prepare(&sql)
            .map_err(|e| StoreError::Lookup(e.to_string()))?;

        let mut params_refs: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(card_ids.len() + 1);
        params_refs.push(&user_id);
        for id in card_ids {
            params_refs.push(id);
        }

        let records = stmt
            .query_map(params_refs.as_slice(), |row| Self::row_to_record(row))
            .map_err(|e| StoreError::Lookup(e.to_string()))?;

        let mut map = HashMap::new();
        for record in records {
            let record = record.map_err(|e| StoreError::Lookup(e.to_string()))?;
            map.insert(record.card_id.clone(), record);
        }
        Ok(map)
    }
}

// ============================================================================
// TESTS
// ============================================================================
