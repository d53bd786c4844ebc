//! Card and deck value types
//!
//! A [`Card`] is an immutable practice unit: a source-language concept prompt
//! plus style-tagged reference translations a judge compares attempts against.
//! Cards belong to a [`Deck`] and are deleted with it (or explicitly removed
//! or transferred).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// REFERENCE TEXTS
// ============================================================================

/// A natural-language reference translation with a style tag
/// (e.g. "formal", "colloquial", "written").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceText {
    /// The reference translation itself
    pub text: String,
    /// Style label shown alongside the text
    pub style_tag: String,
}

impl ReferenceText {
    /// Create a reference text with a style tag
    pub fn new(text: impl Into<String>, style_tag: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style_tag: style_tag.into(),
        }
    }
}

// ============================================================================
// CARD
// ============================================================================

/// An immutable practice unit owned by a deck
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Owning deck
    pub deck_id: String,
    /// Source-language prompt the user translates
    pub concept_text: String,
    /// Optional short label giving usage context
    pub context_hint: Option<String>,
    /// Ordered reference translations, each style-tagged
    pub reference_texts: Vec<ReferenceText>,
    /// When the card was created
    pub created_at: DateTime<Utc>,
}

impl Card {
    /// Create a new card in the given deck
    pub fn new(deck_id: impl Into<String>, input: CardInput) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            deck_id: deck_id.into(),
            concept_text: input.concept_text,
            context_hint: input.context_hint,
            reference_texts: input.reference_texts,
            created_at: Utc::now(),
        }
    }
}

/// Input for creating a new card
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInput {
    /// Source-language prompt
    pub concept_text: String,
    /// Optional usage-context label
    #[serde(default)]
    pub context_hint: Option<String>,
    /// Reference translations
    #[serde(default)]
    pub reference_texts: Vec<ReferenceText>,
}

// ============================================================================
// DECK
// ============================================================================

/// A named collection of cards
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Display title
    pub title: String,
    /// Owning user
    pub owner_id: String,
    /// When the deck was created
    pub created_at: DateTime<Utc>,
}

impl Deck {
    /// Create a new, empty deck for a user
    pub fn new(title: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            owner_id: owner_id.into(),
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
