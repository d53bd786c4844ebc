//! Review records and the store boundary
//!
//! A [`ReviewRecord`] is the scheduling state for one (user, card) pair.
//! Exactly zero or one record exists per pair; absence means the card is new.
//! A record is created on the card's first evaluation and thereafter only
//! updated, never recreated.
//!
//! The engine reads and writes records through the [`ReviewStore`] and
//! [`CardSource`] traits. `get` and `put` are separate operations: two
//! concurrent evaluations of the same pair can both read the same prior and
//! race to the write, and the later `put` stands. Each individual `put` must
//! be atomic; nothing beyond that is assumed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::card::Card;
use crate::judge::Evaluation;
use crate::scheduler::{ReviewState, ScheduleUpdate};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Store boundary error type.
///
/// The split between [`Lookup`](StoreError::Lookup) and
/// [`Write`](StoreError::Write) matters: lookup failures are fatal to due-set
/// resolution (a partial due-set silently corrupts review cadence), while a
/// write failure after a successful evaluation is reported but does not
/// discard the evaluation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A read against the backing store failed
    #[error("record lookup failed: {0}")]
    Lookup(String),
    /// A write against the backing store failed
    #[error("scheduling write failed: {0}")]
    Write(String),
    /// Referenced deck or card does not exist
    #[error("not found: {0}")]
    NotFound(String),
}

// ============================================================================
// FEEDBACK
// ============================================================================

/// Judge feedback retained on a record for display.
///
/// Scheduling logic never reads this; it exists so the UI can show the most
/// recent critique next to the card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    /// Free-text critique of the attempt
    pub critique: String,
    /// What separated the attempt from the reference texts
    pub gap_analysis: String,
}

impl From<&Evaluation> for Feedback {
    fn from(eval: &Evaluation) -> Self {
        Self {
            critique: eval.critique.clone(),
            gap_analysis: eval.gap_analysis.clone(),
        }
    }
}

// ============================================================================
// REVIEW RECORD
// ============================================================================

/// Scheduling state for one (user, card) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    /// The reviewing user
    pub user_id: String,
    /// The reviewed card
    pub card_id: String,
    /// Ease factor, in [1.3, 3.0]
    pub ease_factor: f64,
    /// Interval in days, in [0, 365]. Zero means "due tomorrow".
    pub interval_days: i64,
    /// The due timestamp
    pub next_review_at: DateTime<Utc>,
    /// Learning/review state
    pub state: ReviewState,
    /// Most recent judge score, in [0, 10]
    pub last_score: f64,
    /// When the card was last evaluated
    pub last_reviewed_at: DateTime<Utc>,
    /// Most recent submission, retained for display only
    pub last_user_input: String,
    /// Most recent judge feedback, retained for display only
    pub last_feedback: Option<Feedback>,
}

impl ReviewRecord {
    /// Create the record for a card's first evaluation
    pub fn first_evaluation(
        user_id: impl Into<String>,
        card_id: impl Into<String>,
        update: &ScheduleUpdate,
        score: f64,
        user_input: impl Into<String>,
        feedback: Option<Feedback>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            card_id: card_id.into(),
            ease_factor: update.ease_factor,
            interval_days: update.interval_days,
            next_review_at: update.next_review_at,
            state: update.state,
            last_score: score,
            last_reviewed_at: now,
            last_user_input: user_input.into(),
            last_feedback: feedback,
        }
    }

    /// Apply a subsequent evaluation in place.
    ///
    /// Records transition monotonically; they are updated, never recreated.
    pub fn apply(
        &mut self,
        update: &ScheduleUpdate,
        score: f64,
        user_input: impl Into<String>,
        feedback: Option<Feedback>,
        now: DateTime<Utc>,
    ) {
        self.ease_factor = update.ease_factor;
        self.interval_days = update.interval_days;
        self.next_review_at = update.next_review_at;
        self.state = update.state;
        self.last_score = score;
        self.last_reviewed_at = now;
        self.last_user_input = user_input.into();
        self.last_feedback = feedback;
    }

    /// Whether the record's due timestamp has passed
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at <= now
    }
}

// ============================================================================
// STORE TRAITS
// ============================================================================

/// Review-record persistence boundary.
///
/// One record per (user, card) pair; `get` on a never-evaluated card returns
/// `Ok(None)`. Each `put` must be atomic and keyed by the pair, but a
/// read-then-`put` sequence is not: concurrent evaluations of the same pair
/// resolve by last write wins.
pub trait ReviewStore {
    /// Fetch the record for a (user, card) pair, if one exists
    fn get(&self, user_id: &str, card_id: &str) -> Result<Option<ReviewRecord>, StoreError>;

    /// Insert or update the record for the pair named inside `record`
    fn put(&self, record: &ReviewRecord) -> Result<(), StoreError>;
}

/// Card population source for session building
pub trait CardSource {
    /// All cards in a deck
    fn list_cards(&self, deck_id: &str) -> Result<Vec<Card>, StoreError>;

    /// Review records for a user over a card population, keyed by card id.
    /// Cards with no record are simply absent from the map.
    fn list_review_records(
        &self,
        user_id: &str,
        card_ids: &[String],
    ) -> Result<HashMap<String, ReviewRecord>, StoreError>;
}

// ============================================================================
// TESTS
// ============================================================================
