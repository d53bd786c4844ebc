//! Due-set resolution and session composition
//!
//! Building a practice session happens in two steps. First the card
//! population is partitioned against the user's review records into due /
//! new / not-due sets ([`resolve_due_sets`]). Then the [`SessionComposer`]
//! turns the due and new sets into a single presentation order: both streams
//! are shuffled independently and merged with a fixed-period insertion rule
//! that reserves every Nth slot for a new card.
//!
//! Once cards are selected for a session their presentation order is
//! randomized; due-date ordering only decides *which* cards get in, not the
//! order they appear.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::card::Card;
use crate::mastery::MasteryLevel;
use crate::review::{CardSource, ReviewRecord, StoreError};

/// Default session size for mixed review sessions
pub const DEFAULT_REVIEW_LIMIT: usize = 20;

/// Default session size for whole-deck shuffle mode
pub const DEFAULT_WHOLE_DECK_LIMIT: usize = 1000;

/// Default interleave period: every 4th slot goes to a new card
pub const DEFAULT_NEW_CARD_PERIOD: usize = 4;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Session composition tunables.
///
/// The interleave period was never settled empirically, so it is
/// configuration rather than a constant baked into the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Maximum number of cards in the composed session
    pub limit: usize,
    /// Every `new_card_period`-th slot is reserved for a new card while new
    /// cards remain. Values below 1 are treated as 1.
    pub new_card_period: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_REVIEW_LIMIT,
            new_card_period: DEFAULT_NEW_CARD_PERIOD,
        }
    }
}

impl SessionConfig {
    /// Configuration for whole-deck shuffle mode
    pub fn whole_deck() -> Self {
        Self {
            limit: DEFAULT_WHOLE_DECK_LIMIT,
            ..Self::default()
        }
    }

    /// Override the session size cap
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

// ============================================================================
// SHUFFLE ENGINE
// ============================================================================

/// Uniform random permutation (Fisher-Yates) over an injected RNG.
///
/// Returns a new vector; the input is not mutated. Production callers pass a
/// cheap non-cryptographic RNG, tests pass a seeded one.
pub fn shuffle<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut out = items.to_vec();
    for i in (1..out.len()).rev() {
        let j = rng.random_range(0..=i);
        out.swap(i, j);
    }
    out
}

// ============================================================================
// DUE-SET RESOLUTION
// ============================================================================

/// A card population partitioned against one user's review records
#[derive(Debug, Clone, Default)]
pub struct DueSets {
    /// Cards whose due timestamp has passed, oldest overdue first
    pub due: Vec<(Card, ReviewRecord)>,
    /// Cards never evaluated by this user
    pub new: Vec<Card>,
    /// Cards with a record whose due timestamp is still in the future.
    /// Excluded from session composition in the default flow.
    pub not_due: Vec<(Card, ReviewRecord)>,
}

/// Partition a card population into due / new / not-due sets for a user.
///
/// Read-only. A record-lookup failure fails the whole resolve: silently
/// treating an unreadable card as new would corrupt its scheduling.
pub fn resolve_due_sets<S: CardSource>(
    source: &S,
    user_id: &str,
    cards: Vec<Card>,
    now: DateTime<Utc>,
) -> Result<DueSets, StoreError> {
    let card_ids: Vec<String> = cards.iter().map(|c| c.id.clone()).collect();
    let mut records = source.list_review_records(user_id, &card_ids)?;

    let mut sets = DueSets::default();
    for card in cards {
        match records.remove(&card.id) {
            None => sets.new.push(card),
            Some(record) if record.is_due(now) => sets.due.push((card, record)),
            Some(record) => sets.not_due.push((card, record)),
        }
    }
    // Most overdue first: surfacing the oldest material minimizes total
    // forgetting risk
    sets.due.sort_by_key(|(_, record)| record.next_review_at);

    debug!(
        user_id,
        due = sets.due.len(),
        new = sets.new.len(),
        not_due = sets.not_due.len(),
        "resolved due sets"
    );
    Ok(sets)
}

/// Cards in one mastery bucket, for bucket-targeted practice.
///
/// For the `New` bucket this returns cards with no record, in population
/// order. For the scored buckets it returns reviewed cards whose last score
/// classifies into the bucket, oldest-practiced first.
pub fn resolve_mastery_bucket<S: CardSource>(
    source: &S,
    user_id: &str,
    cards: Vec<Card>,
    bucket: MasteryLevel,
) -> Result<Vec<GradedCard>, StoreError> {
    let card_ids: Vec<String> = cards.iter().map(|c| c.id.clone()).collect();
    let mut records = source.list_review_records(user_id, &card_ids)?;

    let mut selected = Vec::new();
    for card in cards {
        let record = records.remove(&card.id);
        let mastery = MasteryLevel::classify(record.as_ref().map(|r| r.last_score));
        if mastery == bucket {
            selected.push(GradedCard::annotate(card, record.as_ref()));
        }
    }
    selected.sort_by_key(|g| g.last_reviewed_at);
    Ok(selected)
}

// ============================================================================
// GRADED CARDS AND STATS
// ============================================================================

/// A card annotated with its derived mastery state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedCard {
    /// The card itself
    pub card: Card,
    /// Derived mastery bucket (never persisted)
    pub mastery: MasteryLevel,
    /// Most recent judge score, if any
    pub last_score: Option<f64>,
    /// Due timestamp, if a record exists
    pub next_review_at: Option<DateTime<Utc>>,
    /// Last evaluation timestamp, if a record exists
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl GradedCard {
    fn annotate(card: Card, record: Option<&ReviewRecord>) -> Self {
        Self {
            card,
            mastery: MasteryLevel::classify(record.map(|r| r.last_score)),
            last_score: record.map(|r| r.last_score),
            next_review_at: record.map(|r| r.next_review_at),
            last_reviewed_at: record.map(|r| r.last_reviewed_at),
        }
    }
}

/// Summary counts for a composed whole-deck session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// Cards in the population
    pub total: usize,
    /// Cards whose due timestamp has passed
    pub due: usize,
    /// Cards never evaluated
    pub new: usize,
    /// Cards actually returned after the limit
    pub returned: usize,
}

// ============================================================================
// SESSION COMPOSER
// ============================================================================

/// Builds the final presentation order for a session
#[derive(Debug, Clone, Default)]
pub struct SessionComposer {
    config: SessionConfig,
}

impl SessionComposer {
    /// Create a composer with the given configuration
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Configuration in effect
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Compose a session from due and new cards.
    ///
    /// Both streams are shuffled independently, then merged: every
    /// `new_card_period`-th output slot pulls from the new stream while it
    /// lasts, every other slot pulls from the due stream, and whichever
    /// stream survives drains into the remaining slots. The merge runs at
    /// full size and is truncated to the limit afterwards, so a small limit
    /// may under-represent new cards when the due stream dominates the early
    /// slots. That is accepted behavior.
    ///
    /// The output is always a duplicate-free subset of the inputs with length
    /// `min(limit, |due| + |new|)`.
    pub fn compose<R: Rng + ?Sized>(
        &self,
        due: Vec<Card>,
        new: Vec<Card>,
        rng: &mut R,
    ) -> Vec<Card> {
        let (due_count, new_count) = (due.len(), new.len());
        let mut merged = if new.is_empty() {
            shuffle(&due, rng)
        } else if due.is_empty() {
            shuffle(&new, rng)
        } else {
            let mut due_stream = shuffle(&due, rng).into_iter();
            let mut new_stream = shuffle(&new, rng).into_iter();
            let period = self.config.new_card_period.max(1);
            let mut merged = Vec::with_capacity(due_count + new_count);
            for position in 0..due_count + new_count {
                let new_slot = (position + 1) % period == 0;
                let next = if new_slot {
                    new_stream.next().or_else(|| due_stream.next())
                } else {
                    due_stream.next().or_else(|| new_stream.next())
                };
                match next {
                    Some(card) => merged.push(card),
                    None => break,
                }
            }
            merged
        };
        merged.truncate(self.config.limit);

        debug!(
            due = due_count,
            new = new_count,
            returned = merged.len(),
            limit = self.config.limit,
            "composed session"
        );
        merged
    }

    /// Whole-deck shuffle mode: every card, annotated with its mastery state,
    /// in uniform random order, truncated to the (large) whole-deck limit.
    pub fn compose_whole_deck<R: Rng + ?Sized>(
        &self,
        cards: Vec<Card>,
        records: &HashMap<String, ReviewRecord>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> (Vec<GradedCard>, SessionStats) {
        let graded: Vec<GradedCard> = cards
            .into_iter()
            .map(|card| {
                let record = records.get(&card.id);
                GradedCard::annotate(card, record)
            })
            .collect();

        let total = graded.len();
        let due = graded
            .iter()
            .filter(|g| g.next_review_at.is_some_and(|t| t <= now))
            .count();
        let new = graded.iter().filter(|g| g.last_score.is_none()).count();

        let mut shuffled = shuffle(&graded, rng);
        shuffled.truncate(self.config.limit);
        let stats = SessionStats {
            total,
            due,
            new,
            returned: shuffled.len(),
        };
        (shuffled, stats)
    }
}

// ============================================================================
// TESTS
// ============================================================================
