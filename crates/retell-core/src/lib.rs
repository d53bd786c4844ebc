//! # Retell Core
//!
//! Scheduling engine for sentence-translation flashcard practice. A learner
//! works through decks of cards, each a source-language prompt with
//! style-tagged reference translations. An external judge scores each attempt
//! on a 0-10 scale; this crate turns those scores into review scheduling:
//!
//! - **Scheduler**: score-banded ease/interval transform with a capped
//!   exponential interval growth and a one-year ceiling
//! - **Mastery**: red/yellow/green classification of a card from its most
//!   recent score, derived at read time and never persisted
//! - **Sessions**: due-set resolution, unbiased shuffling, and due/new
//!   interleaving under a session card limit
//! - **Orchestration**: judge -> transform -> store for one attempt, with
//!   store failures after a successful judge call reported rather than fatal
//! - **Storage**: SQLite-backed decks, cards, and review records behind the
//!   engine's store traits
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use retell_core::{CardInput, EvaluationOrchestrator, SqliteStore};
//!
//! let store = SqliteStore::new(None)?;
//! let deck = store.create_deck("HSK 5 sentences", "user-1")?;
//! let card = store.add_card(&deck.id, CardInput {
//!     concept_text: "他说得很委婉".to_string(),
//!     ..Default::default()
//! })?;
//!
//! // `judge` is any JudgeOracle implementation
//! let orchestrator = EvaluationOrchestrator::new(&store, &judge);
//! let outcome = orchestrator.evaluate("user-1", &card, "He put it tactfully.", Utc::now())?;
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod card;
pub mod judge;
pub mod mastery;
pub mod orchestrator;
pub mod review;
pub mod scheduler;
pub mod session;
pub mod storage;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Deck and card types
pub use card::{Card, CardInput, Deck, ReferenceText};

// Judge boundary
pub use judge::{Evaluation, JudgeError, JudgeOracle, Judgment};

// Mastery classification
pub use mastery::{MasteryLevel, SCORE_FAIL_CEILING, SCORE_PASS_FLOOR};

// Scheduling transform
pub use scheduler::{
    ReviewState, ScheduleError, SchedulePrior, ScheduleUpdate, Scheduler, SchedulerParameters,
    INITIAL_EASE, MAX_EASE, MAX_INTERVAL_DAYS, MIN_EASE,
};

// Review records and store traits
pub use review::{CardSource, Feedback, ReviewRecord, ReviewStore, StoreError};

// Session building
pub use session::{
    resolve_due_sets, resolve_mastery_bucket, shuffle, DueSets, GradedCard, SessionComposer,
    SessionConfig, SessionStats,
};

// Evaluation orchestration
pub use orchestrator::{
    EvaluateError, EvaluationOrchestrator, EvaluationOutcome, ScheduleOutcome,
};

// Storage layer
pub use storage::{DeckStats, SqliteStore, StorageError};
