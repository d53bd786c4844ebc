//! Storage Module
//!
//! SQLite-based persistence for decks, cards, and review records:
//! - versioned schema migrations
//! - reader/writer connection split behind `&self` methods
//! - [`crate::review::ReviewStore`] and [`crate::review::CardSource`]
//!   implementations for the scheduling engine

mod migrations;
mod sqlite;

pub use migrations::MIGRATIONS;
pub use sqlite::{DeckStats, Result, SqliteStore, StorageError};
