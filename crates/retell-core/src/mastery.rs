//! Mastery classification
//!
//! A card's mastery level is derived from its most recent judge score at read
//! time. It is never persisted: caching it next to the card would let it
//! drift from the review record it summarizes.
//!
//! The two band boundaries here are the same ones the scheduler uses to pick
//! its score band, so classification and scheduling can never disagree about
//! what counts as a failed or a passed attempt.

use serde::{Deserialize, Serialize};

/// Scores below this are a failed attempt (red bucket, interval reset)
pub const SCORE_FAIL_CEILING: f64 = 5.0;

/// Scores at or above this are a passing attempt (green bucket, interval growth)
pub const SCORE_PASS_FLOOR: f64 = 8.0;

/// Derived mastery bucket for a card, from the last judge score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MasteryLevel {
    /// Never evaluated (no review record exists)
    New,
    /// Critical: last score below 5
    Red,
    /// Refining: last score in [5, 8)
    Yellow,
    /// Mastered: last score of 8 or above
    Green,
}

impl MasteryLevel {
    /// Classify a last score (or its absence) into a bucket.
    ///
    /// Total function: every input maps to exactly one bucket.
    pub fn classify(last_score: Option<f64>) -> Self {
        match last_score {
            None => MasteryLevel::New,
            Some(s) if s < SCORE_FAIL_CEILING => MasteryLevel::Red,
            Some(s) if s < SCORE_PASS_FLOOR => MasteryLevel::Yellow,
            Some(_) => MasteryLevel::Green,
        }
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MasteryLevel::New => "new",
            MasteryLevel::Red => "red",
            MasteryLevel::Yellow => "yellow",
            MasteryLevel::Green => "green",
        }
    }

    /// Parse from string name
    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "new" => Some(MasteryLevel::New),
            "red" | "critical" => Some(MasteryLevel::Red),
            "yellow" | "refining" => Some(MasteryLevel::Yellow),
            "green" | "mastered" => Some(MasteryLevel::Green),
            _ => None,
        }
    }
}

impl std::fmt::Display for MasteryLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// TESTS
// ============================================================================
