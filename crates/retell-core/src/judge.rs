//! Judge oracle boundary
//!
//! The judge is an external scoring service (in production, an LLM behind an
//! HTTP call) that grades a user's translation attempt against a card's
//! reference texts. The engine only sees this trait: a sentence and the
//! card's prompt go in, a scored [`Evaluation`] comes out, or the call fails
//! with [`JudgeError`].
//!
//! Timeouts and retries are the oracle implementation's concern. The engine
//! never retries; a failure here surfaces directly to the caller.

use serde::{Deserialize, Serialize};

use crate::card::ReferenceText;

/// Judge error type
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    /// The scoring oracle failed or timed out. Fatal to the evaluate call.
    #[error("judge unavailable: {0}")]
    Unavailable(String),
    /// The oracle returned a malformed response
    #[error("judge returned a malformed response: {0}")]
    Malformed(String),
}

/// Qualitative verdict on an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Judgment {
    /// Accurate and natural
    Pass,
    /// Understandable but needs work
    Review,
    /// Inaccurate or off-concept
    Fail,
}

impl std::fmt::Display for Judgment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Judgment::Pass => write!(f, "PASS"),
            Judgment::Review => write!(f, "REVIEW"),
            Judgment::Fail => write!(f, "FAIL"),
        }
    }
}

/// A completed judge evaluation of one attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    /// Qualitative verdict
    pub status: Judgment,
    /// Numeric score in [0, 10]
    pub score: f64,
    /// Free-text critique of the attempt
    pub critique: String,
    /// What separates the attempt from the reference texts
    pub gap_analysis: String,
}

/// The external scoring oracle.
///
/// Implementations wrap whatever actually does the grading; tests use a
/// scripted implementation.
pub trait JudgeOracle {
    /// Grade a user sentence against a card's reference texts and concept
    /// prompt
    fn judge(
        &self,
        user_sentence: &str,
        reference_texts: &[ReferenceText],
        concept_prompt: &str,
    ) -> Result<Evaluation, JudgeError>;
}

// ============================================================================
// TESTS
// ============================================================================
