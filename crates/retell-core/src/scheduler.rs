//! Score-to-schedule transform
//!
//! Converts a judge score in [0, 10] plus a card's prior scheduling state into
//! its next state: ease factor, interval in days, learning/review state, and
//! the next due timestamp. The transform is a pure function of its inputs;
//! the caller supplies `now`.
//!
//! Three score bands drive the policy, with asymmetric ease penalties: a fail
//! costs three times the ease a partial does, while a pass earns back only a
//! small bump. Failed material comes back the next day; partially-known
//! material stays on a short 1-3 day leash; passed material grows its
//! interval multiplicatively by the ease factor.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::mastery::{SCORE_FAIL_CEILING, SCORE_PASS_FLOOR};

/// Lower bound on the ease factor
pub const MIN_EASE: f64 = 1.3;

/// Upper bound on the ease factor
pub const MAX_EASE: f64 = 3.0;

/// Ease factor assigned to a card on its first evaluation
pub const INITIAL_EASE: f64 = 2.5;

/// One-year ceiling on review intervals
pub const MAX_INTERVAL_DAYS: i64 = 365;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Scheduling error type
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// The judge broke its contract: scores must lie in [0, 10].
    /// Rejected rather than clamped, since a malformed score means the
    /// evaluation itself cannot be trusted.
    #[error("score {0} outside the judge contract range [0, 10]")]
    InvalidScore(f64),
}

// ============================================================================
// REVIEW STATE
// ============================================================================

/// Persisted scheduling state of a card.
///
/// There is no `New` variant: a card that has never been evaluated has no
/// review record at all. Both states are stable and re-enterable; cards cycle
/// between them indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewState {
    /// Recently failed or still being consolidated; short intervals
    Learning,
    /// Passing; interval grows with the ease factor
    Review,
}

impl ReviewState {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewState::Learning => "learning",
            ReviewState::Review => "review",
        }
    }

    /// Parse from string name
    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "learning" => Some(ReviewState::Learning),
            "review" => Some(ReviewState::Review),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReviewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// TRANSFORM INPUT / OUTPUT
// ============================================================================

/// Prior scheduling state fed into the transform.
///
/// Absence of a prior (a card's first evaluation) is represented by passing
/// `None`, which the transform treats as `{ ease_factor: 2.5, interval: 0 }`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulePrior {
    /// Ease factor before this evaluation
    pub ease_factor: f64,
    /// Interval in days before this evaluation
    pub interval_days: i64,
}

impl Default for SchedulePrior {
    fn default() -> Self {
        Self {
            ease_factor: INITIAL_EASE,
            interval_days: 0,
        }
    }
}

/// Updated scheduling state produced by the transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleUpdate {
    /// New ease factor, clamped to [1.3, 3.0]
    pub ease_factor: f64,
    /// New interval in days, clamped to [0, 365].
    /// Zero is a sentinel for "due tomorrow", not "due now".
    pub interval_days: i64,
    /// New learning/review state
    pub state: ReviewState,
    /// The next due timestamp: `now + max(interval, 1)` days
    pub next_review_at: DateTime<Utc>,
}

// ============================================================================
// SCHEDULER
// ============================================================================

/// Tunable scheduling parameters.
///
/// The score band boundaries themselves are not tunable; they are shared with
/// the mastery classifier (see [`crate::mastery`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerParameters {
    /// Ease adjustment on a failed attempt
    pub fail_ease_delta: f64,
    /// Ease adjustment on a partial attempt
    pub partial_ease_delta: f64,
    /// Ease adjustment on a passing attempt
    pub pass_ease_delta: f64,
    /// Interval multiplier on a partial attempt
    pub partial_interval_factor: f64,
    /// Floor for the shortened partial interval, in days
    pub partial_interval_min: i64,
    /// Ceiling for the shortened partial interval, in days
    pub partial_interval_max: i64,
}

impl Default for SchedulerParameters {
    fn default() -> Self {
        Self {
            fail_ease_delta: -0.3,
            partial_ease_delta: -0.1,
            pass_ease_delta: 0.1,
            partial_interval_factor: 0.5,
            partial_interval_min: 1,
            partial_interval_max: 3,
        }
    }
}

/// The score-to-schedule transform
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    params: SchedulerParameters,
}

impl Scheduler {
    /// Create a scheduler with custom parameters
    pub fn new(params: SchedulerParameters) -> Self {
        Self { params }
    }

    /// Parameters in effect
    pub fn params(&self) -> &SchedulerParameters {
        &self.params
    }

    /// Compute the next scheduling state from a prior state and a judge score.
    ///
    /// Pure: no hidden state, no side effects. `prior = None` means the card
    /// has never been evaluated.
    pub fn next_schedule(
        &self,
        prior: Option<SchedulePrior>,
        score: f64,
        now: DateTime<Utc>,
    ) -> Result<ScheduleUpdate, ScheduleError> {
        if !(0.0..=10.0).contains(&score) {
            return Err(ScheduleError::InvalidScore(score));
        }

        let prior = prior.unwrap_or_default();
        let p = &self.params;

        let (ease_factor, interval_days, state) = if score < SCORE_FAIL_CEILING {
            // Fail: interval reset, forced next-day review
            let ease = clamp_ease(prior.ease_factor + p.fail_ease_delta);
            (ease, 0, ReviewState::Learning)
        } else if score < SCORE_PASS_FLOOR {
            // Partial: keep the card on a short leash
            let ease = clamp_ease(prior.ease_factor + p.partial_ease_delta);
            let shortened = (prior.interval_days as f64 * p.partial_interval_factor).round()
                as i64;
            let interval = shortened.clamp(p.partial_interval_min, p.partial_interval_max);
            (ease, interval, ReviewState::Learning)
        } else {
            // Pass: grow the interval by the new ease factor
            let ease = clamp_ease(prior.ease_factor + p.pass_ease_delta);
            let interval = if prior.interval_days == 0 {
                1
            } else {
                (prior.interval_days as f64 * ease).round() as i64
            };
            (ease, interval, ReviewState::Review)
        };

        let interval_days = interval_days.clamp(0, MAX_INTERVAL_DAYS);
        // An interval of 0 still means "due in 1 day"; scheduling a card for
        // "now" would let it repeat endlessly within the same session.
        let next_review_at = now + Duration::days(interval_days.max(1));

        Ok(ScheduleUpdate {
            ease_factor,
            interval_days,
            state,
            next_review_at,
        })
    }
}

fn clamp_ease(ease: f64) -> f64 {
    ease.clamp(MIN_EASE, MAX_EASE)
}

// ============================================================================
// TESTS
// ============================================================================
