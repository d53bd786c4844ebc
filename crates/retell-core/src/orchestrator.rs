//! Evaluation orchestration
//!
//! Glues one attempt together: call the judge, transform the score into new
//! scheduling state, write the review record back. The failure policy is
//! deliberately asymmetric:
//!
//! - A judge failure is fatal. There is nothing to show the user and nothing
//!   to reschedule.
//! - A store failure *after* a successful judge call is not. The evaluation
//!   is the thing the user is waiting for; the schedule write is a side
//!   effect. The outcome carries the full evaluation plus a tag saying the
//!   reschedule did not land, and the failure is logged.
//!
//! The two boundary calls are strictly sequential: the store update depends
//! on the judge's score, so they must never be issued concurrently.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::card::Card;
use crate::judge::{Evaluation, JudgeError, JudgeOracle};
use crate::review::{Feedback, ReviewRecord, ReviewStore, StoreError};
use crate::scheduler::{ScheduleError, SchedulePrior, Scheduler};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Errors that abort an evaluate call outright
#[derive(Debug, thiserror::Error)]
pub enum EvaluateError {
    /// The judge failed; no partial result exists
    #[error(transparent)]
    Judge(#[from] JudgeError),
    /// The judge returned a score outside its contract; the evaluation
    /// cannot be trusted to reschedule anything
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

// ============================================================================
// OUTCOME
// ============================================================================

/// What happened to the review record after a successful judge call
#[derive(Debug)]
pub enum ScheduleOutcome {
    /// The record was written. `created` distinguishes a first evaluation
    /// from an update.
    Applied {
        /// The record as written
        record: ReviewRecord,
        /// True when this was the card's first evaluation
        created: bool,
    },
    /// The store failed; the evaluation still stands and the caller may
    /// retry scheduling separately
    Failed(StoreError),
}

impl ScheduleOutcome {
    /// Whether the reschedule landed
    pub fn is_applied(&self) -> bool {
        matches!(self, ScheduleOutcome::Applied { .. })
    }
}

/// Result of one evaluate call: the judge's verdict, always, plus what became
/// of the reschedule
#[derive(Debug)]
pub struct EvaluationOutcome {
    /// The full judge evaluation
    pub evaluation: Evaluation,
    /// Outcome of the scheduling side effect
    pub schedule: ScheduleOutcome,
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

/// Runs the judge -> transform -> store sequence for one attempt
pub struct EvaluationOrchestrator<'a, S, J> {
    store: &'a S,
    judge: &'a J,
    scheduler: Scheduler,
}

impl<'a, S: ReviewStore, J: JudgeOracle> EvaluationOrchestrator<'a, S, J> {
    /// Create an orchestrator over a review store and a judge oracle
    pub fn new(store: &'a S, judge: &'a J) -> Self {
        Self {
            store,
            judge,
            scheduler: Scheduler::default(),
        }
    }

    /// Use a non-default scheduler
    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Evaluate one attempt at a card.
    ///
    /// Returns `Err` only when the judge call fails or the judge violates its
    /// score contract. Store failures after a successful judge call are
    /// reported inside the returned [`EvaluationOutcome`], never as `Err`.
    pub fn evaluate(
        &self,
        user_id: &str,
        card: &Card,
        user_sentence: &str,
        now: DateTime<Utc>,
    ) -> Result<EvaluationOutcome, EvaluateError> {
        let evaluation =
            self.judge
                .judge(user_sentence, &card.reference_texts, &card.concept_text)?;
        debug!(
            card_id = %card.id,
            score = evaluation.score,
            status = %evaluation.status,
            "judge evaluation complete"
        );

        // A malformed score is an oracle contract violation, checked before
        // any store traffic
        if !(0.0..=10.0).contains(&evaluation.score) {
            return Err(ScheduleError::InvalidScore(evaluation.score).into());
        }

        let schedule = self.apply_schedule(user_id, card, user_sentence, &evaluation, now);
        if let ScheduleOutcome::Failed(ref error) = schedule {
            // Logged only; the evaluation is still returned to the caller
            warn!(
                card_id = %card.id,
                user_id,
                %error,
                "scheduling update failed after successful evaluation"
            );
        }

        Ok(EvaluationOutcome {
            evaluation,
            schedule,
        })
    }

    fn apply_schedule(
        &self,
        user_id: &str,
        card: &Card,
        user_sentence: &str,
        evaluation: &Evaluation,
        now: DateTime<Utc>,
    ) -> ScheduleOutcome {
        let existing = match self.store.get(user_id, &card.id) {
            Ok(existing) => existing,
            Err(error) => return ScheduleOutcome::Failed(error),
        };

        let prior = existing.as_ref().map(|record| SchedulePrior {
            ease_factor: record.ease_factor,
            interval_days: record.interval_days,
        });
        // Score validity was checked up front, so the transform cannot fail
        // here; treat a failure as a store-shaped defect rather than panic
        let update = match self.scheduler.next_schedule(prior, evaluation.score, now) {
            Ok(update) => update,
            Err(error) => return ScheduleOutcome::Failed(StoreError::Write(error.to_string())),
        };

        let feedback = Some(Feedback::from(evaluation));
        let (record, created) = match existing {
            Some(mut record) => {
                record.apply(&update, evaluation.score, user_sentence, feedback, now);
                (record, false)
            }
            None => (
                ReviewRecord::first_evaluation(
                    user_id,
                    &card.id,
                    &update,
                    evaluation.score,
                    user_sentence,
                    feedback,
                    now,
                ),
                true,
            ),
        };

        match self.store.put(&record) {
            Ok(()) => {
                debug!(
                    card_id = %card.id,
                    interval = record.interval_days,
                    next_review = %record.next_review_at,
                    created,
                    "review record written"
                );
                ScheduleOutcome::Applied { record, created }
            }
            Err(error) => ScheduleOutcome::Failed(error),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
