//! Scripted judge oracle
//!
//! Deterministic [`JudgeOracle`] for tests: scores come from a fixed script
//! instead of a model call, with failure modes on demand.

use retell_core::{Evaluation, JudgeError, JudgeOracle, Judgment, ReferenceText};
use std::cell::RefCell;
use std::collections::VecDeque;

enum Script {
    /// Pop scores in order; the last one repeats once the queue drains
    Scores(RefCell<VecDeque<f64>>, f64),
    /// Every call fails as unavailable
    Unavailable(String),
    /// Every call fails as malformed
    Malformed(String),
}

/// A judge that replays a pre-programmed script
pub struct ScriptedJudge {
    script: Script,
}

impl ScriptedJudge {
    /// Judge that returns the given scores in order, repeating the final
    /// score once the script is exhausted
    pub fn with_scores(scores: &[f64]) -> Self {
        assert!(!scores.is_empty(), "score script must not be empty");
        let last = *scores.last().unwrap();
        Self {
            script: Script::Scores(RefCell::new(scores.iter().copied().collect()), last),
        }
    }

    /// Judge that always returns the same score
    pub fn always(score: f64) -> Self {
        Self::with_scores(&[score])
    }

    /// Judge whose calls all fail as unavailable
    pub fn unavailable(reason: &str) -> Self {
        Self {
            script: Script::Unavailable(reason.to_string()),
        }
    }

    /// Judge whose calls all fail as malformed responses
    pub fn malformed(reason: &str) -> Self {
        Self {
            script: Script::Malformed(reason.to_string()),
        }
    }

    fn status_for(score: f64) -> Judgment {
        if score >= 8.0 {
            Judgment::Pass
        } else if score >= 5.0 {
            Judgment::Review
        } else {
            Judgment::Fail
        }
    }
}

impl JudgeOracle for ScriptedJudge {
    fn judge(
        &self,
        user_sentence: &str,
        _reference_texts: &[ReferenceText],
        _concept_prompt: &str,
    ) -> Result<Evaluation, JudgeError> {
        match &self.script {
            Script::Scores(queue, last) => {
                let score = queue.borrow_mut().pop_front().unwrap_or(*last);
                Ok(Evaluation {
                    status: Self::status_for(score),
                    score,
                    critique: format!("Scripted critique of \"{user_sentence}\""),
                    gap_analysis: "Scripted gap analysis.".to_string(),
                })
            }
            Script::Unavailable(reason) => Err(JudgeError::Unavailable(reason.clone())),
            Script::Malformed(reason) => Err(JudgeError::Malformed(reason.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_pop_in_order_then_repeat() {
        let judge = ScriptedJudge::with_scores(&[9.0, 3.0]);
        let refs = [];
        assert_eq!(judge.judge("a", &refs, "p").unwrap().score, 9.0);
        assert_eq!(judge.judge("b", &refs, "p").unwrap().score, 3.0);
        assert_eq!(judge.judge("c", &refs, "p").unwrap().score, 3.0);
    }

    #[test]
    fn test_status_tracks_score_band() {
        let judge = ScriptedJudge::with_scores(&[9.0, 6.0, 2.0]);
        let refs = [];
        assert_eq!(judge.judge("a", &refs, "p").unwrap().status, Judgment::Pass);
        assert_eq!(judge.judge("b", &refs, "p").unwrap().status, Judgment::Review);
        assert_eq!(judge.judge("c", &refs, "p").unwrap().status, Judgment::Fail);
    }
}
