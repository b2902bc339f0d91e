//! Dissimilarity scoring: lower scores are better next questions.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::model::{DifficultyEntry, Question, UserSession};

/// Per-term weights of the difference score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub grade: f64,
    pub last_difficulty: f64,
    pub accuracy: f64,
    /// Kept far above the others so topical continuity dominates.
    pub text: f64,
    pub exam: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            grade: 1.0,
            last_difficulty: 1.0,
            accuracy: 1.0,
            text: 100.0,
            exam: 1.0,
        }
    }
}

/// Every term of one candidate's score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub grade_term: f64,
    pub last_term: f64,
    pub accuracy_term: f64,
    pub text_term: f64,
    pub exam_term: f64,
    pub total: f64,
}

/// Clamp a provider similarity into `[0, 1]`; NaN counts as no similarity.
pub fn sanitize_similarity(similarity: f64) -> f64 {
    if similarity.is_nan() {
        0.0
    } else {
        similarity.clamp(0.0, 1.0)
    }
}

/// Score a candidate against the session state.
///
/// `difficulty` is the candidate's entry at the session's grade and
/// `similarity` is between the candidate's text and the active question's.
pub fn difference_score(
    weights: &ScoringWeights,
    session: &UserSession,
    candidate: &Question,
    difficulty: DifficultyEntry,
    similarity: f64,
) -> ScoreBreakdown {
    let percent = difficulty.percent_correct();
    let grade_gap = f64::from(candidate.grade_level.value()) - f64::from(session.grade.value());

    let grade_term = weights.grade * (6.0 - grade_gap) / 6.0;
    let last_term =
        weights.last_difficulty * (1.0 - (percent - session.last_question_difficulty).abs() / 100.0);
    let accuracy_term = weights.accuracy
        * (1.0
            - (percent - session.running_accuracy() * 100.0).abs()
                * f64::from(session.answered_count)
                / 100.0);
    let text_term = weights.text * (1.0 - sanitize_similarity(similarity));
    let exam_term = if candidate.exam_name == session.preferred_exam {
        0.0
    } else {
        weights.exam
    };

    ScoreBreakdown {
        grade_term,
        last_term,
        accuracy_term,
        text_term,
        exam_term,
        total: grade_term + last_term + accuracy_term + text_term + exam_term,
    }
}

/// A scored candidate, in the order the ranking produced it.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub question_id: String,
    pub breakdown: ScoreBreakdown,
}

fn by_total(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    a.breakdown.total.total_cmp(&b.breakdown.total)
}

/// Stable ascending sort: equal scores keep their input order.
pub fn rank(mut scored: Vec<RankedCandidate>) -> Vec<RankedCandidate> {
    scored.sort_by(by_total);
    scored
}
