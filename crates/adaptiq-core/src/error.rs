//! Engine and collaborator error types.
//!
//! Validation errors are raised before any state is mutated. Similarity errors
//! are defined here so the engine can classify provider failures without
//! string matching.

use thiserror::Error;

use crate::model::{Grade, QuestionId};

/// Input rejected before anything was mutated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Grade outside the supported 3..=9 range.
    #[error("grade {0} is not supported (expected {min}..={max})", min = Grade::MIN, max = Grade::MAX)]
    GradeOutOfRange(i64),

    /// Exam name not in the catalog.
    #[error("unknown exam type: {0}")]
    UnknownExam(String),

    /// Input that does not parse as an option letter at all.
    #[error("invalid option letter: {0:?}")]
    InvalidOptionLetter(String),

    /// A well-formed letter that the question does not offer.
    #[error("question {question_id} has no option {letter}")]
    InvalidOption {
        question_id: QuestionId,
        letter: String,
    },

    /// The question is already in the user's answered history.
    #[error("question {question_id} was already answered by {user_id}")]
    AlreadyAnswered {
        user_id: String,
        question_id: QuestionId,
    },
}

/// Errors surfaced by the selection engine. All of them are per-request.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No persisted record exists for this user.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// No in-memory session is open for this user.
    #[error("no open session for user {0}")]
    SessionNotFound(String),

    #[error("question not found: {0}")]
    QuestionNotFound(QuestionId),

    /// Every question in the store has already been answered by this user.
    #[error("no unanswered question remains for user {user_id}")]
    Exhausted { user_id: String },

    /// The session has no question awaiting an answer.
    #[error("session for {0} has no active question")]
    NoActiveQuestion(String),

    #[error("question store is empty")]
    EmptyCorpus,

    #[error("duplicate question id in corpus: {0}")]
    DuplicateQuestion(QuestionId),

    /// A load from a persistence collaborator failed.
    #[error("collaborator failure: {0:#}")]
    Collaborator(#[source] anyhow::Error),
}

impl EngineError {
    /// Returns `true` for errors caused by caller input rather than engine state.
    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Validation(_))
    }
}

/// Errors that can occur when asking a provider for text similarity.
#[derive(Debug, Error)]
pub enum SimilarityError {
    /// The call did not finish within the configured budget.
    #[error("similarity call timed out after {0}ms")]
    Timeout(u64),

    /// The backing service could not be reached.
    #[error("similarity provider unavailable: {0}")]
    Unavailable(String),

    /// The backing service returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The response could not be interpreted.
    #[error("invalid similarity response: {0}")]
    InvalidResponse(String),
}

impl SimilarityError {
    /// Returns `true` if retrying the same call cannot succeed.
    pub fn is_permanent(&self) -> bool {
        match self {
            SimilarityError::Api { status, .. } => (400..500).contains(status) && *status != 429,
            SimilarityError::InvalidResponse(_) => true,
            SimilarityError::Timeout(_) | SimilarityError::Unavailable(_) => false,
        }
    }
}
