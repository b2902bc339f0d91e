//! Collaborator traits consumed by the selection engine.
//!
//! Similarity providers are implemented in `adaptiq-providers`; file-backed
//! repositories live in `adaptiq-store`, in-memory ones in [`crate::memory`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{DifficultyEntry, DifficultyProfile, Grade, Question, UserSession};

// ---------------------------------------------------------------------------
// Similarity provider trait
// ---------------------------------------------------------------------------

/// Semantic similarity between two question texts.
///
/// Implementations must not mutate shared state observable by the engine.
/// Return `0.0` when either text has nothing comparable; return an error only
/// when the backend itself failed.
#[async_trait]
pub trait SimilarityProvider: Send + Sync {
    /// Human-readable provider name (e.g. "lexical").
    fn name(&self) -> &str;

    /// Similarity in `[0, 1]`; 1 means identical.
    async fn similarity(&self, text_a: &str, text_b: &str) -> anyhow::Result<f64>;
}

// ---------------------------------------------------------------------------
// Persistence traits
// ---------------------------------------------------------------------------

/// A question as a repository hands it over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredQuestion {
    pub question: Question,
    /// Recorded response data, if any. `None` means the engine bootstraps one.
    #[serde(default)]
    pub difficulty: Option<DifficultyProfile>,
}

impl From<Question> for StoredQuestion {
    fn from(question: Question) -> Self {
        Self {
            question,
            difficulty: None,
        }
    }
}

/// Source of questions and sink for difficulty updates.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Bulk corpus load, called once at startup.
    async fn load_questions(&self) -> anyhow::Result<Vec<StoredQuestion>>;

    /// Persist one updated difficulty cell.
    async fn persist_difficulty_update(
        &self,
        question_id: &str,
        grade: Grade,
        entry: DifficultyEntry,
    ) -> anyhow::Result<()>;

    /// Persist a bootstrapped profile so it is not synthesized again.
    async fn persist_profile(
        &self,
        question_id: &str,
        profile: &DifficultyProfile,
    ) -> anyhow::Result<()>;
}

/// Load and store per-user session records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn load_user(&self, user_id: &str) -> anyhow::Result<Option<UserSession>>;

    async fn persist_user(&self, session: &UserSession) -> anyhow::Result<()>;
}
