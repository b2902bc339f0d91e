//! Corpus files plus the difficulty journal as a question repository.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;

use adaptiq_core::corpus::load_corpora;
use adaptiq_core::model::{DifficultyEntry, DifficultyProfile, Grade};
use adaptiq_core::traits::{QuestionRepository, StoredQuestion};

use crate::journal::DifficultyJournal;

pub const JOURNAL_FILE: &str = "difficulty.jsonl";

/// Reads questions from TOML corpora and keeps difficulty in a journal under
/// the data directory.
#[derive(Debug)]
pub struct FileQuestionRepository {
    corpus_path: PathBuf,
    journal: DifficultyJournal,
}

impl FileQuestionRepository {
    pub fn open(corpus_path: impl Into<PathBuf>, data_dir: &Path) -> Result<Self> {
        Ok(Self {
            corpus_path: corpus_path.into(),
            journal: DifficultyJournal::open(data_dir.join(JOURNAL_FILE))?,
        })
    }

    pub fn journal(&self) -> &DifficultyJournal {
        &self.journal
    }
}

#[async_trait]
impl QuestionRepository for FileQuestionRepository {
    async fn load_questions(&self) -> anyhow::Result<Vec<StoredQuestion>> {
        let mut questions: Vec<StoredQuestion> = load_corpora(&self.corpus_path)?
            .into_iter()
            .flat_map(|c| c.questions)
            .collect();
        let stats = self.journal.replay_onto(&mut questions)?;
        tracing::info!(
            questions = questions.len(),
            seeds = stats.seeds,
            updates = stats.updates,
            skipped = stats.unknown + stats.corrupt,
            "replayed difficulty journal"
        );
        Ok(questions)
    }

    async fn persist_difficulty_update(
        &self,
        question_id: &str,
        grade: Grade,
        entry: DifficultyEntry,
    ) -> anyhow::Result<()> {
        self.journal.record_update(question_id, grade, entry)
    }

    async fn persist_profile(
        &self,
        question_id: &str,
        profile: &DifficultyProfile,
    ) -> anyhow::Result<()> {
        self.journal.record_seed(question_id, profile)
    }
}
