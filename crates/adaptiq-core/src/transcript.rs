//! Session transcripts with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Grade, OptionLetter, QuestionId, UserStats};

/// A recorded sequence of answers for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub user_id: String,
    pub grade: Grade,
    pub preferred_exam: String,
    /// When the transcript was created.
    pub created_at: DateTime<Utc>,
    /// Seed used for the run, if any.
    #[serde(default)]
    pub seed: Option<u64>,
    pub steps: Vec<TranscriptStep>,
    /// Stats at the end of the run.
    #[serde(default)]
    pub final_stats: Option<UserStats>,
}

/// One answered question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptStep {
    pub question_id: QuestionId,
    pub letter: OptionLetter,
    pub correct: bool,
    /// Running accuracy after this answer.
    pub accuracy: f64,
    /// Percent correct of the question at the user's grade after this answer.
    pub difficulty: f64,
    /// The next question and the score that selected it; `None` once exhausted.
    #[serde(default)]
    pub next_question_id: Option<QuestionId>,
    #[serde(default)]
    pub next_score: Option<f64>,
}

impl Transcript {
    pub fn new(user_id: impl Into<String>, grade: Grade, preferred_exam: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            grade,
            preferred_exam: preferred_exam.into(),
            created_at: Utc::now(),
            seed: None,
            steps: Vec::new(),
            final_stats: None,
        }
    }

    pub fn push(&mut self, step: TranscriptStep) {
        self.steps.push(step);
    }

    pub fn correct_count(&self) -> usize {
        self.steps.iter().filter(|s| s.correct).count()
    }

    /// Save the transcript as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize transcript")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write transcript to {}", path.display()))?;
        Ok(())
    }

    /// Load a transcript from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read transcript from {}", path.display()))?;
        serde_json::from_str(&content).context("failed to parse transcript JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str, correct: bool) -> TranscriptStep {
        TranscriptStep {
            question_id: id.into(),
            letter: OptionLetter::B,
            correct,
            accuracy: if correct { 1.0 } else { 0.0 },
            difficulty: 49.5,
            next_question_id: Some("next".into()),
            next_score: Some(3.25),
        }
    }

    #[test]
    fn json_file_roundtrip() {
        let mut transcript = Transcript::new("ada", Grade::new(6).unwrap(), "MCAS");
        transcript.seed = Some(7);
        transcript.push(step("q1", true));
        transcript.push(step("q2", false));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs/transcript.json");
        transcript.save_json(&path).unwrap();

        let loaded = Transcript::load_json(&path).unwrap();
        assert_eq!(loaded.user_id, "ada");
        assert_eq!(loaded.grade.value(), 6);
        assert_eq!(loaded.seed, Some(7));
        assert_eq!(loaded.steps.len(), 2);
        assert_eq!(loaded.steps[0].letter, OptionLetter::B);
        assert_eq!(loaded.correct_count(), 1);
        assert_eq!(loaded.created_at, transcript.created_at);
    }

    #[test]
    fn load_missing_file_fails_with_path() {
        let err = Transcript::load_json(Path::new("/nonexistent/t.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/t.json"));
    }
}
