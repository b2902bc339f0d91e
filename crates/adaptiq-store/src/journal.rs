//! Append-only difficulty journal in JSON Lines.
//!
//! Every bootstrapped profile and every updated cell is appended as one line.
//! Replaying the journal over the corpus reproduces the in-memory difficulty
//! table of the last run. Updates carry absolute counts, so replay is a plain
//! overwrite and later lines win.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use adaptiq_core::model::{DifficultyEntry, DifficultyProfile, Grade};
use adaptiq_core::traits::StoredQuestion;

/// One journal line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum JournalRecord {
    /// A full profile synthesized at bootstrap.
    Seed {
        at: DateTime<Utc>,
        question_id: String,
        profile: DifficultyProfile,
    },
    /// One cell after an answer.
    Update {
        at: DateTime<Utc>,
        question_id: String,
        grade: Grade,
        entry: DifficultyEntry,
    },
}

impl JournalRecord {
    pub fn question_id(&self) -> &str {
        match self {
            JournalRecord::Seed { question_id, .. } | JournalRecord::Update { question_id, .. } => {
                question_id
            }
        }
    }
}

/// Counts from a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub seeds: usize,
    pub updates: usize,
    /// Lines naming a question that is not in the corpus.
    pub unknown: usize,
    /// Lines that failed to parse.
    pub corrupt: usize,
}

/// Appends to and replays a JSON Lines difficulty journal.
pub struct DifficultyJournal {
    path: PathBuf,
    file: Mutex<File>,
}

impl std::fmt::Debug for DifficultyJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DifficultyJournal")
            .field("path", &self.path)
            .finish()
    }
}

impl DifficultyJournal {
    /// Open (creating if needed) the journal at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open journal: {}", path.display()))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and flush it.
    pub fn append(&self, record: &JournalRecord) -> Result<()> {
        let mut line = serde_json::to_string(record).context("failed to serialize journal record")?;
        line.push('\n');
        let mut file = self.file.lock();
        file.write_all(line.as_bytes())
            .and_then(|()| file.flush())
            .with_context(|| format!("failed to append to journal: {}", self.path.display()))
    }

    pub fn record_seed(&self, question_id: &str, profile: &DifficultyProfile) -> Result<()> {
        self.append(&JournalRecord::Seed {
            at: Utc::now(),
            question_id: question_id.to_string(),
            profile: *profile,
        })
    }

    pub fn record_update(&self, question_id: &str, grade: Grade, entry: DifficultyEntry) -> Result<()> {
        self.append(&JournalRecord::Update {
            at: Utc::now(),
            question_id: question_id.to_string(),
            grade,
            entry,
        })
    }

    /// Every parseable record, in file order. Unparseable lines are skipped
    /// with a warning; a crash mid-append can leave one behind.
    pub fn records(&self) -> Result<(Vec<JournalRecord>, usize)> {
        let file = File::open(&self.path)
            .with_context(|| format!("failed to read journal: {}", self.path.display()))?;
        let mut records = Vec::new();
        let mut corrupt = 0;
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<JournalRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    corrupt += 1;
                    tracing::warn!("{}:{}: skipping journal line: {e}", self.path.display(), n + 1);
                }
            }
        }
        Ok((records, corrupt))
    }

    /// Apply the journal to freshly loaded questions.
    pub fn replay_onto(&self, questions: &mut [StoredQuestion]) -> Result<ReplayStats> {
        let (records, corrupt) = self.records()?;
        let index: HashMap<String, usize> = questions
            .iter()
            .enumerate()
            .map(|(i, q)| (q.question.id.clone(), i))
            .collect();

        let mut stats = ReplayStats {
            corrupt,
            ..ReplayStats::default()
        };
        for record in records {
            let Some(&i) = index.get(record.question_id()) else {
                stats.unknown += 1;
                continue;
            };
            let stored = &mut questions[i];
            match record {
                JournalRecord::Seed { profile, .. } => {
                    stored.difficulty = Some(profile);
                    stats.seeds += 1;
                }
                JournalRecord::Update { grade, entry, .. } => match stored.difficulty.as_mut() {
                    Some(profile) => {
                        profile.set(grade, entry);
                        stats.updates += 1;
                    }
                    None => {
                        tracing::warn!(
                            question_id = %stored.question.id,
                            "journal update without a base profile, ignoring"
                        );
                        stats.unknown += 1;
                    }
                },
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adaptiq_core::model::{OptionLetter, Question};
    use std::collections::BTreeMap;

    fn stored(id: &str, difficulty: Option<DifficultyProfile>) -> StoredQuestion {
        StoredQuestion {
            question: Question {
                id: id.into(),
                text: "t".into(),
                options: BTreeMap::from([(OptionLetter::A, "a".to_string())]),
                correct_option: OptionLetter::A,
                grade_level: Grade::new(4).unwrap(),
                exam_name: "MCAS".into(),
            },
            difficulty,
        }
    }

    fn g(value: i64) -> Grade {
        Grade::new(value).unwrap()
    }

    #[test]
    fn replay_applies_seeds_then_updates() {
        let dir = tempfile::tempdir().unwrap();
        let journal = DifficultyJournal::open(dir.path().join("difficulty.jsonl")).unwrap();

        let seed = DifficultyProfile::new([DifficultyEntry::new(10, 20); Grade::COUNT]);
        journal.record_seed("fresh", &seed).unwrap();
        journal.record_update("fresh", g(4), DifficultyEntry::new(11, 21)).unwrap();
        journal.record_update("fresh", g(4), DifficultyEntry::new(11, 22)).unwrap();
        journal.record_update("gone", g(4), DifficultyEntry::new(1, 1)).unwrap();

        let mut questions = vec![stored("fresh", None), stored("other", None)];
        let stats = journal.replay_onto(&mut questions).unwrap();

        assert_eq!(
            stats,
            ReplayStats {
                seeds: 1,
                updates: 2,
                unknown: 1,
                corrupt: 0
            }
        );
        let profile = questions[0].difficulty.unwrap();
        assert_eq!(profile.get(g(4)), DifficultyEntry::new(11, 22));
        assert_eq!(profile.get(g(5)), DifficultyEntry::new(10, 20));
        assert!(questions[1].difficulty.is_none());
    }

    #[test]
    fn updates_apply_over_corpus_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let journal = DifficultyJournal::open(dir.path().join("j.jsonl")).unwrap();
        journal.record_update("q", g(9), DifficultyEntry::new(3, 7)).unwrap();

        let base = DifficultyProfile::new([DifficultyEntry::new(50, 100); Grade::COUNT]);
        let mut questions = vec![stored("q", Some(base))];
        journal.replay_onto(&mut questions).unwrap();
        let profile = questions[0].difficulty.unwrap();
        assert_eq!(profile.get(g(9)), DifficultyEntry::new(3, 7));
        assert_eq!(profile.get(g(3)), DifficultyEntry::new(50, 100));
    }

    #[test]
    fn corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("j.jsonl");
        {
            let journal = DifficultyJournal::open(&path).unwrap();
            journal.record_seed("q", &DifficultyProfile::default()).unwrap();
        }
        let mut raw = OpenOptions::new().append(true).open(&path).unwrap();
        raw.write_all(b"{\"kind\":\"update\",\"question_").unwrap();

        let journal = DifficultyJournal::open(&path).unwrap();
        let (records, corrupt) = journal.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(corrupt, 1);
    }

    #[test]
    fn record_lines_are_tagged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("j.jsonl");
        let journal = DifficultyJournal::open(&path).unwrap();
        journal.record_update("q", g(6), DifficultyEntry::new(1, 2)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(value["kind"], "update");
        assert_eq!(value["grade"], 6);
        assert_eq!(value["entry"]["respondents"], 2);
    }

    #[test]
    fn hand_edited_counts_are_clamped_on_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("j.jsonl");
        std::fs::write(
            &path,
            concat!(
                r#"{"kind":"update","at":"2026-01-01T00:00:00Z","question_id":"q","#,
                r#""grade":5,"entry":{"correct":12,"respondents":3}}"#,
                "\n"
            ),
        )
        .unwrap();

        let journal = DifficultyJournal::open(&path).unwrap();
        let base = DifficultyProfile::new([DifficultyEntry::new(50, 100); Grade::COUNT]);
        let mut questions = vec![stored("q", Some(base))];
        let stats = journal.replay_onto(&mut questions).unwrap();
        assert_eq!(stats.updates, 1);

        let entry = questions[0].difficulty.unwrap().get(g(5));
        assert_eq!(entry, DifficultyEntry::new(3, 3));
        assert!(entry.percent_correct() <= 100.0);
    }
}
