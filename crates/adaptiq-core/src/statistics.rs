//! Aggregate statistics over a question store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::Grade;
use crate::store::QuestionStore;

/// Statistics for one grade column of the difficulty table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeStats {
    pub grade: Grade,
    /// Questions authored for this grade.
    pub questions: usize,
    /// Mean percent correct of every question as answered at this grade.
    pub mean_percent_correct: f64,
    /// Total respondents recorded at this grade.
    pub total_respondents: u64,
}

/// Corpus-wide statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusStats {
    pub total_questions: usize,
    pub per_grade: Vec<GradeStats>,
    /// Question count per exam name.
    pub per_exam: BTreeMap<String, usize>,
}

impl CorpusStats {
    /// Compute statistics from a consistent snapshot per grade.
    pub fn compute(store: &QuestionStore) -> Self {
        let mut per_exam: BTreeMap<String, usize> = BTreeMap::new();
        let mut authored = [0usize; Grade::COUNT];
        for q in store.questions() {
            *per_exam.entry(q.exam_name.clone()).or_default() += 1;
            authored[q.grade_level.index()] += 1;
        }

        let per_grade = Grade::ALL
            .iter()
            .map(|&grade| {
                let snapshot = store.snapshot(grade);
                let total_respondents = snapshot
                    .iter()
                    .map(|c| u64::from(c.difficulty.respondents))
                    .sum();
                let mean_percent_correct = if snapshot.is_empty() {
                    0.0
                } else {
                    snapshot
                        .iter()
                        .map(|c| c.difficulty.percent_correct())
                        .sum::<f64>()
                        / snapshot.len() as f64
                };
                GradeStats {
                    grade,
                    questions: authored[grade.index()],
                    mean_percent_correct,
                    total_respondents,
                }
            })
            .collect();

        Self {
            total_questions: store.len(),
            per_grade,
            per_exam,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DifficultyEntry, DifficultyProfile, OptionLetter, Question};

    fn question(id: &str, grade: i64, exam: &str) -> Question {
        Question {
            id: id.into(),
            text: format!("question {id}"),
            options: BTreeMap::from([(OptionLetter::A, "yes".to_string())]),
            correct_option: OptionLetter::A,
            grade_level: Grade::new(grade).unwrap(),
            exam_name: exam.into(),
        }
    }

    #[test]
    fn per_grade_and_exam_counts() {
        let store = QuestionStore::new(vec![
            (
                question("a", 3, "MCAS"),
                DifficultyProfile::new([DifficultyEntry::new(1, 4); Grade::COUNT]),
            ),
            (
                question("b", 3, "TAKS"),
                DifficultyProfile::new([DifficultyEntry::new(3, 4); Grade::COUNT]),
            ),
            (
                question("c", 7, "MCAS"),
                DifficultyProfile::new([DifficultyEntry::new(0, 0); Grade::COUNT]),
            ),
        ])
        .unwrap();

        let stats = CorpusStats::compute(&store);
        assert_eq!(stats.total_questions, 3);
        assert_eq!(stats.per_exam["MCAS"], 2);
        assert_eq!(stats.per_exam["TAKS"], 1);

        let g3 = &stats.per_grade[0];
        assert_eq!(g3.grade.value(), 3);
        assert_eq!(g3.questions, 2);
        assert_eq!(g3.total_respondents, 8);
        // (25 + 75 + 0) / 3
        assert!((g3.mean_percent_correct - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.per_grade[4].questions, 1);
    }

    #[test]
    fn empty_store() {
        let store = QuestionStore::new(Vec::new()).unwrap();
        let stats = CorpusStats::compute(&store);
        assert_eq!(stats.total_questions, 0);
        assert!(stats.per_grade.iter().all(|g| g.mean_percent_correct == 0.0));
    }
}
