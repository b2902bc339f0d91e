//! Shared question store.
//!
//! Questions are immutable once loaded. Difficulty counters live in a flat
//! arena of atomic cells indexed by (question, grade), so answers to the same
//! question from different users never contend on a global lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::RngCore;

use crate::error::EngineError;
use crate::model::{AnsweredSet, DifficultyEntry, DifficultyProfile, Grade, Question};

/// A question paired with one consistent read of its difficulty cell.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub question: Arc<Question>,
    pub difficulty: DifficultyEntry,
}

pub struct QuestionStore {
    questions: Vec<Arc<Question>>,
    by_id: HashMap<String, usize>,
    cells: Vec<AtomicU64>,
}

impl QuestionStore {
    /// Build a store. Iteration order is the order given here.
    pub fn new(
        entries: impl IntoIterator<Item = (Question, DifficultyProfile)>,
    ) -> Result<Self, EngineError> {
        let mut questions = Vec::new();
        let mut by_id = HashMap::new();
        let mut cells = Vec::new();

        for (question, profile) in entries {
            if by_id.contains_key(&question.id) {
                return Err(EngineError::DuplicateQuestion(question.id));
            }
            by_id.insert(question.id.clone(), questions.len());
            questions.push(Arc::new(question));
            cells.extend(
                Grade::ALL
                    .iter()
                    .map(|g| AtomicU64::new(profile.get(*g).pack())),
            );
        }

        Ok(Self {
            questions,
            by_id,
            cells,
        })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Question>> {
        self.by_id.get(id).map(|&i| Arc::clone(&self.questions[i]))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Questions in corpus order.
    pub fn questions(&self) -> impl Iterator<Item = &Arc<Question>> {
        self.questions.iter()
    }

    fn cell(&self, id: &str, grade: Grade) -> Option<&AtomicU64> {
        self.by_id
            .get(id)
            .map(|&i| &self.cells[i * Grade::COUNT + grade.index()])
    }

    pub fn difficulty(&self, id: &str, grade: Grade) -> Option<DifficultyEntry> {
        self.cell(id, grade)
            .map(|c| DifficultyEntry::unpack(c.load(Ordering::Acquire)))
    }

    pub fn profile(&self, id: &str) -> Option<DifficultyProfile> {
        let mut profile = DifficultyProfile::default();
        for grade in Grade::ALL {
            profile.set(grade, self.difficulty(id, grade)?);
        }
        Some(profile)
    }

    /// Record one answer in a cell. Returns the entry after the update.
    pub fn record_answer(
        &self,
        id: &str,
        grade: Grade,
        correct: bool,
    ) -> Result<DifficultyEntry, EngineError> {
        let cell = self
            .cell(id, grade)
            .ok_or_else(|| EngineError::QuestionNotFound(id.to_string()))?;
        let previous = cell
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some(DifficultyEntry::unpack(bits).recorded(correct).pack())
            })
            .unwrap_or_else(|bits| bits);
        Ok(DifficultyEntry::unpack(previous).recorded(correct))
    }

    /// Every question with its difficulty at `grade`, each cell read once.
    pub fn snapshot(&self, grade: Grade) -> Vec<Candidate> {
        self.questions
            .iter()
            .enumerate()
            .map(|(i, q)| Candidate {
                question: Arc::clone(q),
                difficulty: DifficultyEntry::unpack(
                    self.cells[i * Grade::COUNT + grade.index()].load(Ordering::Acquire),
                ),
            })
            .collect()
    }

    /// A uniformly random question whose id is not in `exclude`.
    pub fn random_excluding(
        &self,
        exclude: &AnsweredSet,
        rng: &mut dyn RngCore,
    ) -> Option<Arc<Question>> {
        let open: Vec<&Arc<Question>> = self
            .questions
            .iter()
            .filter(|q| !exclude.contains(&q.id))
            .collect();
        open.choose(rng).map(|q| Arc::clone(q))
    }

    /// Exam names present in the store, in first-seen order.
    pub fn exam_names(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for q in &self.questions {
            if !seen.contains(&q.exam_name) {
                seen.push(q.exam_name.clone());
            }
        }
        seen
    }
}

impl std::fmt::Debug for QuestionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestionStore")
            .field("questions", &self.questions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OptionLetter;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;

    fn question(id: &str, grade: i64, exam: &str) -> Question {
        let mut options = BTreeMap::new();
        options.insert(OptionLetter::A, "yes".to_string());
        options.insert(OptionLetter::B, "no".to_string());
        Question {
            id: id.into(),
            text: format!("question {id}"),
            options,
            correct_option: OptionLetter::A,
            grade_level: Grade::new(grade).unwrap(),
            exam_name: exam.into(),
        }
    }

    fn flat_profile(correct: u32, respondents: u32) -> DifficultyProfile {
        DifficultyProfile::new([DifficultyEntry::new(correct, respondents); Grade::COUNT])
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let result = QuestionStore::new(vec![
            (question("q1", 4, "MCAS"), flat_profile(1, 2)),
            (question("q1", 5, "MCAS"), flat_profile(1, 2)),
        ]);
        assert!(matches!(result, Err(EngineError::DuplicateQuestion(id)) if id == "q1"));
    }

    #[test]
    fn record_answer_updates_one_cell() {
        let store =
            QuestionStore::new(vec![(question("q1", 4, "MCAS"), flat_profile(50, 100))]).unwrap();
        let g4 = Grade::new(4).unwrap();
        let g5 = Grade::new(5).unwrap();

        let after = store.record_answer("q1", g4, false).unwrap();
        assert_eq!(after, DifficultyEntry::new(50, 101));
        assert_eq!(store.difficulty("q1", g4), Some(after));
        assert_eq!(store.difficulty("q1", g5), Some(DifficultyEntry::new(50, 100)));
        assert!(store.record_answer("missing", g4, true).is_err());
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let store = Arc::new(
            QuestionStore::new(vec![(question("q1", 4, "MCAS"), flat_profile(0, 0))]).unwrap(),
        );
        let grade = Grade::new(6).unwrap();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..500 {
                        store.record_answer("q1", grade, (i + t) % 2 == 0).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let entry = store.difficulty("q1", grade).unwrap();
        assert_eq!(entry.respondents, 4000);
        assert_eq!(entry.correct, 2000);
    }

    #[test]
    fn snapshot_preserves_corpus_order() {
        let store = QuestionStore::new(vec![
            (question("b", 4, "MCAS"), flat_profile(1, 2)),
            (question("a", 4, "TAKS"), flat_profile(1, 2)),
        ])
        .unwrap();
        let ids: Vec<_> = store
            .snapshot(Grade::new(4).unwrap())
            .into_iter()
            .map(|c| c.question.id.clone())
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(store.exam_names(), vec!["MCAS", "TAKS"]);
    }

    #[test]
    fn random_excluding_never_returns_excluded() {
        let store = QuestionStore::new(
            (0..10).map(|i| (question(&format!("q{i}"), 4, "MCAS"), flat_profile(1, 2))),
        )
        .unwrap();
        let excluded: AnsweredSet = (0..9).map(|i| format!("q{i}")).collect::<Vec<_>>().into();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let q = store.random_excluding(&excluded, &mut rng).unwrap();
            assert_eq!(q.id, "q9");
        }
        let all: AnsweredSet = (0..10).map(|i| format!("q{i}")).collect::<Vec<_>>().into();
        assert!(store.random_excluding(&all, &mut rng).is_none());
    }
}
