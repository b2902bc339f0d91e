//! Core data model types for adaptiq.
//!
//! Questions, per-grade difficulty counters, and the per-user session record
//! that the selection engine mutates.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Opaque, stable question identifier.
pub type QuestionId = String;

/// A school grade in the supported range (3 through 9 inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Grade(u8);

impl Grade {
    pub const MIN: u8 = 3;
    pub const MAX: u8 = 9;
    /// Number of supported grades.
    pub const COUNT: usize = (Self::MAX - Self::MIN + 1) as usize;
    /// Every supported grade, ascending.
    pub const ALL: [Grade; Self::COUNT] = [
        Grade(3),
        Grade(4),
        Grade(5),
        Grade(6),
        Grade(7),
        Grade(8),
        Grade(9),
    ];

    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(Grade(value as u8))
        } else {
            Err(ValidationError::GradeOutOfRange(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Position of this grade in a dense per-grade array (3 maps to 0).
    pub fn index(self) -> usize {
        (self.0 - Self::MIN) as usize
    }
}

impl TryFrom<i64> for Grade {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Grade::new(value)
    }
}

impl From<Grade> for u8 {
    fn from(grade: Grade) -> Self {
        grade.0
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Answer option label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OptionLetter {
    A,
    B,
    C,
    D,
}

impl OptionLetter {
    pub const ALL: [OptionLetter; 4] = [
        OptionLetter::A,
        OptionLetter::B,
        OptionLetter::C,
        OptionLetter::D,
    ];

    /// The numeric alias some exams print instead of a letter.
    pub fn numeral(self) -> char {
        match self {
            OptionLetter::A => '1',
            OptionLetter::B => '2',
            OptionLetter::C => '3',
            OptionLetter::D => '4',
        }
    }

    pub fn as_char(self) -> char {
        match self {
            OptionLetter::A => 'A',
            OptionLetter::B => 'B',
            OptionLetter::C => 'C',
            OptionLetter::D => 'D',
        }
    }
}

impl fmt::Display for OptionLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for OptionLetter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" | "1" => Ok(OptionLetter::A),
            "B" | "2" => Ok(OptionLetter::B),
            "C" | "3" => Ok(OptionLetter::C),
            "D" | "4" => Ok(OptionLetter::D),
            _ => Err(ValidationError::InvalidOptionLetter(s.to_string())),
        }
    }
}

impl TryFrom<String> for OptionLetter {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OptionLetter> for String {
    fn from(letter: OptionLetter) -> Self {
        letter.to_string()
    }
}

/// A multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    /// The stem, with option text removed.
    pub text: String,
    pub options: BTreeMap<OptionLetter, String>,
    pub correct_option: OptionLetter,
    /// Grade the question was authored for.
    pub grade_level: Grade,
    /// Canonical exam name.
    pub exam_name: String,
}

impl Question {
    pub fn has_option(&self, letter: OptionLetter) -> bool {
        self.options.contains_key(&letter)
    }

    pub fn is_correct(&self, letter: OptionLetter) -> bool {
        self.correct_option == letter
    }
}

/// Empirical difficulty of one question for one grade.
///
/// Raw counts are stored; the percentage is derived on read so the pair can
/// never drift out of sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawDifficultyEntry")]
pub struct DifficultyEntry {
    pub correct: u32,
    pub respondents: u32,
}

/// Wire shape of [`DifficultyEntry`]; decoded entries go through `new`.
#[derive(Deserialize)]
struct RawDifficultyEntry {
    correct: u32,
    respondents: u32,
}

impl From<RawDifficultyEntry> for DifficultyEntry {
    fn from(raw: RawDifficultyEntry) -> Self {
        Self::new(raw.correct, raw.respondents)
    }
}

impl DifficultyEntry {
    pub fn new(correct: u32, respondents: u32) -> Self {
        Self {
            correct: correct.min(respondents),
            respondents,
        }
    }

    /// Build counts from a `(percent_correct, respondents)` pair.
    pub fn from_percent(percent_correct: f64, respondents: u32) -> Self {
        let percent = if percent_correct.is_finite() {
            percent_correct.clamp(0.0, 100.0)
        } else {
            0.0
        };
        let correct = (percent * respondents as f64 / 100.0).round() as u32;
        Self::new(correct, respondents)
    }

    pub fn percent_correct(&self) -> f64 {
        if self.respondents == 0 {
            0.0
        } else {
            self.correct as f64 / self.respondents as f64 * 100.0
        }
    }

    /// The entry after one more respondent.
    pub fn recorded(self, correct: bool) -> Self {
        Self {
            correct: self.correct.saturating_add(u32::from(correct)),
            respondents: self.respondents.saturating_add(1),
        }
    }

    pub(crate) fn pack(self) -> u64 {
        (u64::from(self.correct) << 32) | u64::from(self.respondents)
    }

    pub(crate) fn unpack(bits: u64) -> Self {
        Self {
            correct: (bits >> 32) as u32,
            respondents: bits as u32,
        }
    }
}

/// One difficulty entry per supported grade. Always dense.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyProfile([DifficultyEntry; Grade::COUNT]);

impl DifficultyProfile {
    pub fn new(entries: [DifficultyEntry; Grade::COUNT]) -> Self {
        Self(entries)
    }

    pub fn get(&self, grade: Grade) -> DifficultyEntry {
        self.0[grade.index()]
    }

    pub fn set(&mut self, grade: Grade, entry: DifficultyEntry) {
        self.0[grade.index()] = entry;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Grade, DifficultyEntry)> + '_ {
        Grade::ALL.iter().copied().zip(self.0.iter().copied())
    }
}

/// Ordered, append-only set of question ids a user has answered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<QuestionId>", into = "Vec<QuestionId>")]
pub struct AnsweredSet {
    order: Vec<QuestionId>,
    index: HashSet<QuestionId>,
}

impl AnsweredSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an id. Returns `false` if it was already present.
    pub fn insert(&mut self, id: QuestionId) -> bool {
        if self.index.insert(id.clone()) {
            self.order.push(id);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn as_slice(&self) -> &[QuestionId] {
        &self.order
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.index.clear();
    }
}

impl From<Vec<QuestionId>> for AnsweredSet {
    fn from(ids: Vec<QuestionId>) -> Self {
        let mut set = AnsweredSet::new();
        for id in ids {
            set.insert(id);
        }
        set
    }
}

impl From<AnsweredSet> for Vec<QuestionId> {
    fn from(set: AnsweredSet) -> Self {
        set.order
    }
}

/// Per-user running state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSession {
    pub user_id: String,
    pub grade: Grade,
    pub preferred_exam: String,
    #[serde(default)]
    pub answered_count: u32,
    #[serde(default)]
    pub correct_count: u32,
    #[serde(default)]
    pub answered_ids: AnsweredSet,
    /// Question awaiting an answer. Never restored from persisted state.
    #[serde(default)]
    pub active_question_id: Option<QuestionId>,
    /// Percent correct, at this user's grade, of the anchor question.
    #[serde(default)]
    pub last_question_difficulty: f64,
}

impl UserSession {
    pub fn new(user_id: impl Into<String>, grade: Grade, preferred_exam: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            grade,
            preferred_exam: preferred_exam.into(),
            answered_count: 0,
            correct_count: 0,
            answered_ids: AnsweredSet::new(),
            active_question_id: None,
            last_question_difficulty: 0.0,
        }
    }

    /// Fraction of answers that were correct, in `[0, 1]`.
    pub fn running_accuracy(&self) -> f64 {
        if self.answered_count == 0 {
            0.0
        } else {
            self.correct_count as f64 / self.answered_count as f64
        }
    }

    pub(crate) fn record_answer(&mut self, correct: bool) {
        self.answered_count = self.answered_count.saturating_add(1);
        if correct {
            self.correct_count = self.correct_count.saturating_add(1).min(self.answered_count);
        }
    }

    pub fn stats(&self) -> UserStats {
        UserStats {
            accuracy: self.running_accuracy(),
            answered_count: self.answered_count,
        }
    }
}

/// What a client needs to render the current question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveQuestion {
    pub id: QuestionId,
    pub text: String,
    pub options: BTreeMap<OptionLetter, String>,
}

impl From<&Question> for ActiveQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            text: q.text.clone(),
            options: q.options.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub accuracy: f64,
    pub answered_count: u32,
}
