//! TOML question corpus parser.
//!
//! Loads corpora from TOML files and directories, splits inline answer
//! options out of question stems, and validates the result.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::exam::{normalize_exam_name, ExamCatalog};
use crate::model::{DifficultyEntry, DifficultyProfile, Grade, OptionLetter, Question};
use crate::traits::StoredQuestion;

/// A parsed corpus file.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub id: String,
    pub name: String,
    pub description: String,
    pub questions: Vec<StoredQuestion>,
}

/// Intermediate TOML structure for parsing corpus files.
#[derive(Debug, Deserialize)]
struct TomlCorpusFile {
    corpus: TomlCorpusHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlCorpusHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    text: String,
    #[serde(default)]
    options: Option<BTreeMap<String, String>>,
    answer: String,
    grade: i64,
    exam: String,
    #[serde(default)]
    difficulty: Option<Vec<TomlDifficulty>>,
}

#[derive(Debug, Deserialize)]
struct TomlDifficulty {
    grade: i64,
    percent: f64,
    respondents: u32,
}

/// Split inline options such as `"Stem (A) one (B) two"` out of a question.
///
/// Markers are searched from the last letter to the first; when no `(A)`
/// option is found the numeric markers `(1)`..`(4)` are tried instead.
pub fn split_options(raw: &str) -> (String, BTreeMap<OptionLetter, String>) {
    let by_letter = split_with(raw, |l| format!("({})", l.as_char()));
    if by_letter.1.contains_key(&OptionLetter::A) {
        return by_letter;
    }
    let by_number = split_with(raw, |l| format!("({})", l.numeral()));
    if by_number.1.contains_key(&OptionLetter::A) {
        return by_number;
    }
    (raw.trim().to_string(), BTreeMap::new())
}

fn split_with(
    raw: &str,
    marker: impl Fn(OptionLetter) -> String,
) -> (String, BTreeMap<OptionLetter, String>) {
    let mut stem = raw;
    let mut options = BTreeMap::new();
    for letter in OptionLetter::ALL.iter().rev() {
        let marker = marker(*letter);
        if let Some(pos) = stem.find(&marker) {
            let rest = &stem[pos + marker.len()..];
            let text = rest.split(&marker).next().unwrap_or("").trim();
            if !text.is_empty() {
                options.insert(*letter, text.to_string());
            }
            stem = &stem[..pos];
        }
    }
    (stem.trim().to_string(), options)
}

fn parse_profile(id: &str, rows: Vec<TomlDifficulty>) -> Result<DifficultyProfile> {
    let mut profile = DifficultyProfile::default();
    let mut seen = HashSet::new();
    for row in rows {
        let grade = Grade::new(row.grade)
            .with_context(|| format!("question {id}: invalid difficulty grade"))?;
        anyhow::ensure!(
            seen.insert(grade),
            "question {id}: difficulty grade {grade} listed twice"
        );
        anyhow::ensure!(
            (0.0..=100.0).contains(&row.percent),
            "question {id}: difficulty percent {} out of range",
            row.percent
        );
        profile.set(grade, DifficultyEntry::from_percent(row.percent, row.respondents));
    }
    anyhow::ensure!(
        seen.len() == Grade::COUNT,
        "question {id}: difficulty must cover every grade {}..={} (got {})",
        Grade::MIN,
        Grade::MAX,
        seen.len()
    );
    Ok(profile)
}

fn convert_question(q: TomlQuestion) -> Result<StoredQuestion> {
    let grade_level =
        Grade::new(q.grade).with_context(|| format!("question {}: invalid grade", q.id))?;

    let (text, options) = match q.options {
        Some(table) => {
            let options = table
                .into_iter()
                .map(|(k, v)| -> Result<(OptionLetter, String)> {
                    Ok((k.parse()?, v.trim().to_string()))
                })
                .collect::<Result<BTreeMap<_, _>>>()
                .with_context(|| format!("question {}: bad option key", q.id))?;
            (q.text.trim().to_string(), options)
        }
        None => split_options(&q.text),
    };
    anyhow::ensure!(!options.is_empty(), "question {}: no answer options", q.id);

    let correct_option: OptionLetter = q
        .answer
        .parse()
        .with_context(|| format!("question {}: bad answer", q.id))?;
    anyhow::ensure!(
        options.contains_key(&correct_option),
        "question {}: answer {} is not one of its options",
        q.id,
        correct_option
    );

    let difficulty = q
        .difficulty
        .map(|rows| parse_profile(&q.id, rows))
        .transpose()?;

    Ok(StoredQuestion {
        question: Question {
            id: q.id,
            text,
            options,
            correct_option,
            grade_level,
            exam_name: normalize_exam_name(&q.exam),
        },
        difficulty,
    })
}

/// Parse a single TOML file into a `Corpus`.
pub fn parse_corpus(path: &Path) -> Result<Corpus> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read corpus file: {}", path.display()))?;

    parse_corpus_str(&content, path)
}

/// Parse a TOML string into a `Corpus` (useful for testing).
pub fn parse_corpus_str(content: &str, source_path: &Path) -> Result<Corpus> {
    let parsed: TomlCorpusFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let questions = parsed
        .questions
        .into_iter()
        .map(convert_question)
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("invalid corpus: {}", source_path.display()))?;

    Ok(Corpus {
        id: parsed.corpus.id,
        name: parsed.corpus.name,
        description: parsed.corpus.description,
        questions,
    })
}

/// Recursively load all `.toml` corpus files from a directory.
pub fn load_corpus_directory(dir: &Path) -> Result<Vec<Corpus>> {
    let mut corpora = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut paths = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    // read_dir order is platform dependent; corpus order drives tie-breaking.
    paths.sort();

    for path in paths {
        if path.is_dir() {
            corpora.extend(load_corpus_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_corpus(&path) {
                Ok(corpus) => corpora.push(corpus),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(corpora)
}

/// Load a corpus file, or every corpus under a directory.
pub fn load_corpora(path: &Path) -> Result<Vec<Corpus>> {
    if path.is_dir() {
        load_corpus_directory(path)
    } else {
        Ok(vec![parse_corpus(path)?])
    }
}

/// A warning from corpus validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate a corpus for common issues.
pub fn validate_corpus(corpus: &Corpus, catalog: &ExamCatalog) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut seen_ids = HashSet::new();
    for stored in &corpus.questions {
        let q = &stored.question;
        if !seen_ids.insert(&q.id) {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: format!("duplicate question ID: {}", q.id),
            });
        }
        if q.text.trim().is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: "question text is empty".into(),
            });
        }
        if q.options.len() < 2 {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: format!("only {} answer option(s)", q.options.len()),
            });
        }
        if !catalog.contains(&q.exam_name) {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: format!("exam '{}' is not in the built-in catalog", q.exam_name),
            });
        }
    }

    if corpus.questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "corpus has no questions".into(),
        });
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[corpus]
id = "science"
name = "Science"
description = "Elementary science"

[[questions]]
id = "MCAS_2004_5_1"
text = "Which animal is a mammal? (A) shark (B) whale (C) trout (D) eel"
answer = "B"
grade = 5
exam = "MCAS"

[[questions]]
id = "TAKS_2009_8_3"
text = "At sea level, water boils at"
options = { A = "50 C", B = "75 C", C = "100 C" }
answer = "c"
grade = 8
exam = "Texas Assessment of Knowledge and Skills"
difficulty = [
    { grade = 3, percent = 20.0, respondents = 40 },
    { grade = 4, percent = 30.0, respondents = 40 },
    { grade = 5, percent = 40.0, respondents = 40 },
    { grade = 6, percent = 50.0, respondents = 40 },
    { grade = 7, percent = 60.0, respondents = 40 },
    { grade = 8, percent = 70.0, respondents = 40 },
    { grade = 9, percent = 80.0, respondents = 40 },
]
"#;

    #[test]
    fn split_lettered_options() {
        let (stem, options) = split_options("Which is a gas? (A) ice (B) steam (C) water (D) rock");
        assert_eq!(stem, "Which is a gas?");
        assert_eq!(options.len(), 4);
        assert_eq!(options[&OptionLetter::B], "steam");
        assert_eq!(options[&OptionLetter::D], "rock");
    }

    #[test]
    fn split_numbered_options_and_missing_d() {
        let (stem, options) = split_options("True or false? (1) true (2) false");
        assert_eq!(stem, "True or false?");
        assert_eq!(options.len(), 2);
        assert_eq!(options[&OptionLetter::A], "true");
        assert!(!options.contains_key(&OptionLetter::C));
    }

    #[test]
    fn split_without_markers_keeps_text() {
        let (stem, options) = split_options("  Describe photosynthesis. ");
        assert_eq!(stem, "Describe photosynthesis.");
        assert!(options.is_empty());
    }

    #[test]
    fn parse_valid_toml() {
        let corpus = parse_corpus_str(VALID_TOML, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(corpus.id, "science");
        assert_eq!(corpus.questions.len(), 2);

        let first = &corpus.questions[0];
        assert_eq!(first.question.text, "Which animal is a mammal?");
        assert_eq!(first.question.correct_option, OptionLetter::B);
        assert!(first.difficulty.is_none());

        let second = &corpus.questions[1];
        assert_eq!(second.question.exam_name, "TAKS");
        assert_eq!(second.question.correct_option, OptionLetter::C);
        let profile = second.difficulty.unwrap();
        assert_eq!(
            profile.get(Grade::new(8).unwrap()),
            DifficultyEntry::new(28, 40)
        );
    }

    #[test]
    fn answer_must_be_an_option() {
        let toml = r#"
[corpus]
id = "bad"
name = "Bad"

[[questions]]
id = "q1"
text = "Pick (A) one (B) two"
answer = "D"
grade = 4
exam = "MCAS"
"#;
        let err = parse_corpus_str(toml, &PathBuf::from("bad.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("not one of its options"));
    }

    #[test]
    fn partial_difficulty_is_rejected() {
        let toml = r#"
[corpus]
id = "partial"
name = "Partial"

[[questions]]
id = "q1"
text = "Pick (A) one (B) two"
answer = "A"
grade = 4
exam = "MCAS"
difficulty = [{ grade = 4, percent = 50.0, respondents = 100 }]
"#;
        let err = parse_corpus_str(toml, &PathBuf::from("partial.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("every grade"));
    }

    #[test]
    fn out_of_range_grade_is_rejected() {
        let toml = r#"
[corpus]
id = "g"
name = "G"

[[questions]]
id = "q1"
text = "Pick (A) one (B) two"
answer = "A"
grade = 12
exam = "MCAS"
"#;
        assert!(parse_corpus_str(toml, &PathBuf::from("g.toml")).is_err());
    }

    #[test]
    fn validate_flags_duplicates_and_unknown_exams() {
        let toml = r#"
[corpus]
id = "dupes"
name = "Dupes"

[[questions]]
id = "same"
text = "First (A) x (B) y"
answer = "A"
grade = 4
exam = "Pop Quiz"

[[questions]]
id = "same"
text = "Second (A) x"
answer = "A"
grade = 4
exam = "MCAS"
"#;
        let corpus = parse_corpus_str(toml, &PathBuf::from("dupes.toml")).unwrap();
        let warnings = validate_corpus(&corpus, &ExamCatalog::builtin());
        assert!(warnings.iter().any(|w| w.message.contains("duplicate")));
        assert!(warnings.iter().any(|w| w.message.contains("Pop Quiz")));
        assert!(warnings.iter().any(|w| w.message.contains("1 answer option")));
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        assert!(parse_corpus_str(bad, &PathBuf::from("bad.toml")).is_err());
    }

    #[test]
    fn load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("science.toml"), VALID_TOML).unwrap();
        std::fs::write(dir.path().join("broken.toml"), "not toml [").unwrap();

        let corpora = load_corpus_directory(dir.path()).unwrap();
        assert_eq!(corpora.len(), 1);
        assert_eq!(corpora[0].id, "science");
    }
}
