//! The `adaptiq inspect` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use adaptiq_core::corpus::load_corpora;
use adaptiq_core::statistics::CorpusStats;
use adaptiq_core::store::QuestionStore;
use adaptiq_core::traits::StoredQuestion;
use adaptiq_store::questions::JOURNAL_FILE;
use adaptiq_store::DifficultyJournal;

pub fn execute(corpus_path: PathBuf, data_dir: Option<PathBuf>) -> Result<()> {
    let mut questions: Vec<StoredQuestion> = load_corpora(&corpus_path)?
        .into_iter()
        .flat_map(|c| c.questions)
        .collect();

    if let Some(dir) = data_dir {
        let journal_path = dir.join(JOURNAL_FILE);
        if journal_path.exists() {
            let replay = DifficultyJournal::open(&journal_path)?.replay_onto(&mut questions)?;
            println!(
                "Replayed {}: {} seed(s), {} update(s), {} skipped",
                journal_path.display(),
                replay.seeds,
                replay.updates,
                replay.unknown + replay.corrupt
            );
        } else {
            println!("No difficulty journal in {}", dir.display());
        }
    }

    let unseeded = questions.iter().filter(|q| q.difficulty.is_none()).count();

    // Authored counts cover every question; difficulty only those with data.
    let all = CorpusStats::compute(&QuestionStore::new(
        questions
            .iter()
            .map(|q| (q.question.clone(), q.difficulty.unwrap_or_default())),
    )?);
    let seeded = CorpusStats::compute(&QuestionStore::new(
        questions
            .into_iter()
            .filter_map(|q| q.difficulty.map(|d| (q.question, d))),
    )?);

    println!("Questions: {}", all.total_questions);
    if unseeded > 0 {
        println!("{unseeded} question(s) have no difficulty data yet");
    }

    let mut table = Table::new();
    table.set_header(vec!["Grade", "Authored", "Mean % correct", "Respondents"]);
    for (authored, measured) in all.per_grade.iter().zip(&seeded.per_grade) {
        let mean = if seeded.total_questions == 0 {
            "-".to_string()
        } else {
            format!("{:.1}", measured.mean_percent_correct)
        };
        table.add_row(vec![
            Cell::new(authored.grade),
            Cell::new(authored.questions),
            Cell::new(mean),
            Cell::new(measured.total_respondents),
        ]);
    }
    println!("\n{table}");

    let mut exams = Table::new();
    exams.set_header(vec!["Exam", "Questions"]);
    for (exam, count) in &all.per_exam {
        exams.add_row(vec![Cell::new(exam), Cell::new(count)]);
    }
    println!("\n{exams}");

    Ok(())
}
