//! The `adaptiq validate` command.

use std::path::PathBuf;

use anyhow::Result;

use adaptiq_core::corpus::{load_corpora, validate_corpus};
use adaptiq_core::exam::ExamCatalog;

pub fn execute(corpus_path: PathBuf) -> Result<()> {
    let corpora = load_corpora(&corpus_path)?;
    let catalog = ExamCatalog::builtin();

    let mut total_warnings = 0;

    for corpus in &corpora {
        println!(
            "Corpus: {} ({} questions)",
            corpus.name,
            corpus.questions.len()
        );

        let warnings = validate_corpus(corpus, &catalog);
        for w in &warnings {
            let prefix = w
                .question_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All corpora valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
