//! The `adaptiq quiz` command.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use tokio::io::{AsyncBufReadExt, BufReader};

use adaptiq_core::difficulty::SortedNormalPrior;
use adaptiq_core::engine::{Engine, NextQuestion, Selection};
use adaptiq_core::model::{ActiveQuestion, Grade, UserStats};
use adaptiq_providers::{create_similarity_provider, load_config_from};
use adaptiq_store::{FileQuestionRepository, JsonUserStore};

use super::{resolve_data_dir, USERS_DIR};

pub async fn execute(
    corpus: Option<PathBuf>,
    user: String,
    grade: Option<i64>,
    exam: Option<String>,
    config_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    explain: bool,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let corpus = corpus
        .or_else(|| config.corpus.clone())
        .context("no corpus given; pass --corpus or set `corpus` in adaptiq.toml")?;
    let data_dir = resolve_data_dir(data_dir, &config);
    tracing::debug!(
        corpus = %corpus.display(),
        data_dir = %data_dir.display(),
        similarity = ?config.similarity,
        "starting quiz"
    );

    let questions = Arc::new(FileQuestionRepository::open(&corpus, &data_dir)?);
    let users = Arc::new(JsonUserStore::new(data_dir.join(USERS_DIR))?);
    let similarity = create_similarity_provider(&config.similarity)?;
    let engine = Engine::bootstrap(
        questions,
        users,
        similarity,
        &SortedNormalPrior::default(),
        config.engine_config(),
    )
    .await?;

    let first = match (grade, exam) {
        (Some(grade), Some(exam)) => {
            engine
                .start_session(&user, Grade::new(grade)?, &exam)
                .await?
        }
        (None, None) => engine.resume_session(&user).await.with_context(|| {
            format!("cannot resume {user}; pass --grade and --exam to start a new user")
        })?,
        _ => anyhow::bail!("--grade and --exam must be given together"),
    };

    let session = engine.session_state(&user).await?;
    println!(
        "Logged in as {} (grade {}, {}). Answer A-D, `stats`, or `quit`.",
        session.user_id, session.grade, session.preferred_exam
    );
    print_question(&first);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let input = line.trim();
        match input.to_ascii_lowercase().as_str() {
            "" => continue,
            "quit" | "exit" | "q" => break,
            "stats" => {
                print_stats(&engine.user_stats(&user).await?);
                continue;
            }
            _ => {}
        }

        let outcome = match engine.submit_answer(&user, input).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_validation() => {
                println!("{e}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if outcome.correct {
            println!("Correct!");
        } else {
            println!("Incorrect. The answer was {}.", outcome.correct_option);
        }

        match outcome.next {
            NextQuestion::Selected(selection) => {
                if explain {
                    print_breakdown(&selection);
                }
                print_question(&engine.active_question(&user).await?);
            }
            NextQuestion::Exhausted => {
                println!("\nYou have answered every question in the corpus.");
                break;
            }
        }
    }

    let stats = engine.end_session(&user).await?;
    println!("\nSession ended.");
    print_stats(&stats);
    Ok(())
}

fn print_question(question: &ActiveQuestion) {
    println!("\n[{}] {}", question.id, question.text);
    for (letter, text) in &question.options {
        println!("  {letter}) {text}");
    }
}

fn print_stats(stats: &UserStats) {
    println!(
        "Accuracy: {:.1}% over {} answered",
        stats.accuracy * 100.0,
        stats.answered_count
    );
}

fn print_breakdown(selection: &Selection) {
    let b = &selection.breakdown;
    let mut table = Table::new();
    table.set_header(vec!["Term", "Value"]);
    for (term, value) in [
        ("grade", b.grade_term),
        ("last difficulty", b.last_term),
        ("accuracy", b.accuracy_term),
        ("text", b.text_term),
        ("exam", b.exam_term),
        ("total", b.total),
    ] {
        table.add_row(vec![Cell::new(term), Cell::new(format!("{value:.3}"))]);
    }
    println!("\nSelected {} because it scored lowest:\n{table}", selection.question_id);
}
