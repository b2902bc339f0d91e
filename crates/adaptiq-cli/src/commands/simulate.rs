//! The `adaptiq simulate` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use adaptiq_core::corpus::load_corpora;
use adaptiq_core::difficulty::SortedNormalPrior;
use adaptiq_core::engine::{Engine, EngineConfig, NextQuestion};
use adaptiq_core::memory::{InMemoryQuestionRepository, InMemoryUserRepository};
use adaptiq_core::model::{Grade, OptionLetter, Question};
use adaptiq_core::traits::SimilarityProvider;
use adaptiq_core::transcript::{Transcript, TranscriptStep};
use adaptiq_providers::{create_similarity_provider, load_config_from, TokenSortRatio};

const SIMULATED_USER: &str = "simulated-learner";

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    corpus: PathBuf,
    grade: i64,
    exam: String,
    steps: usize,
    accuracy: f64,
    seed: Option<u64>,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(
        (0.0..=1.0).contains(&accuracy),
        "--accuracy must be between 0 and 1 (got {accuracy})"
    );
    let grade = Grade::new(grade)?;

    let (similarity, mut engine_config) = match config_path {
        Some(path) => {
            let config = load_config_from(Some(&path))?;
            (
                create_similarity_provider(&config.similarity)?,
                config.engine_config(),
            )
        }
        None => (
            Arc::new(TokenSortRatio::new()) as Arc<dyn SimilarityProvider>,
            EngineConfig::default(),
        ),
    };
    if seed.is_some() {
        engine_config.seed = seed;
    }

    let questions = load_corpora(&corpus)?
        .into_iter()
        .flat_map(|c| c.questions)
        .collect();
    let engine = Engine::bootstrap(
        Arc::new(InMemoryQuestionRepository::new(questions)),
        Arc::new(InMemoryUserRepository::new()),
        similarity,
        &SortedNormalPrior::default(),
        engine_config,
    )
    .await?;

    let mut learner = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut active = engine.start_session(SIMULATED_USER, grade, &exam).await?;
    let session = engine.session_state(SIMULATED_USER).await?;
    let mut transcript = Transcript::new(SIMULATED_USER, grade, session.preferred_exam);
    transcript.seed = seed;

    for _ in 0..steps {
        let question = engine
            .store()
            .get(&active.id)
            .with_context(|| format!("active question {} missing from store", active.id))?;
        let letter = choose_answer(&question, accuracy, &mut learner);

        let outcome = engine
            .submit_answer(SIMULATED_USER, &letter.to_string())
            .await?;
        let stats = engine.user_stats(SIMULATED_USER).await?;
        let difficulty = engine
            .store()
            .difficulty(&question.id, grade)
            .map(|entry| entry.percent_correct())
            .unwrap_or_default();

        let (next_question_id, next_score) = match &outcome.next {
            NextQuestion::Selected(selection) => (
                Some(selection.question_id.clone()),
                Some(selection.breakdown.total),
            ),
            NextQuestion::Exhausted => (None, None),
        };
        transcript.push(TranscriptStep {
            question_id: question.id.clone(),
            letter,
            correct: outcome.correct,
            accuracy: stats.accuracy,
            difficulty,
            next_question_id,
            next_score,
        });

        match outcome.next {
            NextQuestion::Selected(_) => active = engine.active_question(SIMULATED_USER).await?,
            NextQuestion::Exhausted => {
                println!("Corpus exhausted after {} answer(s).", transcript.steps.len());
                break;
            }
        }
    }

    transcript.final_stats = Some(engine.end_session(SIMULATED_USER).await?);

    print_transcript(&transcript);

    if let Some(path) = output {
        transcript.save_json(&path)?;
        println!("Transcript written to {}", path.display());
    }

    Ok(())
}

/// Answer correctly with probability `accuracy`, otherwise pick a wrong option.
fn choose_answer(question: &Question, accuracy: f64, rng: &mut StdRng) -> OptionLetter {
    if rng.gen_bool(accuracy) {
        return question.correct_option;
    }
    let wrong: Vec<OptionLetter> = question
        .options
        .keys()
        .copied()
        .filter(|l| *l != question.correct_option)
        .collect();
    wrong
        .choose(rng)
        .copied()
        .unwrap_or(question.correct_option)
}

fn print_transcript(transcript: &Transcript) {
    let mut table = Table::new();
    table.set_header(vec![
        "#",
        "Question",
        "Answer",
        "Correct",
        "Accuracy",
        "% correct",
        "Next score",
    ]);
    for (i, step) in transcript.steps.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&step.question_id),
            Cell::new(step.letter),
            Cell::new(if step.correct { "yes" } else { "no" }),
            Cell::new(format!("{:.1}%", step.accuracy * 100.0)),
            Cell::new(format!("{:.1}", step.difficulty)),
            Cell::new(
                step.next_score
                    .map(|s| format!("{s:.2}"))
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }
    println!("{table}");

    println!(
        "\nSimulated {} answer(s) at grade {} ({}): {} correct",
        transcript.steps.len(),
        transcript.grade,
        transcript.preferred_exam,
        transcript.correct_count()
    );
    if let Some(stats) = transcript.final_stats {
        println!("Final accuracy: {:.1}%", stats.accuracy * 100.0);
    }
}
