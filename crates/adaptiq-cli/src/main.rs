//! adaptiq CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "adaptiq", version, about = "Adaptive quiz question selection")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer questions interactively
    Quiz {
        /// Path to .toml corpus or directory (defaults to `corpus` from config)
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// User id to log in as
        #[arg(long)]
        user: String,

        /// Grade level 3-9 (required for a new user)
        #[arg(long)]
        grade: Option<i64>,

        /// Preferred exam (required for a new user)
        #[arg(long)]
        exam: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory for user records and the difficulty journal
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Print the score breakdown of every selected question
        #[arg(long)]
        explain: bool,
    },

    /// Run a synthetic learner through a session
    Simulate {
        /// Path to .toml corpus or directory
        #[arg(long)]
        corpus: PathBuf,

        /// Grade level 3-9
        #[arg(long)]
        grade: i64,

        /// Preferred exam
        #[arg(long)]
        exam: String,

        /// Number of questions to answer
        #[arg(long, default_value = "20")]
        steps: usize,

        /// Probability that the learner answers correctly
        #[arg(long, default_value = "0.7")]
        accuracy: f64,

        /// Seed for the engine and the learner
        #[arg(long)]
        seed: Option<u64>,

        /// Write the transcript as JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path (similarity provider and weights)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show per-grade difficulty statistics for a corpus
    Inspect {
        /// Path to .toml corpus or directory
        #[arg(long)]
        corpus: PathBuf,

        /// Data directory whose difficulty journal is replayed over the corpus
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Show persisted statistics for a user
    Stats {
        /// User id
        #[arg(long)]
        user: String,

        /// Directory for user records
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate corpus TOML files
    Validate {
        /// Path to corpus file or directory
        #[arg(long)]
        corpus: PathBuf,
    },

    /// Create starter config and sample corpus
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("adaptiq=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Quiz {
            corpus,
            user,
            grade,
            exam,
            config,
            data_dir,
            explain,
        } => {
            commands::quiz::execute(corpus, user, grade, exam, config, data_dir, explain).await
        }
        Commands::Simulate {
            corpus,
            grade,
            exam,
            steps,
            accuracy,
            seed,
            output,
            config,
        } => {
            commands::simulate::execute(corpus, grade, exam, steps, accuracy, seed, output, config)
                .await
        }
        Commands::Inspect { corpus, data_dir } => commands::inspect::execute(corpus, data_dir),
        Commands::Stats {
            user,
            data_dir,
            config,
        } => commands::stats::execute(user, data_dir, config),
        Commands::Validate { corpus } => commands::validate::execute(corpus),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
