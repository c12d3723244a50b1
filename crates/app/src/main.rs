//! qbank: terminal front end for the question-bank quiz engine.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use qbank_core::model::QuestionFilter;

mod commands;
mod config;
mod logging;
mod prompt;
mod quiz_loop;

use commands::{App, QuizArgs};
use config::{AppConfig, Overrides};
use prompt::Prompt;

#[derive(Parser)]
#[command(
    name = "qbank",
    version,
    about = "Self-quiz over a tagged multiple-choice question bank"
)]
struct Cli {
    /// Config file (default: ./qbank.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Question bank JSON file
    #[arg(long, global = true)]
    questions: Option<PathBuf>,

    /// User store JSON file
    #[arg(long, global = true)]
    users: Option<PathBuf>,

    /// Seed for question sampling
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Log filter when RUST_LOG is unset (e.g. "debug", "services=debug")
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account
    Signup {
        username: String,
    },

    /// List the systems and subjects in the bank
    Systems,

    /// Show accuracy overall and per system and subject
    Stats {
        username: String,
    },

    /// Take a quiz
    Quiz {
        username: String,

        /// Number of questions (default from config)
        #[arg(short = 'n', long)]
        num_questions: Option<usize>,

        /// Restrict to a system; repeat for several
        #[arg(long = "system")]
        systems: Vec<String>,

        /// Restrict to a subject; repeat for several
        #[arg(long = "subject")]
        subjects: Vec<String>,

        /// unused, marked, incorrect or all
        #[arg(long, default_value = "unused")]
        filter: QuestionFilter,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let overrides = Overrides {
        questions_path: cli.questions,
        users_path: cli.users,
        log_filter: cli.log,
        seed: cli.seed,
    };
    let config = AppConfig::resolve(cli.config.as_deref(), overrides)?;
    logging::init(&config.log_filter);
    tracing::debug!(?config, "configuration resolved");

    let app = App::new(config);
    let mut prompt = Prompt::stdin();
    match cli.command {
        Command::Signup { username } => commands::signup(&app, &username, &mut prompt).await,
        Command::Systems => commands::systems(&app).await,
        Command::Stats { username } => commands::stats(&app, &username, &mut prompt).await,
        Command::Quiz {
            username,
            num_questions,
            systems,
            subjects,
            filter,
        } => {
            let args = QuizArgs {
                num_questions,
                systems,
                subjects,
                filter,
            };
            commands::quiz(&app, &username, args, &mut prompt).await
        }
    }
}
