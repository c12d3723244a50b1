use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::io::AsyncBufRead;

use qbank_core::Clock;
use qbank_core::model::{QuestionFilter, QuizConfig};
use services::stats::CategoryAccuracy;
use services::{
    AccountService, ProgressStore, QuestionRepository, QuizLoopService, SessionContext, summarize,
};
use storage::Storage;

use crate::config::AppConfig;
use crate::prompt::Prompt;
use crate::quiz_loop;

/// Services wired over the configured JSON files.
pub struct App {
    pub config: AppConfig,
    pub accounts: AccountService,
    pub questions: Arc<QuestionRepository>,
    pub quiz: QuizLoopService,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let storage = Storage::json_files(&config.questions_path, &config.users_path);
        let clock = Clock::system();
        let questions = Arc::new(QuestionRepository::new(storage.questions));
        let accounts = AccountService::new(clock, Arc::clone(&storage.users));
        let mut quiz =
            QuizLoopService::new(clock, Arc::clone(&questions), ProgressStore::new(storage.users));
        if let Some(seed) = config.seed {
            quiz = quiz.with_seed(seed);
        }
        Self {
            config,
            accounts,
            questions,
            quiz,
        }
    }

    async fn login<R: AsyncBufRead + Unpin>(
        &self,
        username: &str,
        prompt: &mut Prompt<R>,
    ) -> Result<SessionContext> {
        let password = prompt.require("Password: ").await?;
        self.accounts
            .login(username, &password)
            .await
            .with_context(|| format!("login failed for {username}"))
    }
}

pub async fn signup<R: AsyncBufRead + Unpin>(
    app: &App,
    username: &str,
    prompt: &mut Prompt<R>,
) -> Result<()> {
    let password = prompt.require("Choose a password: ").await?;
    let confirm = prompt.require("Confirm password: ").await?;
    if password != confirm {
        bail!("passwords do not match");
    }
    let account = app
        .accounts
        .create_user(username, &password)
        .await
        .context("could not create account")?;
    println!("Account {} created. You can now start a quiz.", account.username);
    Ok(())
}

pub async fn systems(app: &App) -> Result<()> {
    let bank = app
        .questions
        .load()
        .await
        .with_context(|| format!("loading {}", app.config.questions_path.display()))?;
    println!("{} questions\n\nSystems:", bank.len());
    for system in bank.distinct_systems() {
        println!("  {system}");
    }
    println!("\nSubjects:");
    for subject in bank.distinct_subjects() {
        println!("  {subject}");
    }
    Ok(())
}

pub async fn stats<R: AsyncBufRead + Unpin>(
    app: &App,
    username: &str,
    prompt: &mut Prompt<R>,
) -> Result<()> {
    let ctx = app.login(username, prompt).await?;
    let summary = summarize(ctx.progress());
    let overall = summary.overall;
    println!("Performance for {}", ctx.username());
    println!(
        "  attempted {}  correct {}  incorrect {}  accuracy {:.1}%",
        overall.attempted, overall.correct, overall.incorrect, overall.accuracy
    );
    if overall.attempted == 0 {
        println!("\nNo questions answered yet. Take a quiz to see per-category results.");
        return Ok(());
    }
    print_table("System", summary.systems_with_attempts());
    print_table("Subject", summary.subjects_with_attempts());
    Ok(())
}

fn print_table<'a>(heading: &str, rows: impl Iterator<Item = (&'a str, &'a CategoryAccuracy)>) {
    println!("\n{heading:<28} {:>7} {:>7} {:>9}", "correct", "total", "accuracy");
    for (name, row) in rows {
        println!(
            "{name:<28} {:>7} {:>7} {:>8.1}%",
            row.correct, row.total, row.accuracy
        );
    }
}

/// Selection flags for `quiz`.
pub struct QuizArgs {
    pub num_questions: Option<usize>,
    pub systems: Vec<String>,
    pub subjects: Vec<String>,
    pub filter: QuestionFilter,
}

pub async fn quiz<R: AsyncBufRead + Unpin>(
    app: &App,
    username: &str,
    args: QuizArgs,
    prompt: &mut Prompt<R>,
) -> Result<()> {
    let mut ctx = app.login(username, prompt).await?;
    let config = QuizConfig::new(
        args.num_questions.unwrap_or(app.config.default_num_questions),
        args.systems,
        args.subjects,
        args.filter,
    )?;
    let session = app
        .quiz
        .start_quiz(&ctx, &config)
        .await
        .context("could not start the quiz")?;
    let bank = app.questions.load().await.context("could not load the question bank")?;
    quiz_loop::run(&app.quiz, &bank, &mut ctx, session, prompt).await?;
    app.accounts.logout(ctx).await.context("could not save progress at logout")?;
    Ok(())
}
