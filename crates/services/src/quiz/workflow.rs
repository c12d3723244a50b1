use std::sync::{Arc, Mutex, PoisonError};

use rand::SeedableRng;
use rand::rngs::StdRng;

use qbank_core::Clock;
use qbank_core::model::{OptionLetter, QuizConfig};

use super::selector::QuizSelector;
use super::session::{AnswerFeedback, QuizOutcome, QuizSession};
use crate::context::SessionContext;
use crate::error::SessionError;
use crate::progress::ProgressStore;
use crate::questions::QuestionRepository;

/// Orchestrates quiz start, answering, and the checkpoints around a session.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    questions: Arc<QuestionRepository>,
    progress: ProgressStore,
    rng: Arc<Mutex<StdRng>>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(clock: Clock, questions: Arc<QuestionRepository>, progress: ProgressStore) -> Self {
        Self {
            clock,
            questions,
            progress,
            rng: Arc::new(Mutex::new(StdRng::from_os_rng())),
        }
    }

    /// Use a deterministic sampler.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Arc::new(Mutex::new(StdRng::seed_from_u64(seed)));
        self
    }

    /// Select questions for `config` and open a session at the first one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Load` if the bank is unavailable, `Config` if
    /// more questions are requested than the bank holds, or
    /// `NoMatchingQuestions` if the filters leave nothing.
    pub async fn start_quiz(
        &self,
        ctx: &SessionContext,
        config: &QuizConfig,
    ) -> Result<QuizSession, SessionError> {
        let bank = self.questions.load().await?;
        config.check_bank_size(bank.len())?;

        let plan = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            QuizSelector::select(bank.questions(), config, ctx.progress(), &mut *rng)?
        };
        tracing::info!(
            username = %ctx.username(),
            questions = plan.total(),
            matched = plan.matched,
            filter = %config.question_filter(),
            "quiz started"
        );
        Ok(QuizSession::new(plan.questions, self.clock.now()))
    }

    /// Submit `letter` for the current question, scoring into the context.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` if the session rejects the
    /// answer; nothing changes in that case.
    pub fn answer(
        &self,
        session: &mut QuizSession,
        ctx: &mut SessionContext,
        letter: OptionLetter,
    ) -> Result<AnswerFeedback, SessionError> {
        let result = session.submit_answer(ctx.progress_mut(), letter);
        result.map_err(|err| {
            tracing::warn!(error = %err, position = session.position(), "answer rejected");
            err.into()
        })
    }

    /// Checkpoint when the user walks away from a session still in progress.
    ///
    /// Session marks are folded into the persistent marked set first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Persistence` if the save fails. In-memory
    /// progress is kept, so the call can be retried.
    pub async fn leave(
        &self,
        session: &QuizSession,
        ctx: &mut SessionContext,
    ) -> Result<(), SessionError> {
        ctx.progress_mut().merge_marks(session.marked_in_session());
        self.progress.checkpoint(ctx).await?;
        tracing::info!(
            username = %ctx.username(),
            position = session.position(),
            "left quiz"
        );
        Ok(())
    }

    /// Finish the session, checkpoint, and report the outcome.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Persistence` if the save fails. The session is
    /// still finished and its outcome can be read with
    /// [`QuizSession::outcome`]; retry the save with
    /// [`QuizLoopService::checkpoint`].
    pub async fn end_quiz(
        &self,
        session: &mut QuizSession,
        ctx: &mut SessionContext,
    ) -> Result<QuizOutcome, SessionError> {
        session.end();
        ctx.progress_mut().merge_marks(session.marked_in_session());
        self.progress.checkpoint(ctx).await?;

        let outcome = session.outcome(&self.clock)?;
        tracing::info!(
            username = %ctx.username(),
            score = outcome.score,
            total = outcome.total,
            elapsed_secs = outcome.elapsed.num_seconds(),
            "quiz finished"
        );
        Ok(outcome)
    }

    /// Save the context's progress without touching any session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Persistence` if the save fails.
    pub async fn checkpoint(&self, ctx: &SessionContext) -> Result<(), SessionError> {
        self.progress.checkpoint(ctx).await?;
        Ok(())
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qbank_core::model::{
        PasswordHash, Question, QuestionDraft, QuestionFilter, QuestionId, UserAccount,
        UserProgress, Username,
    };
    use qbank_core::time::{fixed_clock, fixed_now};
    use storage::{InMemoryRepository, UserDirectory, UserStore};

    fn questions(len: usize) -> Vec<Question> {
        (0..len)
            .map(|i| {
                QuestionDraft {
                    id: QuestionId::new(format!("{i}")),
                    question: format!("Question {i}"),
                    options: vec!["a".into(), "b".into()],
                    answer: "A".into(),
                    system: Some("Neuro".into()),
                    subject: Some("Anatomy".into()),
                    ..QuestionDraft::default()
                }
                .validate()
                .unwrap()
            })
            .collect()
    }

    async fn setup(len: usize) -> (QuizLoopService, SessionContext, InMemoryRepository) {
        let repo = InMemoryRepository::with_questions(questions(len));
        let name = Username::new("dee").unwrap();
        let mut users = UserDirectory::new();
        users.insert(
            name.clone(),
            UserAccount::new(name.clone(), PasswordHash::new("h"), fixed_now()),
        );
        repo.write_all(&users).await.unwrap();

        let service = QuizLoopService::new(
            fixed_clock(),
            Arc::new(QuestionRepository::new(Arc::new(repo.clone()))),
            ProgressStore::new(Arc::new(repo.clone())),
        )
        .with_seed(7);
        let ctx = SessionContext::new(name, UserProgress::new(), fixed_now());
        (service, ctx, repo)
    }

    #[tokio::test]
    async fn quiz_over_the_whole_bank_contains_every_question() {
        let (service, ctx, _repo) = setup(5).await;
        let config = QuizConfig::unrestricted(5, QuestionFilter::All).unwrap();
        let session = service.start_quiz(&ctx, &config).await.unwrap();

        let mut got: Vec<_> = session.questions().iter().map(|q| q.id().clone()).collect();
        got.sort();
        let want: Vec<_> = (0..5).map(|i| QuestionId::new(i.to_string())).collect();
        assert_eq!(got, want);
    }

    #[tokio::test]
    async fn requesting_more_than_the_bank_is_a_config_error() {
        let (service, ctx, _repo) = setup(3).await;
        let config = QuizConfig::unrestricted(4, QuestionFilter::All).unwrap();
        let err = service.start_quiz(&ctx, &config).await.unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
    }

    #[tokio::test]
    async fn ending_early_checkpoints_answers_and_marks() {
        let (service, mut ctx, repo) = setup(10).await;
        let config = QuizConfig::unrestricted(10, QuestionFilter::All).unwrap();
        let mut session = service.start_quiz(&ctx, &config).await.unwrap();
        let a: OptionLetter = "A".parse().unwrap();

        service.answer(&mut session, &mut ctx, a).unwrap();
        session.toggle_mark().unwrap();
        session.advance().unwrap();
        service.answer(&mut session, &mut ctx, a).unwrap();
        session.advance().unwrap();

        let outcome = service.end_quiz(&mut session, &mut ctx).await.unwrap();
        assert_eq!((outcome.score, outcome.total), (2, 10));
        assert!((outcome.percentage - 20.0).abs() < f64::EPSILON);

        let stored = &repo.read_all().await.unwrap()[ctx.username()];
        assert_eq!(stored.progress.attempted().len(), 2);
        assert_eq!(stored.progress.marked().len(), 1);
        assert_eq!(stored.progress, *ctx.progress());
    }

    #[tokio::test]
    async fn rejected_answer_surfaces_as_invalid_transition() {
        let (service, mut ctx, _repo) = setup(2).await;
        let config = QuizConfig::unrestricted(2, QuestionFilter::All).unwrap();
        let mut session = service.start_quiz(&ctx, &config).await.unwrap();
        let b: OptionLetter = "B".parse().unwrap();

        service.answer(&mut session, &mut ctx, b).unwrap();
        let err = service.answer(&mut session, &mut ctx, b).unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition(_)));
        assert_eq!(ctx.progress().incorrect().len(), 1);
    }
}
