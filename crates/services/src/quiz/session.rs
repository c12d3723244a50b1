use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};

use qbank_core::Clock;
use qbank_core::model::{OptionLetter, Question, QuestionId, UserProgress, percentage};

use crate::error::InvalidTransition;

//
// ─── STATUS & RESULTS ──────────────────────────────────────────────────────────
//

/// Where a session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizStatus {
    Active { index: usize },
    Finished,
}

/// What happened when an answer was submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub question_id: QuestionId,
    pub selected: OptionLetter,
    pub correct_answer: OptionLetter,
    pub is_correct: bool,
    /// False when this question was already scored earlier in the session.
    pub scored: bool,
}

/// A question flagged during the session, with its 0-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedQuestion {
    pub position: usize,
    pub id: QuestionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceBand {
    Excellent,
    Good,
    NeedsPractice,
}

impl PerformanceBand {
    #[must_use]
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 70.0 {
            Self::Excellent
        } else if percentage >= 50.0 {
            Self::Good
        } else {
            Self::NeedsPractice
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent work!",
            Self::Good => "Good effort!",
            Self::NeedsPractice => "Keep practicing!",
        }
    }
}

/// Final figures for a finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizOutcome {
    pub score: usize,
    /// Session length, regardless of how far the user got.
    pub total: usize,
    pub percentage: f64,
    pub elapsed: Duration,
    pub marked: Vec<MarkedQuestion>,
    pub band: PerformanceBand,
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Per-run counters. Replaced wholesale on restart.
#[derive(Debug, Clone)]
struct QuizState {
    current_index: usize,
    score: usize,
    answered: bool,
    selected_option: Option<OptionLetter>,
    marked_in_session: BTreeSet<QuestionId>,
    start_time: DateTime<Utc>,
}

impl QuizState {
    fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            current_index: 0,
            score: 0,
            answered: false,
            selected_option: None,
            marked_in_session: BTreeSet::new(),
            start_time,
        }
    }

    fn move_to(&mut self, index: usize) {
        self.current_index = index;
        self.answered = false;
        self.selected_option = None;
    }
}

/// One run through a fixed list of questions.
///
/// Every mutator checks the current state first and returns
/// `InvalidTransition` without touching anything when the move is not allowed.
/// `score` never exceeds the index reached: each position is scored at most
/// once per run, on its first answer.
#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<Question>,
    state: QuizState,
    finished: bool,
    first_answers: BTreeMap<usize, OptionLetter>,
}

impl QuizSession {
    #[must_use]
    pub fn new(questions: Vec<Question>, started_at: DateTime<Utc>) -> Self {
        Self {
            finished: questions.is_empty(),
            questions,
            state: QuizState::new(started_at),
            first_answers: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn status(&self) -> QuizStatus {
        if self.finished {
            QuizStatus::Finished
        } else {
            QuizStatus::Active {
                index: self.state.current_index,
            }
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// The question under the pointer; `None` once finished.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.finished {
            return None;
        }
        self.questions.get(self.state.current_index)
    }

    /// 0-based index of the pointer.
    #[must_use]
    pub fn position(&self) -> usize {
        self.state.current_index
    }

    /// Share of the session already passed, in `0.0..=1.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_fraction(&self) -> f64 {
        if self.questions.is_empty() || self.finished {
            return 1.0;
        }
        self.state.current_index as f64 / self.questions.len() as f64
    }

    #[must_use]
    pub fn score(&self) -> usize {
        self.state.score
    }

    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.state.answered
    }

    #[must_use]
    pub fn selected_option(&self) -> Option<OptionLetter> {
        self.state.selected_option
    }

    /// Option chosen the first time the given position was answered this run.
    #[must_use]
    pub fn first_answer(&self, position: usize) -> Option<OptionLetter> {
        self.first_answers.get(&position).copied()
    }

    #[must_use]
    pub fn is_marked(&self, id: &QuestionId) -> bool {
        self.state.marked_in_session.contains(id)
    }

    #[must_use]
    pub fn marked_in_session(&self) -> &BTreeSet<QuestionId> {
        &self.state.marked_in_session
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.state.start_time
    }

    /// Record `letter` for the current question and score it into `progress`.
    ///
    /// A position that was already answered earlier in this run is shown as
    /// answered again but neither `score` nor `progress` changes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition::Finished`, `AlreadyAnswered`, or
    /// `UnknownOption` if `letter` is not one of the question's options.
    pub fn submit_answer(
        &mut self,
        progress: &mut UserProgress,
        letter: OptionLetter,
    ) -> Result<AnswerFeedback, InvalidTransition> {
        let index = self.state.current_index;
        let question = self.active_question()?;
        if self.state.answered {
            return Err(InvalidTransition::AlreadyAnswered);
        }
        if !question.has_option(letter) {
            return Err(InvalidTransition::UnknownOption(letter));
        }

        let is_correct = question.is_correct(letter);
        let scored = !self.first_answers.contains_key(&index);
        if scored {
            progress.record_answer(question, is_correct);
        }
        let feedback = AnswerFeedback {
            question_id: question.id().clone(),
            selected: letter,
            correct_answer: question.answer(),
            is_correct,
            scored,
        };

        if scored {
            self.first_answers.insert(index, letter);
            if is_correct {
                self.state.score += 1;
            }
        }
        self.state.answered = true;
        self.state.selected_option = Some(letter);
        tracing::debug!(
            question = %feedback.question_id,
            index,
            is_correct,
            scored,
            "answer submitted"
        );
        Ok(feedback)
    }

    /// Flip the session mark on the current question. Returns the new state.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition::Finished` once the session is over.
    pub fn toggle_mark(&mut self) -> Result<bool, InvalidTransition> {
        let id = self.active_question()?.id().clone();
        let marked = &mut self.state.marked_in_session;
        if marked.remove(&id) {
            Ok(false)
        } else {
            marked.insert(id);
            Ok(true)
        }
    }

    /// Move to the next question, finishing after the last one.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition::Finished`, or `NotAnswered` if the current
    /// question has no answer yet.
    pub fn advance(&mut self) -> Result<QuizStatus, InvalidTransition> {
        self.active_question()?;
        if !self.state.answered {
            return Err(InvalidTransition::NotAnswered);
        }
        let next = self.state.current_index + 1;
        self.state.move_to(next);
        if next >= self.questions.len() {
            self.finished = true;
            tracing::debug!(score = self.state.score, "last question passed");
        }
        Ok(self.status())
    }

    /// Move back one question.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition::Finished`, or `AtFirstQuestion` at index 0.
    pub fn retreat(&mut self) -> Result<QuizStatus, InvalidTransition> {
        self.active_question()?;
        let Some(previous) = self.state.current_index.checked_sub(1) else {
            return Err(InvalidTransition::AtFirstQuestion);
        };
        self.state.move_to(previous);
        Ok(self.status())
    }

    /// Move the pointer to any position in the session.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition::Finished`, or `OutOfRange` if `target` is
    /// not a position in this session.
    pub fn jump_to(&mut self, target: usize) -> Result<QuizStatus, InvalidTransition> {
        self.active_question()?;
        let len = self.questions.len();
        if target >= len {
            return Err(InvalidTransition::OutOfRange { target, len });
        }
        self.state.move_to(target);
        Ok(self.status())
    }

    /// Finish now, wherever the pointer is. Idempotent.
    pub fn end(&mut self) {
        if !self.finished {
            tracing::debug!(
                index = self.state.current_index,
                score = self.state.score,
                "session ended early"
            );
        }
        self.finished = true;
    }

    /// Run the same questions again from a fresh state.
    pub fn restart(&mut self, now: DateTime<Utc>) {
        self.state = QuizState::new(now);
        self.first_answers.clear();
        self.finished = self.questions.is_empty();
    }

    /// Final figures. Only available once finished.
    ///
    /// `elapsed` runs from the session start to the clock's now, clamped at
    /// zero.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition::StillActive` before the session finishes.
    pub fn outcome(&self, clock: &Clock) -> Result<QuizOutcome, InvalidTransition> {
        if !self.finished {
            return Err(InvalidTransition::StillActive);
        }
        let total = self.questions.len();
        let score = self.state.score;
        let percentage = percentage(
            u32::try_from(score).unwrap_or(u32::MAX),
            u32::try_from(total).unwrap_or(u32::MAX),
        );
        let elapsed = clock.elapsed_since(self.state.start_time);
        let marked = self
            .questions
            .iter()
            .enumerate()
            .filter(|(_, q)| self.state.marked_in_session.contains(q.id()))
            .map(|(position, q)| MarkedQuestion {
                position,
                id: q.id().clone(),
            })
            .collect();

        Ok(QuizOutcome {
            score,
            total,
            percentage,
            elapsed,
            marked,
            band: PerformanceBand::from_percentage(percentage),
        })
    }

    fn active_question(&self) -> Result<&Question, InvalidTransition> {
        self.current_question().ok_or(InvalidTransition::Finished)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
