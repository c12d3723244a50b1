use rand::Rng;
use rand::seq::index;

use qbank_core::model::{Question, QuestionFilter, QuizConfig, UserProgress};

use crate::error::SessionError;

/// Questions chosen for one quiz.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizPlan {
    pub questions: Vec<Question>,
    /// Candidates that passed the category and history filters, before sampling.
    pub matched: usize,
}

impl QuizPlan {
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Returns true when sampling dropped some candidates.
    #[must_use]
    pub fn was_sampled(&self) -> bool {
        self.matched > self.questions.len()
    }
}

/// Filters the bank by category and history, then samples down to size.
pub struct QuizSelector;

impl QuizSelector {
    /// Build a plan from `questions` for `config`.
    ///
    /// Filtering is deterministic. When more questions match than requested, a
    /// uniform sample without replacement is drawn from `rng`; otherwise every
    /// match is returned in bank order.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoMatchingQuestions` if nothing survives the
    /// filters.
    pub fn select<R: Rng + ?Sized>(
        questions: &[Question],
        config: &QuizConfig,
        progress: &UserProgress,
        rng: &mut R,
    ) -> Result<QuizPlan, SessionError> {
        let candidates: Vec<&Question> = questions
            .iter()
            .filter(|q| config.allows_system(q.system()) && config.allows_subject(q.subject()))
            .filter(|q| matches_history(q, config.question_filter(), progress))
            .collect();

        let matched = candidates.len();
        if matched == 0 {
            tracing::debug!(filter = %config.question_filter(), "no questions matched");
            return Err(SessionError::NoMatchingQuestions);
        }

        let wanted = config.num_questions();
        let chosen: Vec<Question> = if matched > wanted {
            index::sample(rng, matched, wanted)
                .into_iter()
                .map(|i| candidates[i].clone())
                .collect()
        } else {
            candidates.into_iter().cloned().collect()
        };

        tracing::debug!(
            matched,
            selected = chosen.len(),
            filter = %config.question_filter(),
            "questions selected"
        );
        Ok(QuizPlan {
            questions: chosen,
            matched,
        })
    }
}

fn matches_history(question: &Question, filter: QuestionFilter, progress: &UserProgress) -> bool {
    let id = question.id();
    match filter {
        QuestionFilter::Unused => !progress.is_attempted(id),
        QuestionFilter::Marked => progress.is_marked(id),
        QuestionFilter::Incorrect => progress.is_incorrect(id),
        QuestionFilter::All => true,
    }
}
