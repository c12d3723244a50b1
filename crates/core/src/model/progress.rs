use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::question::Question;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("question {0} is recorded as both correct and incorrect")]
    CorrectAndIncorrect(QuestionId),

    #[error("question {0} is recorded as answered but not as attempted")]
    NotAttempted(QuestionId),

    #[error("category {category:?} has {correct} correct answers out of {total}")]
    CounterMismatch {
        category: String,
        correct: u32,
        total: u32,
    },
}

//
// ─── CATEGORY STATS ────────────────────────────────────────────────────────────
//

/// Running answer counts for one system or subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CategoryStats {
    correct: u32,
    total: u32,
}

impl CategoryStats {
    /// Rehydrate persisted counters.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::CounterMismatch` if `correct > total`.
    pub fn from_persisted(
        category: &str,
        correct: u32,
        total: u32,
    ) -> Result<Self, ProgressError> {
        if correct > total {
            return Err(ProgressError::CounterMismatch {
                category: category.to_owned(),
                correct,
                total,
            });
        }
        Ok(Self { correct, total })
    }

    /// Count one answer. `total` always moves, `correct` only on a hit.
    pub fn record(&mut self, is_correct: bool) {
        self.total = self.total.saturating_add(1);
        if is_correct {
            self.correct = self.correct.saturating_add(1);
        }
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Percentage of correct answers; 0 when nothing was answered.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        percentage(self.correct, self.total)
    }
}

/// `part / whole * 100`, defined as 0 for an empty whole.
#[must_use]
pub fn percentage(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        f64::from(part) / f64::from(whole) * 100.0
    }
}

pub type CategoryTable = BTreeMap<String, CategoryStats>;

//
// ─── USER PROGRESS ─────────────────────────────────────────────────────────────
//

/// Persisted progress fields before invariant checks.
#[derive(Debug, Clone, Default)]
pub struct ProgressParts {
    pub attempted: BTreeSet<QuestionId>,
    pub correct: BTreeSet<QuestionId>,
    pub incorrect: BTreeSet<QuestionId>,
    pub marked: BTreeSet<QuestionId>,
    pub performance_by_system: CategoryTable,
    pub performance_by_subject: CategoryTable,
}

/// Cumulative record of everything a user has answered.
///
/// `correct` and `incorrect` are disjoint subsets of `attempted`. The only way
/// to score an answer is [`UserProgress::record_answer`], which moves set
/// membership and both category tables together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProgress {
    attempted: BTreeSet<QuestionId>,
    correct: BTreeSet<QuestionId>,
    incorrect: BTreeSet<QuestionId>,
    marked: BTreeSet<QuestionId>,
    performance_by_system: CategoryTable,
    performance_by_subject: CategoryTable,
}

impl UserProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild progress from storage, re-checking every invariant.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the sets overlap, an answered id is missing
    /// from `attempted`, or a category has more correct answers than total.
    pub fn from_persisted(parts: ProgressParts) -> Result<Self, ProgressError> {
        let progress = Self {
            attempted: parts.attempted,
            correct: parts.correct,
            incorrect: parts.incorrect,
            marked: parts.marked,
            performance_by_system: parts.performance_by_system,
            performance_by_subject: parts.performance_by_subject,
        };
        progress.check_invariants()?;
        Ok(progress)
    }

    /// # Errors
    ///
    /// Returns the first violated invariant, if any.
    pub fn check_invariants(&self) -> Result<(), ProgressError> {
        if let Some(id) = self.correct.intersection(&self.incorrect).next() {
            return Err(ProgressError::CorrectAndIncorrect(id.clone()));
        }
        if let Some(id) = self
            .correct
            .union(&self.incorrect)
            .find(|id| !self.attempted.contains(*id))
        {
            return Err(ProgressError::NotAttempted(id.clone()));
        }
        for (category, stats) in self
            .performance_by_system
            .iter()
            .chain(self.performance_by_subject.iter())
        {
            if stats.correct > stats.total {
                return Err(ProgressError::CounterMismatch {
                    category: category.clone(),
                    correct: stats.correct,
                    total: stats.total,
                });
            }
        }
        Ok(())
    }

    /// Score one answer to `question`.
    ///
    /// The id joins `attempted` and moves to `correct` or `incorrect`, leaving
    /// the other set. Both the system and subject counters record the answer.
    pub fn record_answer(&mut self, question: &Question, is_correct: bool) {
        let id = question.id();
        self.attempted.insert(id.clone());
        if is_correct {
            self.incorrect.remove(id);
            self.correct.insert(id.clone());
        } else {
            self.correct.remove(id);
            self.incorrect.insert(id.clone());
        }

        self.performance_by_system
            .entry(question.system().to_owned())
            .or_default()
            .record(is_correct);
        self.performance_by_subject
            .entry(question.subject().to_owned())
            .or_default()
            .record(is_correct);
    }

    /// Flag a question for later review. Returns `true` if it was not marked.
    pub fn mark(&mut self, id: QuestionId) -> bool {
        self.marked.insert(id)
    }

    /// Returns `true` if the question was marked.
    pub fn unmark(&mut self, id: &QuestionId) -> bool {
        self.marked.remove(id)
    }

    /// Add every id in `ids` to the persistent marked set.
    pub fn merge_marks<'a>(&mut self, ids: impl IntoIterator<Item = &'a QuestionId>) {
        self.marked.extend(ids.into_iter().cloned());
    }

    #[must_use]
    pub fn is_attempted(&self, id: &QuestionId) -> bool {
        self.attempted.contains(id)
    }

    #[must_use]
    pub fn is_marked(&self, id: &QuestionId) -> bool {
        self.marked.contains(id)
    }

    #[must_use]
    pub fn is_incorrect(&self, id: &QuestionId) -> bool {
        self.incorrect.contains(id)
    }

    #[must_use]
    pub fn attempted(&self) -> &BTreeSet<QuestionId> {
        &self.attempted
    }

    #[must_use]
    pub fn correct(&self) -> &BTreeSet<QuestionId> {
        &self.correct
    }

    #[must_use]
    pub fn incorrect(&self) -> &BTreeSet<QuestionId> {
        &self.incorrect
    }

    #[must_use]
    pub fn marked(&self) -> &BTreeSet<QuestionId> {
        &self.marked
    }

    #[must_use]
    pub fn performance_by_system(&self) -> &CategoryTable {
        &self.performance_by_system
    }

    #[must_use]
    pub fn performance_by_subject(&self) -> &CategoryTable {
        &self.performance_by_subject
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
