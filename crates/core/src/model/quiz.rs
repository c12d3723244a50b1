use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizConfigError {
    #[error("a quiz needs at least one question")]
    ZeroQuestions,

    #[error("requested {requested} questions but the bank only has {available}")]
    ExceedsBank { requested: usize, available: usize },

    #[error("unknown question filter {0:?} (expected unused, marked, incorrect or all)")]
    UnknownFilter(String),
}

/// Which part of the user's history a quiz draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionFilter {
    /// Questions the user has never attempted.
    #[default]
    Unused,
    /// Questions flagged for review.
    Marked,
    /// Questions whose latest answer was wrong.
    Incorrect,
    All,
}

impl QuestionFilter {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionFilter::Unused => "unused",
            QuestionFilter::Marked => "marked",
            QuestionFilter::Incorrect => "incorrect",
            QuestionFilter::All => "all",
        }
    }
}

impl fmt::Display for QuestionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionFilter {
    type Err = QuizConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unused" => Ok(Self::Unused),
            "marked" => Ok(Self::Marked),
            "incorrect" => Ok(Self::Incorrect),
            "all" => Ok(Self::All),
            _ => Err(QuizConfigError::UnknownFilter(s.to_owned())),
        }
    }
}

/// Selection criteria for one quiz. Fixed for the lifetime of the session.
///
/// Empty category sets mean "every category".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizConfig {
    num_questions: usize,
    selected_systems: BTreeSet<String>,
    selected_subjects: BTreeSet<String>,
    question_filter: QuestionFilter,
}

impl QuizConfig {
    /// # Errors
    ///
    /// Returns `QuizConfigError::ZeroQuestions` if `num_questions == 0`.
    pub fn new(
        num_questions: usize,
        selected_systems: impl IntoIterator<Item = String>,
        selected_subjects: impl IntoIterator<Item = String>,
        question_filter: QuestionFilter,
    ) -> Result<Self, QuizConfigError> {
        if num_questions == 0 {
            return Err(QuizConfigError::ZeroQuestions);
        }
        Ok(Self {
            num_questions,
            selected_systems: selected_systems.into_iter().collect(),
            selected_subjects: selected_subjects.into_iter().collect(),
            question_filter,
        })
    }

    /// Every category, with the given filter.
    ///
    /// # Errors
    ///
    /// Returns `QuizConfigError::ZeroQuestions` if `num_questions == 0`.
    pub fn unrestricted(
        num_questions: usize,
        question_filter: QuestionFilter,
    ) -> Result<Self, QuizConfigError> {
        Self::new(num_questions, [], [], question_filter)
    }

    /// Reject configurations asking for more questions than the bank holds.
    ///
    /// # Errors
    ///
    /// Returns `QuizConfigError::ExceedsBank` when `num_questions > bank_len`.
    pub fn check_bank_size(&self, bank_len: usize) -> Result<(), QuizConfigError> {
        if self.num_questions > bank_len {
            return Err(QuizConfigError::ExceedsBank {
                requested: self.num_questions,
                available: bank_len,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn num_questions(&self) -> usize {
        self.num_questions
    }

    #[must_use]
    pub fn selected_systems(&self) -> &BTreeSet<String> {
        &self.selected_systems
    }

    #[must_use]
    pub fn selected_subjects(&self) -> &BTreeSet<String> {
        &self.selected_subjects
    }

    #[must_use]
    pub fn question_filter(&self) -> QuestionFilter {
        self.question_filter
    }

    #[must_use]
    pub fn allows_system(&self, system: &str) -> bool {
        self.selected_systems.is_empty() || self.selected_systems.contains(system)
    }

    #[must_use]
    pub fn allows_subject(&self, subject: &str) -> bool {
        self.selected_subjects.is_empty() || self.selected_subjects.contains(subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_parses_and_displays() {
        for filter in [
            QuestionFilter::Unused,
            QuestionFilter::Marked,
            QuestionFilter::Incorrect,
            QuestionFilter::All,
        ] {
            assert_eq!(filter.as_str().parse::<QuestionFilter>().unwrap(), filter);
        }
        assert_eq!(" ALL ".parse::<QuestionFilter>().unwrap(), QuestionFilter::All);
        assert!("recent".parse::<QuestionFilter>().is_err());
    }

    #[test]
    fn zero_questions_is_rejected() {
        let err = QuizConfig::unrestricted(0, QuestionFilter::All).unwrap_err();
        assert_eq!(err, QuizConfigError::ZeroQuestions);
    }

    #[test]
    fn bank_size_bounds_request() {
        let config = QuizConfig::unrestricted(20, QuestionFilter::All).unwrap();
        assert!(config.check_bank_size(20).is_ok());
        assert_eq!(
            config.check_bank_size(5).unwrap_err(),
            QuizConfigError::ExceedsBank {
                requested: 20,
                available: 5
            }
        );
    }

    #[test]
    fn empty_category_sets_allow_everything() {
        let open = QuizConfig::unrestricted(5, QuestionFilter::All).unwrap();
        assert!(open.allows_system("Renal"));

        let narrowed =
            QuizConfig::new(5, ["Renal".to_owned()], [], QuestionFilter::All).unwrap();
        assert!(narrowed.allows_system("Renal"));
        assert!(!narrowed.allows_system("Neuro"));
        assert!(narrowed.allows_subject("Anatomy"));
    }
}
