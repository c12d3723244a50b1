use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::model::ids::QuestionId;

/// Category value used when a question omits its system, subject or topic.
pub const DEFAULT_CATEGORY: &str = "General";

/// Options are addressed by a single letter, so a question carries at most 26.
pub const MAX_OPTIONS: usize = 26;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OptionLetterError {
    #[error("option letter must be a single letter A-Z, got {0:?}")]
    Invalid(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question id cannot be empty")]
    EmptyId,

    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question must have at least one option")]
    NoOptions,

    #[error("question has {0} options, at most 26 are supported")]
    TooManyOptions(usize),

    #[error("answer {answer} does not match any of the {options} options")]
    AnswerOutOfRange { answer: OptionLetter, options: usize },

    #[error(transparent)]
    InvalidAnswer(#[from] OptionLetterError),
}

//
// ─── OPTION LETTER ─────────────────────────────────────────────────────────────
//

/// Letter naming one option of a question: `A` is index 0, `B` index 1, ...
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionLetter(u8);

impl OptionLetter {
    /// Letter for the option at `index`, if it is addressable.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index)
            .ok()
            .filter(|i| usize::from(*i) < MAX_OPTIONS)
            .map(Self)
    }

    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    #[must_use]
    pub fn as_char(self) -> char {
        char::from(b'A' + self.0)
    }
}

impl FromStr for OptionLetter {
    type Err = OptionLetterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => {
                let offset = c.to_ascii_uppercase() as u8 - b'A';
                Ok(Self(offset))
            }
            _ => Err(OptionLetterError::Invalid(s.to_owned())),
        }
    }
}

impl fmt::Debug for OptionLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OptionLetter({})", self.as_char())
    }
}

impl fmt::Display for OptionLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Unvalidated question fields, as read from a bank file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuestionDraft {
    pub id: QuestionId,
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
    pub system: Option<String>,
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub difficulty: Option<String>,
    pub explanation: Option<String>,
    pub educational_objective: Option<String>,
}

impl QuestionDraft {
    /// Check the draft and turn it into an immutable `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the id or text is blank, the option list is
    /// empty or too long, or the answer letter does not index into `options`.
    pub fn validate(self) -> Result<Question, QuestionError> {
        if self.id.is_blank() {
            return Err(QuestionError::EmptyId);
        }
        if self.question.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if self.options.is_empty() {
            return Err(QuestionError::NoOptions);
        }
        if self.options.len() > MAX_OPTIONS {
            return Err(QuestionError::TooManyOptions(self.options.len()));
        }
        let answer: OptionLetter = self.answer.parse()?;
        if answer.index() >= self.options.len() {
            return Err(QuestionError::AnswerOutOfRange {
                answer,
                options: self.options.len(),
            });
        }

        Ok(Question {
            id: self.id,
            text: self.question,
            options: self.options,
            answer,
            system: category_or_default(self.system),
            subject: category_or_default(self.subject),
            topic: category_or_default(self.topic),
            difficulty: self.difficulty,
            explanation: self.explanation,
            educational_objective: self.educational_objective,
        })
    }
}

fn category_or_default(value: Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_owned(),
        _ => DEFAULT_CATEGORY.to_owned(),
    }
}

/// A multiple-choice question from the bank. Immutable once validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    options: Vec<String>,
    answer: OptionLetter,
    system: String,
    subject: String,
    topic: String,
    difficulty: Option<String>,
    explanation: Option<String>,
    educational_objective: Option<String>,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Options paired with the letter that selects them.
    pub fn lettered_options(&self) -> impl Iterator<Item = (OptionLetter, &str)> {
        self.options
            .iter()
            .enumerate()
            .filter_map(|(i, opt)| OptionLetter::from_index(i).map(|l| (l, opt.as_str())))
    }

    #[must_use]
    pub fn answer(&self) -> OptionLetter {
        self.answer
    }

    #[must_use]
    pub fn is_correct(&self, letter: OptionLetter) -> bool {
        self.answer == letter
    }

    /// Whether `letter` names one of this question's options.
    #[must_use]
    pub fn has_option(&self, letter: OptionLetter) -> bool {
        letter.index() < self.options.len()
    }

    #[must_use]
    pub fn system(&self) -> &str {
        &self.system
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn difficulty(&self) -> Option<&str> {
        self.difficulty.as_deref()
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn educational_objective(&self) -> Option<&str> {
        self.educational_objective.as_deref()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> QuestionDraft {
        QuestionDraft {
            id: QuestionId::new("q1"),
            question: "Which nerve innervates the deltoid?".into(),
            options: vec!["Axillary".into(), "Radial".into(), "Ulnar".into()],
            answer: "A".into(),
            system: Some("Musculoskeletal".into()),
            subject: Some("Anatomy".into()),
            ..QuestionDraft::default()
        }
    }

    #[test]
    fn letters_parse_case_insensitively() {
        let letter: OptionLetter = " c ".parse().unwrap();
        assert_eq!(letter.index(), 2);
        assert_eq!(letter.to_string(), "C");
    }

    #[test]
    fn letters_reject_non_letters() {
        assert!("1".parse::<OptionLetter>().is_err());
        assert!("AB".parse::<OptionLetter>().is_err());
        assert!("".parse::<OptionLetter>().is_err());
    }

    #[test]
    fn from_index_stops_at_z() {
        assert_eq!(OptionLetter::from_index(25).unwrap().as_char(), 'Z');
        assert!(OptionLetter::from_index(26).is_none());
    }

    #[test]
    fn valid_draft_defaults_missing_topic() {
        let q = draft().validate().unwrap();
        assert_eq!(q.system(), "Musculoskeletal");
        assert_eq!(q.topic(), DEFAULT_CATEGORY);
        assert!(q.is_correct(OptionLetter::from_index(0).unwrap()));
    }

    #[test]
    fn blank_categories_fall_back_to_general() {
        let mut d = draft();
        d.system = Some("   ".into());
        d.subject = None;
        let q = d.validate().unwrap();
        assert_eq!(q.system(), DEFAULT_CATEGORY);
        assert_eq!(q.subject(), DEFAULT_CATEGORY);
    }

    #[test]
    fn answer_must_index_into_options() {
        let mut d = draft();
        d.answer = "D".into();
        let err = d.validate().unwrap_err();
        assert!(matches!(
            err,
            QuestionError::AnswerOutOfRange { options: 3, .. }
        ));
    }

    #[test]
    fn empty_options_and_text_are_rejected() {
        let mut d = draft();
        d.options.clear();
        assert_eq!(d.validate().unwrap_err(), QuestionError::NoOptions);

        let mut d = draft();
        d.question = " ".into();
        assert_eq!(d.validate().unwrap_err(), QuestionError::EmptyText);

        let mut d = draft();
        d.id = QuestionId::new("");
        assert_eq!(d.validate().unwrap_err(), QuestionError::EmptyId);
    }

    #[test]
    fn lettered_options_follow_order() {
        let q = draft().validate().unwrap();
        let letters: Vec<_> = q.lettered_options().map(|(l, _)| l.as_char()).collect();
        assert_eq!(letters, vec!['A', 'B', 'C']);
    }
}
