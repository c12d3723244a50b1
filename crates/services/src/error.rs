//! Shared error types for the services crate.

use thiserror::Error;

use qbank_core::model::{OptionLetter, QuizConfigError, Username, UsernameError};
use storage::StorageError;

/// The question bank could not be produced. Fatal to starting any quiz.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("question bank unavailable: {0}")]
    Source(#[from] StorageError),
    #[error("question bank contains no questions")]
    Empty,
}

/// An operation was invoked in a session state that forbids it.
///
/// The session is left untouched when one of these is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidTransition {
    #[error("the current question has already been answered")]
    AlreadyAnswered,
    #[error("the current question has not been answered yet")]
    NotAnswered,
    #[error("already at the first question")]
    AtFirstQuestion,
    #[error("question index {target} is out of range for a quiz of {len}")]
    OutOfRange { target: usize, len: usize },
    #[error("option {0} is not offered by the current question")]
    UnknownOption(OptionLetter),
    #[error("the quiz has finished")]
    Finished,
    #[error("the quiz is still in progress")]
    StillActive,
}

/// Progress could not be read or written.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistenceError {
    #[error("could not read the user store while saving progress for {username}: {source}")]
    Read {
        username: Username,
        source: StorageError,
    },
    #[error("could not save progress for {username}: {source}")]
    Write {
        username: Username,
        source: StorageError,
    },
    #[error("no stored account for {0}; progress was not saved")]
    MissingAccount(Username),
}

/// Errors emitted by quiz selection and the quiz loop.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions match the selected criteria")]
    NoMatchingQuestions,
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    #[error(transparent)]
    Config(#[from] QuizConfigError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Errors emitted by `AccountService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AccountError {
    #[error(transparent)]
    InvalidUsername(#[from] UsernameError),
    #[error("password cannot be empty")]
    EmptyPassword,
    #[error("username {0} already exists")]
    UsernameTaken(Username),
    #[error("user {0} not found")]
    UnknownUser(Username),
    #[error("invalid password")]
    InvalidPassword,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
