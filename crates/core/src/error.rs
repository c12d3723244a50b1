use thiserror::Error;

use crate::model::{
    OptionLetterError, ProgressError, QuestionError, QuizConfigError, UsernameError,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    OptionLetter(#[from] OptionLetterError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    QuizConfig(#[from] QuizConfigError),
    #[error(transparent)]
    Username(#[from] UsernameError),
}
