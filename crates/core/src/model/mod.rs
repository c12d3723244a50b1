mod account;
mod ids;
mod progress;
mod question;
mod quiz;

pub use account::{PasswordHash, UserAccount};
pub use ids::{QuestionId, Username, UsernameError};
pub use progress::{
    CategoryStats, CategoryTable, ProgressError, ProgressParts, UserProgress, percentage,
};
pub use question::{
    DEFAULT_CATEGORY, MAX_OPTIONS, OptionLetter, OptionLetterError, Question, QuestionDraft,
    QuestionError,
};
pub use quiz::{QuestionFilter, QuizConfig, QuizConfigError};
