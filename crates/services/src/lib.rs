#![forbid(unsafe_code)]

pub mod accounts;
pub mod context;
pub mod error;
pub mod progress;
pub mod questions;
pub mod quiz;

pub use qbank_core::Clock;
pub use qbank_core::stats::{self, PerformanceSummary, summarize};

pub use accounts::{AccountService, PasswordHasher, Sha256PasswordHasher};
pub use context::SessionContext;
pub use error::{
    AccountError, InvalidTransition, LoadError, PersistenceError, SessionError,
};
pub use progress::ProgressStore;
pub use questions::{QuestionBank, QuestionRepository};
pub use quiz::{
    AnswerFeedback, MarkedQuestion, PerformanceBand, QuizLoopService, QuizOutcome, QuizPlan,
    QuizSelector, QuizSession, QuizStatus,
};
