mod selector;
mod session;
mod workflow;

// Public API of the quiz subsystem.
pub use crate::error::SessionError;
pub use selector::{QuizPlan, QuizSelector};
pub use session::{
    AnswerFeedback, MarkedQuestion, PerformanceBand, QuizOutcome, QuizSession, QuizStatus,
};
pub use workflow::QuizLoopService;
