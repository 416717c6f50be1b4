//! Learner progression.
//!
//! - `state`: the per-milestone word unlock state machine
//! - `quiz`: quiz attempts, scoring and persisted results
//! - `engine`: the `ProgressionEngine` tying catalog, store and quizzes together

mod engine;
mod quiz;
mod state;

pub use engine::{
    MilestoneProgress, MilestoneSummary, ProgressionEngine, WordProgress, DEFAULT_PASS_THRESHOLD,
};
pub use quiz::{
    score_percent, stars, AnswerOutcome, AttemptId, QuestionView, QuizAttempt, QuizQuestion,
    QuizRating, QuizResult, ScoreReport, WrongAnswer,
};
pub use state::{MilestoneState, StoredProgress, WordStatus};
