//! Error taxonomy shared by the progression engine and the translation resolver.
//!
//! Every variant is an expected, recoverable condition. Callers are expected to
//! turn them into a non-blocking notice (see [`crate::i18n::Notice`]) rather
//! than abort.

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A word status change that the state machine does not allow
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Quiz requested before every word of the milestone was completed
    #[error("quiz locked: {remaining} word(s) left to complete")]
    QuizLocked { remaining: usize },

    /// Milestone requested before the previous milestone's quiz was passed
    #[error("milestone '{milestone_id}' is locked")]
    MilestoneLocked { milestone_id: String },

    #[error("quiz attempt {0} is already finished")]
    AttemptAlreadyFinished(u64),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unknown language code: '{0}'")]
    UnknownLanguage(String),

    /// Learning language selection equal to the display language
    #[error("learning language '{0}' is the same as the display language")]
    SameAsDisplay(String),

    #[error("failed to load translations for '{code}': {reason}")]
    LoadFailure { code: String, reason: String },

    /// Persisted state that cannot be decoded or violates an invariant
    #[error("corrupt state at '{key}': {reason}")]
    CorruptState { key: String, reason: String },

    #[error("storage: {0}")]
    Storage(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn corrupt(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::CorruptState {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Stable machine-readable identifier, used by the HTTP adapter.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidTransition(_) => "invalid_transition",
            Error::QuizLocked { .. } => "quiz_locked",
            Error::MilestoneLocked { .. } => "milestone_locked",
            Error::AttemptAlreadyFinished(_) => "attempt_already_finished",
            Error::NotFound(_) => "not_found",
            Error::UnknownLanguage(_) => "unknown_language",
            Error::SameAsDisplay(_) => "same_as_display",
            Error::LoadFailure { .. } => "load_failure",
            Error::CorruptState { .. } => "corrupt_state",
            Error::Storage(_) => "storage",
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(e.to_string())
    }
}
