//! Structured user notices.
//!
//! The core never formats user-facing messages itself. Outcomes and errors
//! become a [`Notice`]: a translation key in the `common` namespace plus named
//! parameters, rendered by [`crate::i18n::Translator::render`]. How long a
//! notice stays on screen is up to the UI.

use crate::error::Error;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub key: &'static str,
    pub namespace: &'static str,
    pub severity: Severity,
    pub params: Vec<(&'static str, String)>,
}

impl Notice {
    fn new(key: &'static str, severity: Severity) -> Self {
        Self {
            key,
            namespace: "common",
            severity,
            params: Vec::new(),
        }
    }

    fn with_param(mut self, name: &'static str, value: impl ToString) -> Self {
        self.params.push((name, value.to_string()));
        self
    }

    pub fn word_completed() -> Self {
        Self::new("notice_word_completed", Severity::Success)
    }

    pub fn quiz_passed(score: u8) -> Self {
        Self::new("notice_quiz_passed", Severity::Success).with_param("score", score)
    }

    pub fn quiz_failed(score: u8, threshold: u8) -> Self {
        Self::new("notice_quiz_failed", Severity::Info)
            .with_param("score", score)
            .with_param("threshold", threshold)
    }

    /// Replace `{name}` placeholders in a resolved template.
    pub fn interpolate(&self, template: &str) -> String {
        self.params
            .iter()
            .fold(template.to_string(), |text, (name, value)| {
                text.replace(&format!("{{{name}}}"), value)
            })
    }
}

impl From<&Error> for Notice {
    fn from(error: &Error) -> Self {
        match error {
            Error::InvalidTransition(_) => Self::new("notice_word_locked", Severity::Error),
            Error::QuizLocked { remaining } => {
                Self::new("notice_quiz_locked", Severity::Error).with_param("count", remaining)
            }
            Error::MilestoneLocked { .. } => Self::new("notice_milestone_locked", Severity::Error),
            Error::AttemptAlreadyFinished(_) => {
                Self::new("notice_quiz_already_finished", Severity::Info)
            }
            Error::NotFound(_) => Self::new("notice_not_found", Severity::Error),
            Error::UnknownLanguage(code) => {
                Self::new("notice_unknown_language", Severity::Error).with_param("code", code)
            }
            Error::SameAsDisplay(_) => Self::new("notice_same_as_display", Severity::Error),
            Error::LoadFailure { .. } => Self::new("notice_load_failure", Severity::Error),
            Error::CorruptState { .. } => Self::new("notice_corrupt_state", Severity::Error),
            Error::Storage(_) => Self::new("notice_storage", Severity::Error),
        }
    }
}
