//! Error types for the debate system.

use thiserror::Error;

/// Broad category of a [`DebateError`], used to map failures onto responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-correctable input problem.
    Validation,
    /// Unknown session or round.
    NotFound,
    /// The request conflicts with the session's current state.
    Conflict,
    /// The remote AI service failed.
    External,
    /// Local configuration is broken.
    Config,
}

#[derive(Error, Debug)]
pub enum DebateError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Round {round_id} not found in session {session_id}")]
    RoundNotFound {
        session_id: String,
        round_id: String,
    },

    #[error("{0}")]
    Validation(String),

    #[error("Response exceeds the {limit}-word limit ({actual} words)")]
    WordCapExceeded { limit: usize, actual: usize },

    #[error("Debate {0} is already complete")]
    DebateComplete(String),

    #[error("Round {round} already has a response")]
    RoundAlreadyRecorded { round: u8 },

    #[error("Round {round_id} is already graded")]
    GradingAlreadyAttached { round_id: String },

    #[error("AI service unavailable: {0}")]
    AiUnavailable(String),

    #[error("OpenAI API error: {0}")]
    OpenAIError(#[from] async_openai::error::OpenAIError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DebateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DebateError::SessionNotFound(_) | DebateError::RoundNotFound { .. } => {
                ErrorKind::NotFound
            }
            DebateError::Validation(_) | DebateError::WordCapExceeded { .. } => {
                ErrorKind::Validation
            }
            DebateError::DebateComplete(_)
            | DebateError::RoundAlreadyRecorded { .. }
            | DebateError::GradingAlreadyAttached { .. } => ErrorKind::Conflict,
            DebateError::AiUnavailable(_) | DebateError::OpenAIError(_) => ErrorKind::External,
            DebateError::ConfigError(_) => ErrorKind::Config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_cap_message_names_limit_and_count() {
        let err = DebateError::WordCapExceeded {
            limit: 180,
            actual: 300,
        };
        let message = err.to_string();
        assert!(message.contains("180"));
        assert!(message.contains("300"));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            DebateError::SessionNotFound("x".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            DebateError::DebateComplete("x".into()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            DebateError::AiUnavailable("timeout".into()).kind(),
            ErrorKind::External
        );
    }
}
