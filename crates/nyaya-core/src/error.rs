use thiserror::Error;

use crate::{llm::GenerationError, types::Speaker};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CourtError {
    #[error("session {0} not found")]
    SessionNotFound(String),

    #[error("{speaker} may not speak now; the court is waiting for {expected}")]
    InvalidTurn { speaker: Speaker, expected: Speaker },

    #[error("session {0} has ended")]
    SessionEnded(String),

    /// A user turn on this session is still waiting for its replies.
    #[error("session {0} is still answering the previous user turn")]
    TurnInFlight(String),

    #[error("invalid turn: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    GenerationFailed(#[from] GenerationError),

    #[error("invalid case configuration: {0}")]
    Configuration(String),
}

impl CourtError {
    /// True when resubmitting the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::GenerationFailed(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Stable snake_case name for API bodies and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => "session_not_found",
            Self::InvalidTurn { .. } => "invalid_turn",
            Self::SessionEnded(_) => "session_ended",
            Self::TurnInFlight(_) => "turn_in_flight",
            Self::InvalidInput(_) => "invalid_input",
            Self::GenerationFailed(_) => "generation_failed",
            Self::Configuration(_) => "configuration_error",
        }
    }
}
