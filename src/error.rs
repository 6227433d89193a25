use thiserror::Error;

use crate::session::SessionPhase;
use crate::types::{ExpectedAnswerId, PlayerId, QuestionId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Question {0} not found")]
    QuestionNotFound(QuestionId),
    #[error("Expected answer {0} not found")]
    ExpectedAnswerNotFound(ExpectedAnswerId),
    #[error("{field} is {len} characters long (max {max})")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
    #[error("Snapshot schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: u32, supported: u32 },
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),
    #[error("Failed to parse content file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Content file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Wire error code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::QuestionNotFound(_) => "QUESTION_NOT_FOUND",
            StoreError::ExpectedAnswerNotFound(_) => "EXPECTED_ANSWER_NOT_FOUND",
            StoreError::TooLong { .. } => "TOO_LONG",
            StoreError::UnsupportedSchema { .. } | StoreError::InvalidSnapshot(_) => {
                "INVALID_SNAPSHOT"
            }
            StoreError::Json(_) | StoreError::Io(_) => "STORAGE_FAILED",
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No game session")]
    NoSession,
    #[error("Cannot {action} while the game is {phase:?}")]
    WrongPhase {
        action: &'static str,
        phase: SessionPhase,
    },
    #[error("Player {0} is not part of this game")]
    UnknownPlayer(PlayerId),
    #[error("Input for question {got} but player is on question {expected}")]
    StaleInput { expected: usize, got: usize },
    #[error("Player has already finished all questions")]
    AlreadyFinished,
    #[error("This game does not accept {0} input")]
    UnsupportedInput(&'static str),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Game setup invalid: {0}")]
    InvalidSetup(String),
}

impl SessionError {
    /// Wire error code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::NoSession => "NO_SESSION",
            SessionError::WrongPhase { .. } => "WRONG_PHASE",
            SessionError::UnknownPlayer(_) => "UNKNOWN_PLAYER",
            SessionError::StaleInput { .. } => "STALE_INPUT",
            SessionError::AlreadyFinished => "ALREADY_FINISHED",
            SessionError::UnsupportedInput(_) => "UNSUPPORTED_INPUT",
            SessionError::InvalidInput(_) => "INVALID_INPUT",
            SessionError::InvalidSetup(_) => "INVALID_SETUP",
        }
    }
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Question {question_id}: {source}")]
    Question {
        question_id: QuestionId,
        #[source]
        source: StoreError,
    },
}
