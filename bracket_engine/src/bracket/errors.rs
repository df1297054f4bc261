//! Bracket error types.

use std::time::Duration;

use thiserror::Error;

use crate::db::timeouts::TimeoutError;
use crate::tournament::models::{MatchId, ParticipantId, TournamentId, TournamentStatus};

/// Bracket and tournament errors
#[derive(Debug, Error)]
pub enum BracketError {
    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    #[error("Participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("Insufficient participants: need {needed}, have {current}")]
    InsufficientParticipants { needed: usize, current: usize },

    #[error(
        "Insufficient capacity: cannot add {requested} participant(s), tournament has {current}/{max}"
    )]
    InsufficientCapacity {
        max: i32,
        current: i64,
        requested: usize,
    },

    /// Cannot record a result before both sides are known
    #[error("Match {0} is incomplete: both participants must be assigned")]
    IncompleteMatch(MatchId),

    #[error("Participant {winner_id} is not playing in match {match_id}")]
    InvalidWinner {
        match_id: MatchId,
        winner_id: ParticipantId,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Tournament not in correct state: expected {expected}, got {actual}")]
    InvalidState {
        expected: TournamentStatus,
        actual: TournamentStatus,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),
}

impl From<TimeoutError> for BracketError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(duration) => BracketError::Timeout(duration),
            TimeoutError::Database(e) => BracketError::Database(e),
        }
    }
}

impl BracketError {
    /// Get a client-safe error message that doesn't leak storage details
    pub fn client_message(&self) -> String {
        match self {
            BracketError::Database(_) => "Internal server error".to_string(),
            BracketError::Timeout(_) => "Storage temporarily unavailable".to_string(),
            _ => self.to_string(),
        }
    }

    /// Local validation failure, as opposed to an infrastructure error
    pub fn is_validation(&self) -> bool {
        !matches!(self, BracketError::Database(_) | BracketError::Timeout(_))
    }
}

/// Result type for bracket operations
pub type BracketResult<T> = Result<T, BracketError>;
