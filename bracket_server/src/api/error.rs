//! Mapping from engine errors to HTTP responses.

use axum::{Json, http::StatusCode};
use bracket_engine::BracketError;
use bracket_engine::tournament::TournamentId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub type ApiResult<T> = Result<T, ApiError>;

/// HTTP status for an engine error
pub fn status_for(err: &BracketError) -> StatusCode {
    match err {
        BracketError::TournamentNotFound(_)
        | BracketError::ParticipantNotFound(_)
        | BracketError::MatchNotFound(_) => StatusCode::NOT_FOUND,
        BracketError::InsufficientParticipants { .. }
        | BracketError::InsufficientCapacity { .. }
        | BracketError::IncompleteMatch(_)
        | BracketError::InvalidWinner { .. }
        | BracketError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        BracketError::InvalidState { .. } => StatusCode::CONFLICT,
        BracketError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        BracketError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Convert an engine error, logging infrastructure failures in full
pub fn bracket_error(err: BracketError) -> ApiError {
    let status = status_for(&err);
    if err.is_validation() {
        tracing::debug!(error = %err, %status, "Bracket request rejected");
    } else {
        tracing::error!(error = %err, "Bracket operation failed");
    }
    (
        status,
        Json(ErrorResponse {
            error: err.client_message(),
        }),
    )
}

pub fn paused(tournament_id: TournamentId) -> ApiError {
    (
        StatusCode::CONFLICT,
        Json(ErrorResponse {
            error: format!("Tournament {tournament_id} is paused"),
        }),
    )
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}
