//! Bracket API handlers.
//!
//! Result changes are refused with `409 Conflict` while the tournament is
//! paused. Reads and generation are not gated.
//!
//! # Examples
//!
//! Record a result:
//! ```bash
//! curl -X PUT http://localhost:8080/api/v1/tournaments/1/bracket/3/result \
//!   -H "Content-Type: application/json" \
//!   -d '{"winner_id": 7, "score": "3-1"}'
//! ```

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use bracket_engine::bracket::GeneratedBracket;
use bracket_engine::tournament::{
    Match, MatchId, Participant, ParticipantId, Tournament, TournamentId, TournamentStatus,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::error::{ApiResult, bracket_error, paused};
use super::request_id::RequestId;
use crate::{logging, metrics};

#[derive(Debug, Serialize)]
pub struct BracketResponse {
    pub tournament: Tournament,
    pub rounds: i32,
    pub bracket: Vec<Match>,
    pub participants: Vec<Participant>,
    /// Winner of the final, once decided
    pub champion_id: Option<ParticipantId>,
}

#[derive(Debug, Deserialize)]
pub struct RecordResultRequest {
    pub winner_id: ParticipantId,
    #[serde(default)]
    pub score: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MatchResultResponse {
    pub message: String,
    pub bracket: Match,
    pub tournament_status: TournamentStatus,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub message: String,
    pub deleted_matches: u64,
}

/// Refuse result changes on a paused tournament
async fn ensure_not_paused(state: &AppState, tournament_id: TournamentId) -> ApiResult<Tournament> {
    let info = state
        .manager
        .get_tournament(tournament_id)
        .await
        .map_err(bracket_error)?;
    if info.tournament.is_paused {
        return Err(paused(tournament_id));
    }
    Ok(info.tournament)
}

/// Generate the bracket from the approved participants.
///
/// Returns `201 Created` for a new bracket and `200 OK` with the existing
/// bracket when one was already generated.
///
/// # Errors
///
/// - `400 Bad Request`: Fewer than two approved participants
/// - `404 Not Found`: Tournament doesn't exist
pub async fn generate_bracket(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<(StatusCode, Json<GeneratedBracket>)> {
    let bracket = state
        .engine
        .generate_bracket(tournament_id)
        .await
        .map_err(bracket_error)?;

    if !bracket.created {
        return Ok((StatusCode::OK, Json(bracket)));
    }

    let entrants = bracket
        .matches
        .iter()
        .filter(|m| m.round == 1)
        .map(|m| m.participant1_id.is_some() as usize + m.participant2_id.is_some() as usize)
        .sum::<usize>();
    metrics::brackets_generated_total();
    metrics::bracket_participants(entrants);
    logging::log_bracket_event(
        request_id.as_str(),
        "bracket_generated",
        tournament_id,
        None,
        &format!("{} rounds, {} entrants", bracket.rounds, entrants),
    );

    Ok((StatusCode::CREATED, Json(bracket)))
}

/// Bracket view: tournament, matches by round and match number, participants.
pub async fn get_bracket(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Json<BracketResponse>> {
    let view = state
        .engine
        .get_bracket(tournament_id)
        .await
        .map_err(bracket_error)?;

    let rounds = view.round_count();
    let champion_id = view.champion().map(|p| p.id);
    Ok(Json(BracketResponse {
        tournament: view.tournament,
        rounds,
        bracket: view.matches,
        participants: view.participants,
        champion_id,
    }))
}

/// Matches only, ordered by round then match number.
pub async fn list_matches(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Json<Vec<Match>>> {
    let view = state
        .engine
        .get_bracket(tournament_id)
        .await
        .map_err(bracket_error)?;
    Ok(Json(view.matches))
}

/// Delete all matches so the bracket can be generated again.
///
/// # Errors
///
/// - `409 Conflict`: Tournament already completed
pub async fn reset_bracket(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Json<ResetResponse>> {
    let deleted_matches = state
        .manager
        .reset_bracket(tournament_id)
        .await
        .map_err(bracket_error)?;

    logging::log_bracket_event(
        request_id.as_str(),
        "bracket_reset",
        tournament_id,
        None,
        &format!("{deleted_matches} matches deleted"),
    );

    Ok(Json(ResetResponse {
        message: "Bracket reset".to_string(),
        deleted_matches,
    }))
}

/// Record a match winner and advance them to the next round.
///
/// An empty or missing score leaves the stored score unchanged.
///
/// # Errors
///
/// - `400 Bad Request`: A participant slot is empty, or the winner is not in the match
/// - `404 Not Found`: Tournament or match doesn't exist
/// - `409 Conflict`: Tournament is paused
pub async fn record_result(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((tournament_id, match_id)): Path<(TournamentId, MatchId)>,
    Json(request): Json<RecordResultRequest>,
) -> ApiResult<Json<MatchResultResponse>> {
    let before = ensure_not_paused(&state, tournament_id).await?;

    let score = request.score.filter(|s| !s.trim().is_empty());
    let recorded = state
        .engine
        .record_result(tournament_id, match_id, request.winner_id, score)
        .await
        .map_err(bracket_error)?;
    metrics::match_results_recorded_total();

    let tournament_status = state
        .manager
        .get_tournament(tournament_id)
        .await
        .map_err(bracket_error)?
        .tournament
        .status;
    if tournament_status == TournamentStatus::Completed
        && before.status != TournamentStatus::Completed
    {
        metrics::tournaments_completed_total();
    }

    logging::log_bracket_event(
        request_id.as_str(),
        "result_recorded",
        tournament_id,
        Some(match_id),
        &format!("Participant {} won", request.winner_id),
    );

    Ok(Json(MatchResultResponse {
        message: "Match result recorded successfully".to_string(),
        bracket: recorded,
        tournament_status,
    }))
}

/// Clear a match result and pull the winner back out of the next round.
///
/// # Errors
///
/// - `404 Not Found`: Tournament or match doesn't exist
/// - `409 Conflict`: Tournament is paused
pub async fn clear_result(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((tournament_id, match_id)): Path<(TournamentId, MatchId)>,
) -> ApiResult<Json<MatchResultResponse>> {
    let tournament = ensure_not_paused(&state, tournament_id).await?;

    let cleared = state
        .engine
        .clear_result(tournament_id, match_id)
        .await
        .map_err(bracket_error)?;
    metrics::match_results_cleared_total();

    logging::log_bracket_event(
        request_id.as_str(),
        "result_cleared",
        tournament_id,
        Some(match_id),
        "Result cleared",
    );

    Ok(Json(MatchResultResponse {
        message: "Match result cleared".to_string(),
        bracket: cleared,
        tournament_status: tournament.status,
    }))
}
