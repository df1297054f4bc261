//! Tournament and participant API handlers.
//!
//! # Examples
//!
//! Create a tournament:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/tournaments \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Club Open", "start_date": "2026-05-01T09:00:00Z", "max_participants": 16}'
//! ```
//!
//! Register several participants at once:
//! ```bash
//! curl -X PUT http://localhost:8080/api/v1/tournaments/1/participants \
//!   -H "Content-Type: application/json" \
//!   -d '{"participants": [{"name": "Ada"}, {"name": "Grace", "seed": 1}]}'
//! ```

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use bracket_engine::tournament::{
    NewParticipant, NewTournament, Participant, ParticipantId, Tournament, TournamentId,
    TournamentInfo, TournamentStatus,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::error::{ApiResult, bad_request, bracket_error};

#[derive(Debug, Serialize)]
pub struct TournamentResponse {
    pub tournament: Tournament,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TournamentListResponse {
    pub tournaments: Vec<TournamentInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<TournamentStatus>,
}

#[derive(Debug, Serialize)]
pub struct ParticipantResponse {
    pub participant: Participant,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkParticipantsRequest {
    #[serde(default)]
    pub participants: Vec<NewParticipant>,
}

#[derive(Debug, Serialize)]
pub struct BulkParticipantsResponse {
    pub participants: Vec<Participant>,
    pub message: String,
}

/// Create a tournament in `setup`.
///
/// # Errors
///
/// - `400 Bad Request`: Empty name or `max_participants` below 2
pub async fn create_tournament(
    State(state): State<AppState>,
    Json(request): Json<NewTournament>,
) -> ApiResult<(StatusCode, Json<TournamentResponse>)> {
    let tournament = state
        .manager
        .create_tournament(request)
        .await
        .map_err(bracket_error)?;

    Ok((
        StatusCode::CREATED,
        Json(TournamentResponse {
            tournament,
            message: "Tournament created successfully".to_string(),
        }),
    ))
}

/// List tournaments, newest first, optionally filtered by `?status=`.
pub async fn list_tournaments(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<TournamentListResponse>> {
    let tournaments = state
        .manager
        .list_tournaments(query.status)
        .await
        .map_err(bracket_error)?;
    Ok(Json(TournamentListResponse { tournaments }))
}

/// Get a tournament with its approved participant count.
///
/// # Errors
///
/// - `404 Not Found`: Tournament doesn't exist
pub async fn get_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Json<TournamentInfo>> {
    state
        .manager
        .get_tournament(tournament_id)
        .await
        .map(Json)
        .map_err(bracket_error)
}

/// Delete a tournament with all participants and matches.
pub async fn delete_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<StatusCode> {
    state
        .manager
        .delete_tournament(tournament_id)
        .await
        .map_err(bracket_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Pause result changes. Reads stay available.
pub async fn pause_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Json<Tournament>> {
    state
        .manager
        .set_paused(tournament_id, true)
        .await
        .map(Json)
        .map_err(bracket_error)
}

pub async fn resume_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Json<Tournament>> {
    state
        .manager
        .set_paused(tournament_id, false)
        .await
        .map(Json)
        .map_err(bracket_error)
}

/// Register one participant.
///
/// # Errors
///
/// - `400 Bad Request`: Empty name or tournament full
/// - `404 Not Found`: Tournament doesn't exist
pub async fn add_participant(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Json(request): Json<NewParticipant>,
) -> ApiResult<(StatusCode, Json<ParticipantResponse>)> {
    let participant = state
        .manager
        .add_participant(tournament_id, request)
        .await
        .map_err(bracket_error)?;

    Ok((
        StatusCode::CREATED,
        Json(ParticipantResponse {
            participant,
            message: "Participant added".to_string(),
        }),
    ))
}

/// Register a batch of participants; all or none are added.
pub async fn add_participants_bulk(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Json(request): Json<BulkParticipantsRequest>,
) -> ApiResult<Json<BulkParticipantsResponse>> {
    if request.participants.is_empty() {
        return Err(bad_request("No participants provided"));
    }

    let participants = state
        .manager
        .add_participants(tournament_id, request.participants)
        .await
        .map_err(bracket_error)?;

    Ok(Json(BulkParticipantsResponse {
        message: format!("{} participants added successfully", participants.len()),
        participants,
    }))
}

pub async fn list_participants(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Json<Vec<Participant>>> {
    state
        .manager
        .list_participants(tournament_id)
        .await
        .map(Json)
        .map_err(bracket_error)
}

/// Approve a pending participant.
///
/// # Errors
///
/// - `400 Bad Request`: Tournament already full
/// - `404 Not Found`: Tournament or participant doesn't exist
pub async fn approve_participant(
    State(state): State<AppState>,
    Path((tournament_id, participant_id)): Path<(TournamentId, ParticipantId)>,
) -> ApiResult<Json<Participant>> {
    state
        .manager
        .approve_participant(tournament_id, participant_id)
        .await
        .map(Json)
        .map_err(bracket_error)
}
