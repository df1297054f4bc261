//! HTTP API for tournaments and brackets.
//!
//! # Modules
//!
//! - [`tournaments`]: Tournament setup, participants, pause control
//! - [`brackets`]: Bracket generation, results and rollback
//! - [`error`]: Engine error to HTTP status mapping
//! - [`request_id`]: Request correlation middleware
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use bracket_server::api::{create_router, AppState};
//! use bracket_engine::db::MemoryRepository;
//! use std::sync::Arc;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let state = AppState::new(Arc::new(MemoryRepository::new()));
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod brackets;
pub mod error;
pub mod request_id;
pub mod tournaments;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
};
use bracket_engine::{BracketEngine, TournamentManager, db::BracketRepository};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<TournamentManager>,
    pub engine: Arc<BracketEngine>,
    pub repository: Arc<dyn BracketRepository>,
}

impl AppState {
    /// Build managers over one shared repository
    pub fn new(repository: Arc<dyn BracketRepository>) -> Self {
        Self {
            manager: Arc::new(TournamentManager::new(repository.clone())),
            engine: Arc::new(BracketEngine::new(repository.clone())),
            repository,
        }
    }
}

/// Create the complete API router.
///
/// ```text
/// GET    /health
/// POST   /api/v1/tournaments                                   - Create tournament
/// GET    /api/v1/tournaments[?status=active]                   - List tournaments
/// GET    /api/v1/tournaments/{id}                              - Get tournament
/// DELETE /api/v1/tournaments/{id}                              - Delete tournament
/// POST   /api/v1/tournaments/{id}/pause                        - Pause result changes
/// POST   /api/v1/tournaments/{id}/resume                       - Resume result changes
/// POST   /api/v1/tournaments/{id}/participants                 - Add participant
/// PUT    /api/v1/tournaments/{id}/participants                 - Add participants in bulk
/// GET    /api/v1/tournaments/{id}/participants                 - List participants
/// POST   /api/v1/tournaments/{id}/participants/{pid}/approve   - Approve participant
/// POST   /api/v1/tournaments/{id}/bracket/generate             - Generate bracket
/// GET    /api/v1/tournaments/{id}/bracket                      - Bracket view
/// DELETE /api/v1/tournaments/{id}/bracket                      - Reset bracket
/// GET    /api/v1/tournaments/{id}/brackets                     - Matches only
/// PUT    /api/v1/tournaments/{id}/bracket/{match_id}/result    - Record result
/// DELETE /api/v1/tournaments/{id}/bracket/{match_id}/result    - Clear result
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router() -> Router<AppState> {
    let tournament_routes = Router::new()
        .route(
            "/tournaments",
            post(tournaments::create_tournament).get(tournaments::list_tournaments),
        )
        .route(
            "/tournaments/{tournament_id}",
            get(tournaments::get_tournament).delete(tournaments::delete_tournament),
        )
        .route(
            "/tournaments/{tournament_id}/pause",
            post(tournaments::pause_tournament),
        )
        .route(
            "/tournaments/{tournament_id}/resume",
            post(tournaments::resume_tournament),
        )
        .route(
            "/tournaments/{tournament_id}/participants",
            post(tournaments::add_participant)
                .put(tournaments::add_participants_bulk)
                .get(tournaments::list_participants),
        )
        .route(
            "/tournaments/{tournament_id}/participants/{participant_id}/approve",
            post(tournaments::approve_participant),
        );

    let bracket_routes = Router::new()
        .route(
            "/tournaments/{tournament_id}/bracket/generate",
            post(brackets::generate_bracket),
        )
        .route(
            "/tournaments/{tournament_id}/bracket",
            get(brackets::get_bracket).delete(brackets::reset_bracket),
        )
        .route(
            "/tournaments/{tournament_id}/brackets",
            get(brackets::list_matches),
        )
        .route(
            "/tournaments/{tournament_id}/bracket/{match_id}/result",
            put(brackets::record_result).delete(brackets::clear_result),
        );

    Router::new().merge(tournament_routes).merge(bracket_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when storage answers, `503 Service Unavailable` otherwise.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let storage_healthy = state.repository.health_check().await.is_ok();

    let status_code = if storage_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if storage_healthy { "healthy" } else { "unhealthy" },
        "service": "bracket-service",
        "version": env!("CARGO_PKG_VERSION"),
        "storage": storage_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
