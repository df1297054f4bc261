//! Tournament records, participants and registration.
//!
//! ## Example
//!
//! ```no_run
//! use bracket_engine::db::{Database, DatabaseConfig};
//! use bracket_engine::tournament::{NewParticipant, NewTournament, TournamentManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::from_env()).await?;
//!     let manager = TournamentManager::new(Arc::new(db.repository()));
//!
//!     let tournament = manager
//!         .create_tournament(NewTournament::new("Sunday Cup", chrono::Utc::now()))
//!         .await?;
//!     manager
//!         .add_participant(tournament.id, NewParticipant::new("Ada"))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod manager;
pub mod models;

pub use manager::TournamentManager;
pub use models::{
    DEFAULT_MAX_PARTICIPANTS, Match, MatchId, NewMatch, NewParticipant, NewTournament,
    Participant, ParticipantId, ParticipantStatus, Slot, Tournament, TournamentFormat,
    TournamentId, TournamentInfo, TournamentStatus,
};
