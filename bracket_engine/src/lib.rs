//! # Bracket Engine
//!
//! Single-elimination tournament brackets: seeding, round layout, result
//! recording with automatic advancement, and single-level rollback.
//!
//! ## Core Modules
//!
//! - [`bracket`]: Bracket layout, the engine and its errors
//! - [`tournament`]: Tournament and participant records, registration
//! - [`db`]: Repository trait with PostgreSQL and in-memory storage
//!
//! ## Example
//!
//! ```
//! use bracket_engine::bracket::BracketEngine;
//! use bracket_engine::db::{BracketRepository, MemoryRepository};
//! use bracket_engine::tournament::{NewParticipant, NewTournament, TournamentManager};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), bracket_engine::BracketError> {
//! let repo: Arc<dyn BracketRepository> = Arc::new(MemoryRepository::new());
//! let manager = TournamentManager::new(repo.clone());
//! let engine = BracketEngine::new(repo);
//!
//! let t = manager
//!     .create_tournament(NewTournament::new("Friday Night", chrono::Utc::now()))
//!     .await?;
//! manager
//!     .add_participants(t.id, vec![NewParticipant::new("Ada"), NewParticipant::new("Grace")])
//!     .await?;
//!
//! let bracket = engine.generate_bracket(t.id).await?;
//! assert_eq!(bracket.rounds, 1);
//! # Ok(())
//! # }
//! ```

/// Bracket layout and result propagation.
pub mod bracket;
pub use bracket::{BracketEngine, BracketError, BracketResult};

/// Storage: PostgreSQL pool, repositories and timeouts.
pub mod db;

/// Tournaments and participants.
pub mod tournament;
pub use tournament::TournamentManager;
