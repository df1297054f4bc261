//! Tournament manager for setup, registration and pause control.

use super::models::{
    NewParticipant, NewTournament, Participant, ParticipantId, ParticipantStatus, Tournament,
    TournamentFormat, TournamentId, TournamentInfo, TournamentStatus,
};
use crate::bracket::errors::{BracketError, BracketResult};
use crate::db::repository::BracketRepository;
use log::{info, warn};
use std::sync::Arc;

/// Fewest entrants a tournament may be configured for
pub const MIN_MAX_PARTICIPANTS: i32 = 2;

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    repository: Arc<dyn BracketRepository>,
}

impl TournamentManager {
    pub fn new(repository: Arc<dyn BracketRepository>) -> Self {
        Self { repository }
    }

    /// Create a new tournament in `setup`
    ///
    /// # Errors
    ///
    /// * `BracketError::InvalidInput` - Empty name or fewer than two slots
    pub async fn create_tournament(&self, new: NewTournament) -> BracketResult<Tournament> {
        if new.name.trim().is_empty() {
            return Err(BracketError::InvalidInput(
                "Tournament name must not be empty".to_string(),
            ));
        }
        if new.max_participants < MIN_MAX_PARTICIPANTS {
            return Err(BracketError::InvalidInput(format!(
                "max_participants must be at least {MIN_MAX_PARTICIPANTS}"
            )));
        }
        if new.format == TournamentFormat::DoubleElimination {
            warn!(
                "Tournament '{}' requested double elimination; brackets are built as single elimination",
                new.name
            );
        }

        let tournament = self.repository.create_tournament(&new).await?;
        info!(
            "Created tournament {} '{}' ({} slots)",
            tournament.id, tournament.name, tournament.max_participants
        );
        Ok(tournament)
    }

    /// Get tournament with its approved participant count
    pub async fn get_tournament(&self, tournament_id: TournamentId) -> BracketResult<TournamentInfo> {
        let tournament = self.require(tournament_id).await?;
        let participant_count = self.repository.count_approved(tournament_id).await?;
        Ok(TournamentInfo {
            tournament,
            participant_count,
        })
    }

    /// List tournaments, newest first
    pub async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> BracketResult<Vec<TournamentInfo>> {
        self.repository.list_tournaments(status).await
    }

    /// Delete a tournament along with its participants and matches
    pub async fn delete_tournament(&self, tournament_id: TournamentId) -> BracketResult<()> {
        if !self.repository.delete_tournament(tournament_id).await? {
            return Err(BracketError::TournamentNotFound(tournament_id));
        }
        info!("Deleted tournament {}", tournament_id);
        Ok(())
    }

    pub async fn add_participant(
        &self,
        tournament_id: TournamentId,
        participant: NewParticipant,
    ) -> BracketResult<Participant> {
        let mut added = self
            .add_participants(tournament_id, vec![participant])
            .await?;
        added
            .pop()
            .ok_or_else(|| BracketError::InvalidInput("No participant was added".to_string()))
    }

    /// Register a batch of participants.
    ///
    /// The whole batch is rejected if any name is empty, any seed is below 1,
    /// or the approved entrants would exceed `max_participants`.
    pub async fn add_participants(
        &self,
        tournament_id: TournamentId,
        participants: Vec<NewParticipant>,
    ) -> BracketResult<Vec<Participant>> {
        if participants.is_empty() {
            return Err(BracketError::InvalidInput(
                "At least one participant is required".to_string(),
            ));
        }
        if participants.iter().any(|p| p.name.trim().is_empty()) {
            return Err(BracketError::InvalidInput(
                "Participant name must not be empty".to_string(),
            ));
        }
        if let Some(seed) = participants.iter().filter_map(|p| p.seed).find(|&s| s < 1) {
            return Err(BracketError::InvalidInput(format!(
                "Seed must be 1 or greater, got {seed}"
            )));
        }

        let tournament = self.require(tournament_id).await?;
        let approved = participants
            .iter()
            .filter(|p| p.status == ParticipantStatus::Approved)
            .count();
        self.check_capacity(&tournament, approved).await?;

        let added = self
            .repository
            .add_participants(tournament_id, &participants)
            .await?;
        info!(
            "Added {} participant(s) to tournament {}",
            added.len(),
            tournament_id
        );
        Ok(added)
    }

    /// Move a pending participant to approved
    pub async fn approve_participant(
        &self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
    ) -> BracketResult<Participant> {
        let tournament = self.require(tournament_id).await?;
        let participant = self
            .repository
            .find_participant(tournament_id, participant_id)
            .await?
            .ok_or(BracketError::ParticipantNotFound(participant_id))?;

        if participant.status == ParticipantStatus::Approved {
            return Ok(participant);
        }
        self.check_capacity(&tournament, 1).await?;

        self.repository
            .approve_participant(tournament_id, participant_id)
            .await?
            .ok_or(BracketError::ParticipantNotFound(participant_id))
    }

    pub async fn list_participants(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<Participant>> {
        self.require(tournament_id).await?;
        self.repository.list_participants(tournament_id).await
    }

    /// Set or lift the pause flag
    pub async fn set_paused(
        &self,
        tournament_id: TournamentId,
        paused: bool,
    ) -> BracketResult<Tournament> {
        let tournament = self
            .repository
            .set_paused(tournament_id, paused)
            .await?
            .ok_or(BracketError::TournamentNotFound(tournament_id))?;
        info!(
            "Tournament {} {}",
            tournament_id,
            if paused { "paused" } else { "resumed" }
        );
        Ok(tournament)
    }

    /// Delete every match and return the tournament to `setup`.
    ///
    /// Returns the number of deleted matches.
    ///
    /// # Errors
    ///
    /// * `BracketError::InvalidState` - Tournament is already completed
    pub async fn reset_bracket(&self, tournament_id: TournamentId) -> BracketResult<u64> {
        let tournament = self.require(tournament_id).await?;
        if tournament.status == TournamentStatus::Completed {
            return Err(BracketError::InvalidState {
                expected: TournamentStatus::Active,
                actual: tournament.status,
            });
        }

        let deleted = self.repository.reset_bracket(tournament_id).await?;
        info!(
            "Reset bracket of tournament {} ({} matches deleted)",
            tournament_id, deleted
        );
        Ok(deleted)
    }

    async fn require(&self, tournament_id: TournamentId) -> BracketResult<Tournament> {
        self.repository
            .find_tournament(tournament_id)
            .await?
            .ok_or(BracketError::TournamentNotFound(tournament_id))
    }

    async fn check_capacity(&self, tournament: &Tournament, requested: usize) -> BracketResult<()> {
        if requested == 0 {
            return Ok(());
        }
        let current = self.repository.count_approved(tournament.id).await?;
        if current + requested as i64 > i64::from(tournament.max_participants) {
            return Err(BracketError::InsufficientCapacity {
                max: tournament.max_participants,
                current,
                requested,
            });
        }
        Ok(())
    }
}
