//! Single-elimination bracket engine.
//!
//! The engine keeps no state between calls. Each operation reads the rows it
//! needs, computes the new state and hands all writes to the repository as
//! one atomic unit.

use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::errors::{BracketError, BracketResult};
use super::layout;
use crate::db::repository::{BracketRepository, MatchChanges, SavedBracket, SlotChange};
use crate::tournament::models::{
    Match, MatchId, Participant, ParticipantId, Slot, Tournament, TournamentFormat, TournamentId,
    TournamentStatus,
};

/// Fewest approved participants a bracket can be built from
pub const MIN_PARTICIPANTS: usize = 2;

/// Result of bracket generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedBracket {
    pub rounds: u32,
    pub matches: Vec<Match>,
    /// False when an existing bracket was returned
    #[serde(skip)]
    pub created: bool,
}

/// Read-only projection of a tournament's bracket for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BracketView {
    pub tournament: Tournament,
    /// Ordered by round, then match number
    pub matches: Vec<Match>,
    pub participants: Vec<Participant>,
}

impl BracketView {
    /// Matches grouped by round number
    pub fn rounds(&self) -> BTreeMap<i32, Vec<&Match>> {
        let mut rounds: BTreeMap<i32, Vec<&Match>> = BTreeMap::new();
        for m in &self.matches {
            rounds.entry(m.round).or_default().push(m);
        }
        rounds
    }

    pub fn round_count(&self) -> i32 {
        self.matches.iter().map(|m| m.round).max().unwrap_or(0)
    }

    /// Winner of the final match, if decided
    pub fn champion(&self) -> Option<&Participant> {
        let round = self.round_count();
        let winner = self
            .matches
            .iter()
            .find(|m| m.round == round)
            .and_then(|m| m.winner_id)?;
        self.participants.iter().find(|p| p.id == winner)
    }
}

/// Bracket engine
#[derive(Clone)]
pub struct BracketEngine {
    repository: Arc<dyn BracketRepository>,
}

impl GeneratedBracket {
    fn existing(matches: Vec<Match>) -> Self {
        let rounds = matches.iter().map(|m| m.round).max().unwrap_or(1) as u32;
        Self {
            rounds,
            matches,
            created: false,
        }
    }
}

impl BracketEngine {
    pub fn new(repository: Arc<dyn BracketRepository>) -> Self {
        Self { repository }
    }

    async fn require_tournament(&self, tournament_id: TournamentId) -> BracketResult<Tournament> {
        self.repository
            .find_tournament(tournament_id)
            .await?
            .ok_or(BracketError::TournamentNotFound(tournament_id))
    }

    async fn require_match(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
    ) -> BracketResult<Match> {
        self.repository
            .load_match(tournament_id, match_id)
            .await?
            .ok_or(BracketError::MatchNotFound(match_id))
    }

    /// Build every round of the bracket from the approved participants.
    ///
    /// Participants without a seed get one from their position. If the
    /// tournament already has matches they are returned unchanged.
    ///
    /// # Errors
    ///
    /// * `BracketError::TournamentNotFound` - Unknown tournament
    /// * `BracketError::InsufficientParticipants` - Fewer than two approved participants
    pub async fn generate_bracket(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<GeneratedBracket> {
        let tournament = self.require_tournament(tournament_id).await?;

        let existing = self.repository.load_matches(tournament_id).await?;
        if !existing.is_empty() {
            debug!(
                "Tournament {} already has {} matches, returning existing bracket",
                tournament_id,
                existing.len()
            );
            return Ok(GeneratedBracket::existing(existing));
        }

        if tournament.format != tournament.format.effective() {
            warn!(
                "Tournament {} requested {}, building {} bracket instead",
                tournament_id,
                tournament.format.as_str(),
                TournamentFormat::SingleElimination.as_str()
            );
        }

        let mut participants = self
            .repository
            .load_approved_participants(tournament_id)
            .await?;
        if participants.len() < MIN_PARTICIPANTS {
            return Err(BracketError::InsufficientParticipants {
                needed: MIN_PARTICIPANTS,
                current: participants.len(),
            });
        }

        let plan = layout::plan_bracket(&mut participants);
        let matches = match self
            .repository
            .save_bracket(tournament_id, &plan.seeds, &plan.matches)
            .await?
        {
            SavedBracket::Created(matches) => matches,
            SavedBracket::Existing(matches) => {
                debug!(
                    "Tournament {} bracket was generated concurrently, returning it",
                    tournament_id
                );
                return Ok(GeneratedBracket::existing(matches));
            }
        };

        info!(
            "Generated bracket for tournament {}: {} participants, {} rounds, {} matches",
            tournament_id,
            participants.len(),
            plan.rounds,
            matches.len()
        );

        Ok(GeneratedBracket {
            rounds: plan.rounds,
            matches,
            created: true,
        })
    }

    /// Record a winner and move them into the next round.
    ///
    /// A `None` score keeps whatever score the match already had. Recording
    /// again with a different winner overwrites the match and the next-round
    /// slot, but nothing further downstream; clear the later results first.
    ///
    /// # Errors
    ///
    /// * `BracketError::MatchNotFound` - No such match in this tournament
    /// * `BracketError::IncompleteMatch` - A participant slot is still empty
    /// * `BracketError::InvalidWinner` - Winner is not one of the two participants
    pub async fn record_result(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
        winner_id: ParticipantId,
        score: Option<String>,
    ) -> BracketResult<Match> {
        let mut played = self.require_match(tournament_id, match_id).await?;

        if !played.is_ready() {
            return Err(BracketError::IncompleteMatch(match_id));
        }
        if !played.has_participant(winner_id) {
            return Err(BracketError::InvalidWinner {
                match_id,
                winner_id,
            });
        }

        played.winner_id = Some(winner_id);
        if let Some(score) = score {
            played.score = Some(score);
        }

        let (next_round, next_number, slot) =
            layout::next_position(played.round, played.match_number);
        let mut slots = Vec::new();
        if let Some(next) = self
            .repository
            .load_match_at(tournament_id, next_round, next_number)
            .await?
        {
            if next.is_decided() {
                warn!(
                    "Match {} already decided while its input match {} changed",
                    next.id, match_id
                );
            }
            debug!(
                "Advancing participant {} to round {} match {} ({:?})",
                winner_id, next_round, next_number, slot
            );
            slots.push(SlotChange {
                match_id: next.id,
                slot,
                participant_id: Some(winner_id),
            });
        }

        let tournament = self.require_tournament(tournament_id).await?;
        let status = self.completion_transition(&tournament, &played).await?;

        self.repository
            .commit_match_changes(&MatchChanges {
                tournament_id,
                source: played.clone(),
                slots,
                status,
            })
            .await?;

        if status == Some(TournamentStatus::Completed) {
            info!(
                "Tournament {} completed, champion participant {}",
                tournament_id, winner_id
            );
        }

        Ok(played)
    }

    /// `Completed` when the highest-round match is decided and the
    /// tournament is not already completed. Never moves status backwards.
    async fn completion_transition(
        &self,
        tournament: &Tournament,
        played: &Match,
    ) -> BracketResult<Option<TournamentStatus>> {
        if tournament.status == TournamentStatus::Completed {
            return Ok(None);
        }

        let final_decided = match self.repository.load_final_match(tournament.id).await? {
            Some(final_match) if final_match.id == played.id => played.is_decided(),
            Some(final_match) => final_match.is_decided(),
            None => false,
        };

        Ok(final_decided.then_some(TournamentStatus::Completed))
    }

    /// Remove a recorded result and pull the winner back out of the next round.
    ///
    /// Only the immediately following round is touched. Tournament status is
    /// left as is, even when the final result is cleared.
    ///
    /// # Errors
    ///
    /// * `BracketError::MatchNotFound` - No such match in this tournament
    pub async fn clear_result(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
    ) -> BracketResult<Match> {
        let mut cleared = self.require_match(tournament_id, match_id).await?;

        let mut slots = Vec::new();
        if let Some(previous_winner) = cleared.winner_id {
            for next in self
                .repository
                .load_round(tournament_id, cleared.round + 1)
                .await?
            {
                for slot in [Slot::First, Slot::Second] {
                    if next.slot(slot) == Some(previous_winner) {
                        debug!(
                            "Removing participant {} from round {} match {} ({:?})",
                            previous_winner, next.round, next.match_number, slot
                        );
                        slots.push(SlotChange {
                            match_id: next.id,
                            slot,
                            participant_id: None,
                        });
                    }
                }
            }
        }

        cleared.winner_id = None;
        cleared.score = None;

        self.repository
            .commit_match_changes(&MatchChanges {
                tournament_id,
                source: cleared.clone(),
                slots,
                status: None,
            })
            .await?;

        Ok(cleared)
    }

    /// Tournament, matches and participants for display
    pub async fn get_bracket(&self, tournament_id: TournamentId) -> BracketResult<BracketView> {
        let tournament = self.require_tournament(tournament_id).await?;
        let matches = self.repository.load_matches(tournament_id).await?;
        let participants = self.repository.list_participants(tournament_id).await?;

        Ok(BracketView {
            tournament,
            matches,
            participants,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryRepository;
    use crate::tournament::models::{NewParticipant, NewTournament};
    use chrono::Utc;

    async fn setup(names: &[&str]) -> (BracketEngine, MemoryRepository, TournamentId) {
        let repo = MemoryRepository::new();
        let tournament = repo
            .create_tournament(&NewTournament::new("Weekly", Utc::now()).with_max_participants(16))
            .await
            .unwrap();
        let participants: Vec<_> = names.iter().map(|n| NewParticipant::new(*n)).collect();
        repo.add_participants(tournament.id, &participants)
            .await
            .unwrap();
        (
            BracketEngine::new(Arc::new(repo.clone())),
            repo,
            tournament.id,
        )
    }

    fn at(matches: &[Match], round: i32, match_number: i32) -> Match {
        matches
            .iter()
            .find(|m| m.round == round && m.match_number == match_number)
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn test_generate_marks_tournament_active() {
        let (engine, repo, id) = setup(&["A", "B", "C", "D"]).await;
        let bracket = engine.generate_bracket(id).await.unwrap();

        assert_eq!(bracket.rounds, 2);
        assert_eq!(bracket.matches.len(), 3);
        let t = repo.find_tournament(id).await.unwrap().unwrap();
        assert_eq!(t.status, TournamentStatus::Active);

        let seeds: Vec<_> = repo
            .list_participants(id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.seed)
            .collect();
        assert_eq!(seeds, vec![Some(1), Some(2), Some(3), Some(4)]);
    }

    #[tokio::test]
    async fn test_generate_requires_two_participants() {
        let (engine, repo, id) = setup(&["Solo"]).await;
        let err = engine.generate_bracket(id).await.unwrap_err();
        assert!(matches!(
            err,
            BracketError::InsufficientParticipants {
                needed: 2,
                current: 1
            }
        ));
        assert!(repo.load_matches(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generate_unknown_tournament() {
        let engine = BracketEngine::new(Arc::new(MemoryRepository::new()));
        let err = engine.generate_bracket(42).await.unwrap_err();
        assert!(matches!(err, BracketError::TournamentNotFound(42)));
    }

    #[tokio::test]
    async fn test_record_advances_to_first_slot() {
        let (engine, _, id) = setup(&["A", "B", "C", "D"]).await;
        let bracket = engine.generate_bracket(id).await.unwrap();
        let m1 = at(&bracket.matches, 1, 1);
        let a = m1.participant1_id.unwrap();

        let updated = engine
            .record_result(id, m1.id, a, Some("3-1".to_string()))
            .await
            .unwrap();
        assert_eq!(updated.winner_id, Some(a));
        assert_eq!(updated.score.as_deref(), Some("3-1"));

        let view = engine.get_bracket(id).await.unwrap();
        let final_match = at(&view.matches, 2, 1);
        assert_eq!(final_match.participant1_id, Some(a));
        assert_eq!(final_match.participant2_id, None);
        assert_eq!(view.tournament.status, TournamentStatus::Active);
    }

    #[tokio::test]
    async fn test_clear_removes_advanced_winner() {
        let (engine, _, id) = setup(&["A", "B", "C", "D"]).await;
        let bracket = engine.generate_bracket(id).await.unwrap();
        let m2 = at(&bracket.matches, 1, 2);
        let d = m2.participant2_id.unwrap();

        engine
            .record_result(id, m2.id, d, Some("2-0".to_string()))
            .await
            .unwrap();
        let cleared = engine.clear_result(id, m2.id).await.unwrap();
        assert_eq!(cleared.winner_id, None);
        assert_eq!(cleared.score, None);

        let view = engine.get_bracket(id).await.unwrap();
        assert_eq!(at(&view.matches, 2, 1).participant2_id, None);
    }

    #[tokio::test]
    async fn test_view_groups_rounds_and_names_champion() {
        let (engine, _, id) = setup(&["A", "B"]).await;
        let bracket = engine.generate_bracket(id).await.unwrap();
        let only = &bracket.matches[0];
        engine
            .record_result(id, only.id, only.participant2_id.unwrap(), None)
            .await
            .unwrap();

        let view = engine.get_bracket(id).await.unwrap();
        assert_eq!(view.rounds().len(), 1);
        assert_eq!(view.round_count(), 1);
        assert_eq!(view.champion().map(|p| p.name.as_str()), Some("B"));
        assert_eq!(view.tournament.status, TournamentStatus::Completed);
    }
}
