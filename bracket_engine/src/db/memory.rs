//! In-memory implementation of `BracketRepository`.
//!
//! Rows live in an arena keyed by tournament id with per-tournament child
//! lists. A single async mutex guards the whole arena, so every write method
//! is applied all-or-nothing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use super::repository::{BracketRepository, MatchChanges, SavedBracket};
use crate::bracket::errors::{BracketError, BracketResult};
use crate::tournament::models::{
    Match, MatchId, NewMatch, NewParticipant, NewTournament, Participant, ParticipantId,
    ParticipantStatus, Tournament, TournamentId, TournamentInfo, TournamentStatus,
};

#[derive(Default)]
struct Arena {
    last_tournament_id: i64,
    last_participant_id: i64,
    last_match_id: i64,
    tournaments: HashMap<TournamentId, Tournament>,
    participants: HashMap<TournamentId, Vec<Participant>>,
    matches: HashMap<TournamentId, Vec<Match>>,
}

impl Arena {
    fn approved_count(&self, tournament_id: TournamentId) -> i64 {
        self.participants
            .get(&tournament_id)
            .map(|list| {
                list.iter()
                    .filter(|p| p.status == ParticipantStatus::Approved)
                    .count() as i64
            })
            .unwrap_or(0)
    }

    fn matches_of(&self, tournament_id: TournamentId) -> impl Iterator<Item = &Match> {
        self.matches.get(&tournament_id).into_iter().flatten()
    }
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

/// Repository backed by process memory
#[derive(Clone, Default)]
pub struct MemoryRepository {
    arena: Arc<Mutex<Arena>>,
    fail_next_write: Arc<AtomicBool>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next write method fail with a database error before touching
    /// any row. Used to exercise rollback paths.
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    fn check_write(&self) -> BracketResult<()> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(BracketError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl BracketRepository for MemoryRepository {
    async fn health_check(&self) -> BracketResult<()> {
        Ok(())
    }

    async fn create_tournament(&self, tournament: &NewTournament) -> BracketResult<Tournament> {
        self.check_write()?;
        let mut arena = self.arena.lock().await;
        let id = next_id(&mut arena.last_tournament_id);

        let created = Tournament {
            id,
            name: tournament.name.clone(),
            start_date: tournament.start_date,
            max_participants: tournament.max_participants,
            format: tournament.format,
            status: TournamentStatus::Setup,
            is_paused: false,
            created_at: Utc::now(),
        };
        arena.tournaments.insert(id, created.clone());
        Ok(created)
    }

    async fn find_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Option<Tournament>> {
        Ok(self.arena.lock().await.tournaments.get(&tournament_id).cloned())
    }

    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> BracketResult<Vec<TournamentInfo>> {
        let arena = self.arena.lock().await;
        let mut list: Vec<TournamentInfo> = arena
            .tournaments
            .values()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .map(|t| TournamentInfo {
                tournament: t.clone(),
                participant_count: arena.approved_count(t.id),
            })
            .collect();

        list.sort_by(|a, b| {
            b.tournament
                .created_at
                .cmp(&a.tournament.created_at)
                .then(b.tournament.id.cmp(&a.tournament.id))
        });
        Ok(list)
    }

    async fn set_paused(
        &self,
        tournament_id: TournamentId,
        paused: bool,
    ) -> BracketResult<Option<Tournament>> {
        self.check_write()?;
        let mut arena = self.arena.lock().await;
        Ok(arena.tournaments.get_mut(&tournament_id).map(|t| {
            t.is_paused = paused;
            t.clone()
        }))
    }

    async fn delete_tournament(&self, tournament_id: TournamentId) -> BracketResult<bool> {
        self.check_write()?;
        let mut arena = self.arena.lock().await;
        let removed = arena.tournaments.remove(&tournament_id).is_some();
        arena.participants.remove(&tournament_id);
        arena.matches.remove(&tournament_id);
        Ok(removed)
    }

    async fn count_approved(&self, tournament_id: TournamentId) -> BracketResult<i64> {
        Ok(self.arena.lock().await.approved_count(tournament_id))
    }

    async fn add_participants(
        &self,
        tournament_id: TournamentId,
        participants: &[NewParticipant],
    ) -> BracketResult<Vec<Participant>> {
        self.check_write()?;
        let mut arena = self.arena.lock().await;
        if !arena.tournaments.contains_key(&tournament_id) {
            return Err(BracketError::TournamentNotFound(tournament_id));
        }

        let mut added = Vec::with_capacity(participants.len());
        for new in participants {
            added.push(Participant {
                id: next_id(&mut arena.last_participant_id),
                tournament_id,
                user_id: new.user_id,
                name: new.name.clone(),
                seed: new.seed,
                status: new.status,
                created_at: Utc::now(),
            });
        }

        arena
            .participants
            .entry(tournament_id)
            .or_default()
            .extend(added.iter().cloned());
        Ok(added)
    }

    async fn find_participant(
        &self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
    ) -> BracketResult<Option<Participant>> {
        let arena = self.arena.lock().await;
        Ok(arena
            .participants
            .get(&tournament_id)
            .and_then(|list| list.iter().find(|p| p.id == participant_id))
            .cloned())
    }

    async fn approve_participant(
        &self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
    ) -> BracketResult<Option<Participant>> {
        self.check_write()?;
        let mut arena = self.arena.lock().await;
        Ok(arena
            .participants
            .get_mut(&tournament_id)
            .and_then(|list| list.iter_mut().find(|p| p.id == participant_id))
            .map(|p| {
                p.status = ParticipantStatus::Approved;
                p.clone()
            }))
    }

    async fn list_participants(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<Participant>> {
        let arena = self.arena.lock().await;
        Ok(arena
            .participants
            .get(&tournament_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn load_approved_participants(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<Participant>> {
        let arena = self.arena.lock().await;
        let mut approved: Vec<Participant> = arena
            .participants
            .get(&tournament_id)
            .into_iter()
            .flatten()
            .filter(|p| p.status == ParticipantStatus::Approved)
            .cloned()
            .collect();

        // seed ascending, nulls last, then insertion order
        approved.sort_by_key(|p| (p.seed.is_none(), p.seed, p.id));
        Ok(approved)
    }

    async fn load_matches(&self, tournament_id: TournamentId) -> BracketResult<Vec<Match>> {
        let arena = self.arena.lock().await;
        let mut matches: Vec<Match> = arena.matches_of(tournament_id).cloned().collect();
        matches.sort_by_key(|m| (m.round, m.match_number));
        Ok(matches)
    }

    async fn load_match(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
    ) -> BracketResult<Option<Match>> {
        let arena = self.arena.lock().await;
        Ok(arena.matches_of(tournament_id).find(|m| m.id == match_id).cloned())
    }

    async fn load_match_at(
        &self,
        tournament_id: TournamentId,
        round: i32,
        match_number: i32,
    ) -> BracketResult<Option<Match>> {
        let arena = self.arena.lock().await;
        Ok(arena
            .matches_of(tournament_id)
            .find(|m| m.round == round && m.match_number == match_number)
            .cloned())
    }

    async fn load_round(
        &self,
        tournament_id: TournamentId,
        round: i32,
    ) -> BracketResult<Vec<Match>> {
        let arena = self.arena.lock().await;
        let mut matches: Vec<Match> = arena
            .matches_of(tournament_id)
            .filter(|m| m.round == round)
            .cloned()
            .collect();
        matches.sort_by_key(|m| m.match_number);
        Ok(matches)
    }

    async fn load_final_match(&self, tournament_id: TournamentId) -> BracketResult<Option<Match>> {
        let arena = self.arena.lock().await;
        Ok(arena
            .matches_of(tournament_id)
            .min_by_key(|m| (std::cmp::Reverse(m.round), m.match_number))
            .cloned())
    }

    async fn save_bracket(
        &self,
        tournament_id: TournamentId,
        seeds: &[(ParticipantId, i32)],
        matches: &[NewMatch],
    ) -> BracketResult<SavedBracket> {
        self.check_write()?;
        let mut arena = self.arena.lock().await;
        if !arena.tournaments.contains_key(&tournament_id) {
            return Err(BracketError::TournamentNotFound(tournament_id));
        }

        let mut existing: Vec<Match> = arena.matches_of(tournament_id).cloned().collect();
        if !existing.is_empty() {
            existing.sort_by_key(|m| (m.round, m.match_number));
            return Ok(SavedBracket::Existing(existing));
        }

        if let Some(list) = arena.participants.get_mut(&tournament_id) {
            for &(participant_id, seed) in seeds {
                if let Some(p) = list.iter_mut().find(|p| p.id == participant_id) {
                    p.seed = Some(seed);
                }
            }
        }

        let mut saved = Vec::with_capacity(matches.len());
        for new in matches {
            saved.push(Match {
                id: next_id(&mut arena.last_match_id),
                tournament_id,
                round: new.round,
                match_number: new.match_number,
                participant1_id: new.participant1_id,
                participant2_id: new.participant2_id,
                winner_id: None,
                score: None,
            });
        }
        arena
            .matches
            .entry(tournament_id)
            .or_default()
            .extend(saved.iter().cloned());

        if let Some(t) = arena.tournaments.get_mut(&tournament_id) {
            t.status = TournamentStatus::Active;
        }
        Ok(SavedBracket::Created(saved))
    }

    async fn commit_match_changes(&self, changes: &MatchChanges) -> BracketResult<()> {
        self.check_write()?;
        let mut arena = self.arena.lock().await;
        let list = arena
            .matches
            .get_mut(&changes.tournament_id)
            .ok_or(BracketError::MatchNotFound(changes.source.id))?;

        let find = |list: &[Match], match_id: MatchId| {
            list.iter()
                .position(|m| m.id == match_id)
                .ok_or(BracketError::MatchNotFound(match_id))
        };

        // resolve every row before touching any of them
        let source = find(list.as_slice(), changes.source.id)?;
        let slots = changes
            .slots
            .iter()
            .map(|change| -> BracketResult<_> {
                Ok((find(list.as_slice(), change.match_id)?, change))
            })
            .collect::<BracketResult<Vec<_>>>()?;

        list[source].winner_id = changes.source.winner_id;
        list[source].score = changes.source.score.clone();
        for (position, change) in slots {
            list[position].set_slot(change.slot, change.participant_id);
        }

        if let Some(status) = changes.status {
            if let Some(t) = arena.tournaments.get_mut(&changes.tournament_id) {
                t.status = status;
            }
        }
        Ok(())
    }

    async fn reset_bracket(&self, tournament_id: TournamentId) -> BracketResult<u64> {
        self.check_write()?;
        let mut arena = self.arena.lock().await;
        let deleted = arena
            .matches
            .remove(&tournament_id)
            .map(|list| list.len() as u64)
            .unwrap_or(0);

        if let Some(t) = arena.tournaments.get_mut(&tournament_id) {
            t.status = TournamentStatus::Setup;
        }
        Ok(deleted)
    }
}
