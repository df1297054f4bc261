//! Repository trait and PostgreSQL implementation for bracket storage.
//!
//! The engine only talks to storage through [`BracketRepository`], so it can
//! run against PostgreSQL in production and [`MemoryRepository`] in tests.
//! Every write method is a single transaction.
//!
//! [`MemoryRepository`]: super::memory::MemoryRepository
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::str::FromStr;

use super::timeouts::{DEFAULT_TRANSACTION_TIMEOUT, with_default_timeout, with_timeout};
use crate::bracket::errors::{BracketError, BracketResult};
use crate::tournament::models::{
    Match, MatchId, NewMatch, NewParticipant, NewTournament, Participant, ParticipantId, Slot,
    Tournament, TournamentId, TournamentInfo, TournamentStatus,
};

/// One participant slot of a next-round match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotChange {
    pub match_id: MatchId,
    pub slot: Slot,
    pub participant_id: Option<ParticipantId>,
}

/// Writes produced by recording or clearing one result.
///
/// Only the columns named here are written. Sibling matches feed opposite
/// slots of the same next-round match, so their results can be committed
/// concurrently without overwriting each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchChanges {
    pub tournament_id: TournamentId,
    /// The match whose result changed; its `winner_id` and `score` are written
    pub source: Match,
    /// Next-round slots to fill or empty
    pub slots: Vec<SlotChange>,
    /// Status transition applied in the same transaction
    pub status: Option<TournamentStatus>,
}

/// Outcome of [`BracketRepository::save_bracket`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavedBracket {
    /// The matches were inserted by this call
    Created(Vec<Match>),
    /// Another call got there first; nothing was written
    Existing(Vec<Match>),
}

/// Storage collaborator for tournaments, participants and matches
#[async_trait]
pub trait BracketRepository: Send + Sync {
    /// Check that storage is reachable
    async fn health_check(&self) -> BracketResult<()>;

    /// Insert a tournament in `setup`, unpaused
    async fn create_tournament(&self, tournament: &NewTournament) -> BracketResult<Tournament>;

    async fn find_tournament(&self, tournament_id: TournamentId)
    -> BracketResult<Option<Tournament>>;

    /// List tournaments, newest first, with approved participant counts
    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> BracketResult<Vec<TournamentInfo>>;

    async fn set_paused(
        &self,
        tournament_id: TournamentId,
        paused: bool,
    ) -> BracketResult<Option<Tournament>>;

    /// Delete a tournament with its participants and matches
    async fn delete_tournament(&self, tournament_id: TournamentId) -> BracketResult<bool>;

    async fn count_approved(&self, tournament_id: TournamentId) -> BracketResult<i64>;

    /// Insert a batch of participants atomically
    async fn add_participants(
        &self,
        tournament_id: TournamentId,
        participants: &[NewParticipant],
    ) -> BracketResult<Vec<Participant>>;

    async fn find_participant(
        &self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
    ) -> BracketResult<Option<Participant>>;

    async fn approve_participant(
        &self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
    ) -> BracketResult<Option<Participant>>;

    /// All participants in registration order
    async fn list_participants(&self, tournament_id: TournamentId)
    -> BracketResult<Vec<Participant>>;

    /// Approved participants ordered by seed, unseeded last in insertion order
    async fn load_approved_participants(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<Participant>>;

    /// All matches ordered by round, then match number
    async fn load_matches(&self, tournament_id: TournamentId) -> BracketResult<Vec<Match>>;

    async fn load_match(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
    ) -> BracketResult<Option<Match>>;

    async fn load_match_at(
        &self,
        tournament_id: TournamentId,
        round: i32,
        match_number: i32,
    ) -> BracketResult<Option<Match>>;

    async fn load_round(&self, tournament_id: TournamentId, round: i32)
    -> BracketResult<Vec<Match>>;

    /// The match in the highest round
    async fn load_final_match(&self, tournament_id: TournamentId) -> BracketResult<Option<Match>>;

    /// Persist seeds and every match, and mark the tournament active.
    ///
    /// The check for an existing bracket happens inside the same atomic
    /// write, so concurrent callers never produce two brackets.
    async fn save_bracket(
        &self,
        tournament_id: TournamentId,
        seeds: &[(ParticipantId, i32)],
        matches: &[NewMatch],
    ) -> BracketResult<SavedBracket>;

    /// Persist a result change together with its downstream effects
    async fn commit_match_changes(&self, changes: &MatchChanges) -> BracketResult<()>;

    /// Delete all matches and return the tournament to `setup`
    async fn reset_bracket(&self, tournament_id: TournamentId) -> BracketResult<u64>;
}

const TOURNAMENT_COLUMNS: &str =
    "id, name, start_date, max_participants, tournament_type, status, is_paused, created_at";
const PARTICIPANT_COLUMNS: &str = "id, tournament_id, user_id, name, seed, status, created_at";
const MATCH_COLUMNS: &str =
    "id, tournament_id, round, match_number, participant1_id, participant2_id, winner_id, score";

/// Parse a text column into one of the model enums
fn decode_text<T>(column: &str, raw: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = String>,
{
    raw.parse().map_err(|e: String| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: e.into(),
    })
}

fn text_column<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.try_get(column)?;
    decode_text(column, &raw)
}

fn timestamp_column(
    row: &PgRow,
    column: &str,
) -> Result<chrono::DateTime<chrono::Utc>, sqlx::Error> {
    Ok(row.try_get::<chrono::NaiveDateTime, _>(column)?.and_utc())
}

fn tournament_from_row(row: &PgRow) -> Result<Tournament, sqlx::Error> {
    Ok(Tournament {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        start_date: timestamp_column(row, "start_date")?,
        max_participants: row.try_get("max_participants")?,
        format: text_column(row, "tournament_type")?,
        status: text_column(row, "status")?,
        is_paused: row.try_get("is_paused")?,
        created_at: timestamp_column(row, "created_at")?,
    })
}

fn participant_from_row(row: &PgRow) -> Result<Participant, sqlx::Error> {
    Ok(Participant {
        id: row.try_get("id")?,
        tournament_id: row.try_get("tournament_id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        seed: row.try_get("seed")?,
        status: text_column(row, "status")?,
        created_at: timestamp_column(row, "created_at")?,
    })
}

fn match_from_row(row: &PgRow) -> Result<Match, sqlx::Error> {
    Ok(Match {
        id: row.try_get("id")?,
        tournament_id: row.try_get("tournament_id")?,
        round: row.try_get("round")?,
        match_number: row.try_get("match_number")?,
        participant1_id: row.try_get("participant1_id")?,
        participant2_id: row.try_get("participant2_id")?,
        winner_id: row.try_get("winner_id")?,
        score: row.try_get("score")?,
    })
}

/// Single-column update for one participant slot
fn slot_update_sql(slot: Slot) -> &'static str {
    match slot {
        Slot::First => {
            "UPDATE matches SET participant1_id = $1 WHERE id = $2 AND tournament_id = $3"
        }
        Slot::Second => {
            "UPDATE matches SET participant2_id = $1 WHERE id = $2 AND tournament_id = $3"
        }
    }
}

/// Default PostgreSQL implementation of `BracketRepository`
#[derive(Clone)]
pub struct PgBracketRepository {
    pool: PgPool,
}

impl PgBracketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BracketRepository for PgBracketRepository {
    async fn health_check(&self) -> BracketResult<()> {
        with_default_timeout(sqlx::query("SELECT 1").execute(&self.pool)).await?;
        Ok(())
    }

    async fn create_tournament(&self, tournament: &NewTournament) -> BracketResult<Tournament> {
        let sql = format!(
            r#"
            INSERT INTO tournaments (name, start_date, max_participants, tournament_type, status, is_paused)
            VALUES ($1, $2, $3, $4, $5, FALSE)
            RETURNING {TOURNAMENT_COLUMNS}
            "#
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(&tournament.name)
                .bind(tournament.start_date.naive_utc())
                .bind(tournament.max_participants)
                .bind(tournament.format.as_str())
                .bind(TournamentStatus::Setup.as_str())
                .fetch_one(&self.pool),
        )
        .await?;

        Ok(tournament_from_row(&row)?)
    }

    async fn find_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Option<Tournament>> {
        let sql = format!("SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1");
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(tournament_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(tournament_from_row).transpose()?)
    }

    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> BracketResult<Vec<TournamentInfo>> {
        let sql = format!(
            r#"
            SELECT {TOURNAMENT_COLUMNS},
                   (SELECT COUNT(*) FROM participants p
                    WHERE p.tournament_id = tournaments.id AND p.status = 'approved') AS participant_count
            FROM tournaments
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            "#
        );
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(status.map(TournamentStatus::as_str))
                .fetch_all(&self.pool),
        )
        .await?;

        let tournaments = rows
            .iter()
            .map(|row| {
                Ok(TournamentInfo {
                    tournament: tournament_from_row(row)?,
                    participant_count: row.try_get("participant_count")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;
        Ok(tournaments)
    }

    async fn set_paused(
        &self,
        tournament_id: TournamentId,
        paused: bool,
    ) -> BracketResult<Option<Tournament>> {
        let sql = format!(
            "UPDATE tournaments SET is_paused = $1 WHERE id = $2 RETURNING {TOURNAMENT_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(paused)
                .bind(tournament_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(tournament_from_row).transpose()?)
    }

    async fn delete_tournament(&self, tournament_id: TournamentId) -> BracketResult<bool> {
        // participants and matches go with it via ON DELETE CASCADE
        let result = with_default_timeout(
            sqlx::query("DELETE FROM tournaments WHERE id = $1")
                .bind(tournament_id)
                .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_approved(&self, tournament_id: TournamentId) -> BracketResult<i64> {
        let row = with_default_timeout(
            sqlx::query(
                "SELECT COUNT(*) AS count FROM participants WHERE tournament_id = $1 AND status = 'approved'",
            )
            .bind(tournament_id)
            .fetch_one(&self.pool),
        )
        .await?;

        Ok(row.try_get("count")?)
    }

    async fn add_participants(
        &self,
        tournament_id: TournamentId,
        participants: &[NewParticipant],
    ) -> BracketResult<Vec<Participant>> {
        let sql = format!(
            r#"
            INSERT INTO participants (tournament_id, user_id, name, seed, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PARTICIPANT_COLUMNS}
            "#
        );

        let added = with_timeout(DEFAULT_TRANSACTION_TIMEOUT, async {
            let mut tx = self.pool.begin().await?;
            let mut added = Vec::with_capacity(participants.len());

            for participant in participants {
                let row = sqlx::query(&sql)
                    .bind(tournament_id)
                    .bind(participant.user_id)
                    .bind(&participant.name)
                    .bind(participant.seed)
                    .bind(participant.status.as_str())
                    .fetch_one(&mut *tx)
                    .await?;
                added.push(participant_from_row(&row)?);
            }

            tx.commit().await?;
            Ok::<_, sqlx::Error>(added)
        })
        .await?;

        Ok(added)
    }

    async fn find_participant(
        &self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
    ) -> BracketResult<Option<Participant>> {
        let sql = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = $1 AND tournament_id = $2"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(participant_id)
                .bind(tournament_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(participant_from_row).transpose()?)
    }

    async fn approve_participant(
        &self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
    ) -> BracketResult<Option<Participant>> {
        let sql = format!(
            r#"
            UPDATE participants SET status = 'approved'
            WHERE id = $1 AND tournament_id = $2
            RETURNING {PARTICIPANT_COLUMNS}
            "#
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(participant_id)
                .bind(tournament_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(participant_from_row).transpose()?)
    }

    async fn list_participants(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<Participant>> {
        let sql = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE tournament_id = $1 ORDER BY id"
        );
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(tournament_id)
                .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows
            .iter()
            .map(participant_from_row)
            .collect::<Result<_, _>>()?)
    }

    async fn load_approved_participants(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<Participant>> {
        let sql = format!(
            r#"
            SELECT {PARTICIPANT_COLUMNS} FROM participants
            WHERE tournament_id = $1 AND status = 'approved'
            ORDER BY seed ASC NULLS LAST, id ASC
            "#
        );
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(tournament_id)
                .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows
            .iter()
            .map(participant_from_row)
            .collect::<Result<_, _>>()?)
    }

    async fn load_matches(&self, tournament_id: TournamentId) -> BracketResult<Vec<Match>> {
        let sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE tournament_id = $1 ORDER BY round, match_number"
        );
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(tournament_id)
                .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows
            .iter()
            .map(match_from_row)
            .collect::<Result<_, _>>()?)
    }

    async fn load_match(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
    ) -> BracketResult<Option<Match>> {
        let sql =
            format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1 AND tournament_id = $2");
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(match_id)
                .bind(tournament_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(match_from_row).transpose()?)
    }

    async fn load_match_at(
        &self,
        tournament_id: TournamentId,
        round: i32,
        match_number: i32,
    ) -> BracketResult<Option<Match>> {
        let sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE tournament_id = $1 AND round = $2 AND match_number = $3"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(tournament_id)
                .bind(round)
                .bind(match_number)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(match_from_row).transpose()?)
    }

    async fn load_round(
        &self,
        tournament_id: TournamentId,
        round: i32,
    ) -> BracketResult<Vec<Match>> {
        let sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE tournament_id = $1 AND round = $2 ORDER BY match_number"
        );
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(tournament_id)
                .bind(round)
                .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows
            .iter()
            .map(match_from_row)
            .collect::<Result<_, _>>()?)
    }

    async fn load_final_match(&self, tournament_id: TournamentId) -> BracketResult<Option<Match>> {
        let sql = format!(
            r#"
            SELECT {MATCH_COLUMNS} FROM matches
            WHERE tournament_id = $1
            ORDER BY round DESC, match_number ASC
            LIMIT 1
            "#
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(tournament_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(match_from_row).transpose()?)
    }

    async fn save_bracket(
        &self,
        tournament_id: TournamentId,
        seeds: &[(ParticipantId, i32)],
        matches: &[NewMatch],
    ) -> BracketResult<SavedBracket> {
        let insert_sql = format!(
            r#"
            INSERT INTO matches (tournament_id, round, match_number, participant1_id, participant2_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {MATCH_COLUMNS}
            "#
        );
        let existing_sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE tournament_id = $1 ORDER BY round, match_number"
        );

        let saved = with_timeout(DEFAULT_TRANSACTION_TIMEOUT, async {
            let mut tx = self.pool.begin().await?;

            // row lock serialises concurrent generation for one tournament
            let locked = sqlx::query("SELECT id FROM tournaments WHERE id = $1 FOR UPDATE")
                .bind(tournament_id)
                .fetch_optional(&mut *tx)
                .await?;
            if locked.is_none() {
                return Ok(None);
            }

            let existing = sqlx::query(&existing_sql)
                .bind(tournament_id)
                .fetch_all(&mut *tx)
                .await?;
            if !existing.is_empty() {
                let existing = existing
                    .iter()
                    .map(match_from_row)
                    .collect::<Result<Vec<_>, _>>()?;
                tx.commit().await?;
                return Ok(Some(SavedBracket::Existing(existing)));
            }

            for &(participant_id, seed) in seeds {
                sqlx::query("UPDATE participants SET seed = $1 WHERE id = $2 AND tournament_id = $3")
                    .bind(seed)
                    .bind(participant_id)
                    .bind(tournament_id)
                    .execute(&mut *tx)
                    .await?;
            }

            let mut saved = Vec::with_capacity(matches.len());
            for new_match in matches {
                let row = sqlx::query(&insert_sql)
                    .bind(tournament_id)
                    .bind(new_match.round)
                    .bind(new_match.match_number)
                    .bind(new_match.participant1_id)
                    .bind(new_match.participant2_id)
                    .fetch_one(&mut *tx)
                    .await?;
                saved.push(match_from_row(&row)?);
            }

            sqlx::query("UPDATE tournaments SET status = $1 WHERE id = $2")
                .bind(TournamentStatus::Active.as_str())
                .bind(tournament_id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok::<_, sqlx::Error>(Some(SavedBracket::Created(saved)))
        })
        .await?;

        saved.ok_or(BracketError::TournamentNotFound(tournament_id))
    }

    async fn commit_match_changes(&self, changes: &MatchChanges) -> BracketResult<()> {
        with_timeout(DEFAULT_TRANSACTION_TIMEOUT, async {
            let mut tx = self.pool.begin().await?;

            let result = sqlx::query(
                "UPDATE matches SET winner_id = $1, score = $2 WHERE id = $3 AND tournament_id = $4",
            )
            .bind(changes.source.winner_id)
            .bind(changes.source.score.as_deref())
            .bind(changes.source.id)
            .bind(changes.tournament_id)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(sqlx::Error::RowNotFound);
            }

            for change in &changes.slots {
                let result = sqlx::query(slot_update_sql(change.slot))
                    .bind(change.participant_id)
                    .bind(change.match_id)
                    .bind(changes.tournament_id)
                    .execute(&mut *tx)
                    .await?;

                // dropping tx rolls back the rows already updated
                if result.rows_affected() == 0 {
                    return Err(sqlx::Error::RowNotFound);
                }
            }

            if let Some(status) = changes.status {
                sqlx::query("UPDATE tournaments SET status = $1 WHERE id = $2")
                    .bind(status.as_str())
                    .bind(changes.tournament_id)
                    .execute(&mut *tx)
                    .await?;
            }

            tx.commit().await?;
            Ok::<_, sqlx::Error>(())
        })
        .await?;

        Ok(())
    }

    async fn reset_bracket(&self, tournament_id: TournamentId) -> BracketResult<u64> {
        let deleted = with_timeout(DEFAULT_TRANSACTION_TIMEOUT, async {
            let mut tx = self.pool.begin().await?;

            let result = sqlx::query("DELETE FROM matches WHERE tournament_id = $1")
                .bind(tournament_id)
                .execute(&mut *tx)
                .await?;

            sqlx::query("UPDATE tournaments SET status = $1 WHERE id = $2")
                .bind(TournamentStatus::Setup.as_str())
                .bind(tournament_id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok::<_, sqlx::Error>(result.rows_affected())
        })
        .await?;

        Ok(deleted)
    }
}
